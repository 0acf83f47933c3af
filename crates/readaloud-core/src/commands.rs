//! Inbound control commands from the UI.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ReaderError, ReaderResult};
use crate::session::SessionId;

/// Browser tab a page lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a control command does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlAction {
    Play,
    Pause,
    Stop,
    Speed,
    Volume,
}

impl ControlAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::Speed => "speed",
            Self::Volume => "volume",
        }
    }
}

/// `control(action, sessionId, value)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlCommand {
    pub action: ControlAction,
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f32>,
}

impl ControlCommand {
    pub const fn new(action: ControlAction, session_id: SessionId) -> Self {
        Self {
            action,
            session_id,
            value: None,
        }
    }

    pub const fn speed(session_id: SessionId, speed: f32) -> Self {
        Self {
            action: ControlAction::Speed,
            session_id,
            value: Some(speed),
        }
    }

    pub const fn volume(session_id: SessionId, volume: f32) -> Self {
        Self {
            action: ControlAction::Volume,
            session_id,
            value: Some(volume),
        }
    }

    /// The value a `speed`/`volume` command must carry.
    pub fn required_value(&self) -> ReaderResult<f32> {
        self.value.ok_or_else(|| {
            ReaderError::invalid_parameter(self.action.as_str(), "none", "a value is required")
        })
    }
}
