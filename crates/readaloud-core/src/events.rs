//! Session lifecycle events for UI listeners.
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag:
//!
//! ```json
//! { "type": "session_removed", "sessionId": "…", "reason": "completed" }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::article::ArticleId;
use crate::commands::TabId;
use crate::error::ReaderError;
use crate::session::{SessionId, SessionState};

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub article_id: ArticleId,
    pub tab_id: TabId,
    pub state: SessionState,
    pub is_playing: bool,
    pub is_paused: bool,
    pub word_index: usize,
    pub total_words: usize,
    pub start_sentence_index: usize,
    /// `word_index / total_words`.
    pub progress: f64,
    pub speed: f32,
    pub volume: f32,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

/// Why a session left the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// Explicit stop.
    Stopped,
    /// The engine read the text to the end.
    Completed,
    /// Idle past the registry timeout.
    Expired,
    /// The tab closed or navigated away.
    PageUnloaded,
}

/// Events emitted by the reader service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReaderEvent {
    SessionCreated {
        session: SessionSnapshot,
    },

    /// State, position, speed or volume changed.
    SessionUpdated {
        session: SessionSnapshot,
    },

    /// A session failed to start, or the engine failed mid-read.
    SessionError {
        #[serde(rename = "sessionId")]
        session_id: SessionId,
        error: ReaderError,
    },

    SessionRemoved {
        #[serde(rename = "sessionId")]
        session_id: SessionId,
        reason: RemovalReason,
    },
}

impl ReaderEvent {
    pub const fn session_created(session: SessionSnapshot) -> Self {
        Self::SessionCreated { session }
    }

    pub const fn session_updated(session: SessionSnapshot) -> Self {
        Self::SessionUpdated { session }
    }

    pub const fn session_error(session_id: SessionId, error: ReaderError) -> Self {
        Self::SessionError { session_id, error }
    }

    pub const fn session_removed(session_id: SessionId, reason: RemovalReason) -> Self {
        Self::SessionRemoved { session_id, reason }
    }

    /// Event name for message-bus transports.
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::SessionCreated { .. } => "session:created",
            Self::SessionUpdated { .. } => "session:updated",
            Self::SessionError { .. } => "session:error",
            Self::SessionRemoved { .. } => "session:removed",
        }
    }

    /// The session this event concerns.
    pub const fn session_id(&self) -> SessionId {
        match self {
            Self::SessionCreated { session } | Self::SessionUpdated { session } => {
                session.session_id
            }
            Self::SessionError { session_id, .. } | Self::SessionRemoved { session_id, .. } => {
                *session_id
            }
        }
    }
}
