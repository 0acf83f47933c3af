//! Reader error taxonomy.
//!
//! Every fallible operation in the reader core returns [`ReaderError`]. The
//! type is serializable so it can travel inside [`crate::ReaderEvent`]
//! payloads to whatever UI is listening, without depending on
//! non-serializable error sources.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience alias used throughout the reader crates.
pub type ReaderResult<T> = Result<T, ReaderError>;

/// Errors produced by extraction, session control and speech playback.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReaderError {
    /// Extraction found nothing readable on the page.
    #[error("No readable content found on this page")]
    NoContentFound,

    /// The user selection was empty after trimming.
    #[error("Selection is empty")]
    EmptySelection,

    /// The platform has no speech synthesis capability at all.
    #[error("Speech synthesis is not supported on this platform")]
    SpeechNotSupported,

    /// No usable voice appeared before the voice-list wait timed out.
    #[error("No speech voice is available")]
    VoiceNotAvailable,

    /// The text handed to the speech engine could not be used.
    #[error("Text processing failed: {message}")]
    TextProcessingError {
        /// What was wrong with the text.
        message: String,
    },

    /// The session registry is at capacity.
    #[error("Session limit exceeded: maximum {max} concurrent sessions")]
    SessionLimitExceeded {
        /// Registry capacity.
        max: usize,
    },

    /// The operation is not valid in the session's current state.
    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        /// Operation that was attempted (e.g. `"resume"`).
        operation: String,
        /// State the session was in.
        state: String,
    },

    /// A parameter was outside its accepted range. Values are never clamped.
    #[error("Invalid {name} '{value}': {reason}")]
    InvalidParameter {
        /// Parameter name (e.g. `"speed"`).
        name: String,
        /// Rejected value, rendered as text.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The referenced session does not exist (unknown or expired).
    #[error("Session not found: {id}")]
    SessionNotFound {
        /// The session id that was looked up.
        id: String,
    },

    /// The speech engine reported a failure during playback.
    #[error("Speech engine error: {reason}")]
    EngineFailure {
        /// Engine-provided reason string.
        reason: String,
    },

    /// A pending start was superseded by `stop` or by a newer start.
    #[error("Speech start was cancelled before the engine accepted it")]
    StartCancelled,

    /// Reading is switched off in the user preferences.
    #[error("Reading is disabled")]
    Disabled,

    /// Page markup could not be tokenized.
    #[error("Markup error: {message}")]
    Markup {
        /// Tokenizer message.
        message: String,
    },

    /// The preferences store failed.
    #[error("Preferences store error: {message}")]
    Preferences {
        /// Store message.
        message: String,
    },
}

impl ReaderError {
    /// Build an [`ReaderError::InvalidState`] error.
    pub fn invalid_state(operation: impl Into<String>, state: impl Display) -> Self {
        Self::InvalidState {
            operation: operation.into(),
            state: state.to_string(),
        }
    }

    /// Build an [`ReaderError::InvalidParameter`] error.
    pub fn invalid_parameter(
        name: impl Into<String>,
        value: impl Display,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Build a [`ReaderError::SessionNotFound`] error.
    pub fn session_not_found(id: impl Display) -> Self {
        Self::SessionNotFound { id: id.to_string() }
    }

    /// Whether the error comes from the environment (platform, voices)
    /// rather than from caller input.
    pub const fn is_environmental(&self) -> bool {
        matches!(
            self,
            Self::SpeechNotSupported | Self::VoiceNotAvailable | Self::EngineFailure { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameter_message_includes_value() {
        let err = ReaderError::invalid_parameter("speed", 2.5, "must be within [0.5, 2.0]");
        assert_eq!(
            err.to_string(),
            "Invalid speed '2.5': must be within [0.5, 2.0]"
        );
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(ReaderError::SessionLimitExceeded { max: 10 }).unwrap();
        assert_eq!(json["kind"], "session_limit_exceeded");
        assert_eq!(json["max"], 10);

        let unit = serde_json::to_value(ReaderError::VoiceNotAvailable).unwrap();
        assert_eq!(unit["kind"], "voice_not_available");
    }

    #[test]
    fn environmental_errors() {
        assert!(ReaderError::SpeechNotSupported.is_environmental());
        assert!(!ReaderError::EmptySelection.is_environmental());
    }
}
