//! Playback sessions and their registry.

mod registry;
mod state;

pub use registry::{
    DEFAULT_IDLE_TIMEOUT_HOURS, DEFAULT_MAX_SESSIONS, RegistryConfig, SessionRegistry,
};
pub use state::{
    DEFAULT_SPEED, DEFAULT_VOLUME, MAX_SPEED, MAX_VOLUME, MIN_SPEED, MIN_VOLUME, PlaybackSession,
    SessionId, SessionState,
};
