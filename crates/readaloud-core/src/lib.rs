//! Core domain of the readaloud reader.
//!
//! Pure heuristics and state: sentence segmentation, article extraction
//! over an abstract document tree, click resolution, playback sessions and
//! their registry, plus the ports the host environment implements.

#![deny(unused_crate_dependencies)]

pub mod article;
pub mod commands;
pub mod dom;
pub mod error;
pub mod events;
pub mod ports;
pub mod preferences;
pub mod resolver;
pub mod session;
pub mod text;

// Re-export commonly used types for convenience
pub use article::{
    ArticleContent, ArticleExtractor, ArticleId, ExtractionConfig, ExtractionMethod,
    extract_selection,
};
pub use commands::{ControlAction, ControlCommand, TabId};
pub use dom::{CaretPosition, DocumentTree, Element, MemoryDocument, NodeId, NodeKind, Rect};
pub use error::{ReaderError, ReaderResult};
pub use events::{ReaderEvent, RemovalReason, SessionSnapshot};
pub use ports::{
    BoundaryKind, ChannelEmitter, EngineEvent, EngineEventKind, EngineEventSender, EngineInbox,
    MemoryPreferencesStore, NoopEmitter, PreferencesStore, PreferencesStoreError,
    ReaderEventEmitter, SpeechEngine, Utterance, UtteranceCallbacks, UtteranceId, VoiceInfo,
    engine_channel,
};
pub use preferences::{
    KeyboardShortcuts, OverlayPosition, PreferencesUpdate, Theme, UserPreferences,
    validate_preferences,
};
pub use resolver::{ClickResolver, ClickTarget, ResolvedPosition};
pub use session::{
    PlaybackSession, RegistryConfig, SessionId, SessionRegistry, SessionState,
};
pub use text::{SentenceSpan, count_words, segment};

#[cfg(test)]
use mockall as _;
