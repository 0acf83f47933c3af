//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the reader core expects from its host: the
//! speech engine, the settings store and the event bus. They contain no
//! browser or platform details.

pub mod event_emitter;
pub mod preferences_store;
pub mod speech_engine;

pub use event_emitter::{ChannelEmitter, NoopEmitter, ReaderEventEmitter};
pub use preferences_store::{MemoryPreferencesStore, PreferencesStore, PreferencesStoreError};
pub use speech_engine::{
    BoundaryKind, EngineEvent, EngineEventKind, EngineEventSender, EngineInbox, SpeechEngine,
    Utterance, UtteranceCallbacks, UtteranceId, VoiceInfo, engine_channel,
};
