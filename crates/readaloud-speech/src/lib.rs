//! Speech side of the readaloud reader.
//!
//! [`SpeechAdapter`] owns the platform speech engine and enforces engine
//! focus; [`ReaderService`] is the command surface a host wires to its UI
//! and page events.

#![deny(unused_crate_dependencies)]

pub mod adapter;
pub mod service;
pub mod testing;
pub mod voices;

pub use adapter::{
    SpeechAdapter, SpeechConfig, SpeechRequest, SpeechStart, SpeechUpdate, StartFailure,
};
pub use service::{ReaderService, ReaderServiceConfig};
pub use testing::{EngineCall, FakeSpeechEngine};
pub use voices::{VoicePreference, select_voice, wait_for_voices};

#[cfg(test)]
use {async_trait as _, mockall as _, serde_json as _};
