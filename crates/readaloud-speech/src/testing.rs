//! In-memory speech engine for tests and demos.
//!
//! [`FakeSpeechEngine`] records every call and keeps the submitted
//! utterances so a test can fire their callbacks by hand.

use std::sync::{Mutex, MutexGuard, PoisonError};

use readaloud_core::{ReaderError, ReaderResult, SpeechEngine, Utterance, UtteranceId, VoiceInfo};

/// One call made against the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCall {
    Speak(UtteranceId),
    Pause,
    Resume,
    Cancel,
}

#[derive(Debug, Default)]
struct FakeState {
    voices: Vec<VoiceInfo>,
    calls: Vec<EngineCall>,
    utterances: Vec<Utterance>,
    speaking: bool,
    paused: bool,
    fail_next_speak: Option<String>,
}

/// Scripted [`SpeechEngine`].
#[derive(Debug)]
pub struct FakeSpeechEngine {
    supported: bool,
    inner: Mutex<FakeState>,
}

impl FakeSpeechEngine {
    /// A supported engine with one local `en-US` default voice.
    pub fn new() -> Self {
        Self::with_voices(vec![
            VoiceInfo::new("fake-en-us", "en-US", true).with_default(true),
        ])
    }

    pub fn with_voices(voices: Vec<VoiceInfo>) -> Self {
        Self {
            supported: true,
            inner: Mutex::new(FakeState {
                voices,
                ..FakeState::default()
            }),
        }
    }

    /// A platform without speech synthesis.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            inner: Mutex::new(FakeState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the voice list, as a late asynchronous load would.
    pub fn set_voices(&self, voices: Vec<VoiceInfo>) {
        self.lock().voices = voices;
    }

    /// Make the next `speak` fail with `reason`.
    pub fn fail_next_speak(&self, reason: &str) {
        self.lock().fail_next_speak = Some(reason.to_string());
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.lock().calls.clone()
    }

    pub fn cancel_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| **call == EngineCall::Cancel)
            .count()
    }

    pub fn utterances(&self) -> Vec<Utterance> {
        self.lock().utterances.clone()
    }

    pub fn last_utterance(&self) -> Option<Utterance> {
        self.lock().utterances.last().cloned()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }
}

impl Default for FakeSpeechEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechEngine for FakeSpeechEngine {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn voices(&self) -> Vec<VoiceInfo> {
        self.lock().voices.clone()
    }

    fn speak(&self, utterance: Utterance) -> ReaderResult<()> {
        let mut state = self.lock();
        if let Some(reason) = state.fail_next_speak.take() {
            return Err(ReaderError::EngineFailure { reason });
        }
        state.calls.push(EngineCall::Speak(utterance.id));
        state.utterances.push(utterance);
        state.speaking = true;
        state.paused = false;
        Ok(())
    }

    fn pause(&self) {
        let mut state = self.lock();
        state.calls.push(EngineCall::Pause);
        state.paused = state.speaking;
    }

    fn resume(&self) {
        let mut state = self.lock();
        state.calls.push(EngineCall::Resume);
        state.paused = false;
    }

    fn cancel(&self) {
        let mut state = self.lock();
        state.calls.push(EngineCall::Cancel);
        state.speaking = false;
        state.paused = false;
    }

    fn is_speaking(&self) -> bool {
        self.lock().speaking
    }

    fn is_paused(&self) -> bool {
        self.lock().paused
    }
}
