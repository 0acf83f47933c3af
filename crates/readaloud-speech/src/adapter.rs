//! Speech engine adapter.
//!
//! Owns the one shared [`SpeechEngine`] and decides which session holds
//! engine focus. Every utterance gets a fresh [`UtteranceId`]; engine events
//! for any other id are stale (cancelled or superseded) and are dropped.
//!
//! # Locking discipline
//!
//! Adapter state lives behind a `std::sync::Mutex` that is never held across
//! an `.await` point. The only suspension is the bounded wait for the voice
//! list; a pending start records a ticket before waiting and re-checks it
//! afterwards, so a `stop` (or a newer start) issued in between wins.
//! Cancelling the previous utterance and submitting the next one happen under
//! a single lock acquisition, which keeps at most one live utterance.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use readaloud_core::text::words_before;
use readaloud_core::{
    EngineEvent, EngineEventKind, EngineEventSender, PlaybackSession, ReaderError, ReaderResult,
    SessionId, SpeechEngine, Utterance, UtteranceId, VoiceInfo,
};

use crate::voices::{VoicePreference, select_voice, wait_for_voices};

pub const DEFAULT_VOICE_WAIT_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_VOICE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Adapter settings.
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Upper bound on waiting for the engine's voice list.
    pub voice_wait_timeout: Duration,
    pub voice_poll_interval: Duration,
    /// Language used for voice selection when the request names none.
    pub preferred_lang: Option<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            voice_wait_timeout: DEFAULT_VOICE_WAIT_TIMEOUT,
            voice_poll_interval: DEFAULT_VOICE_POLL_INTERVAL,
            preferred_lang: None,
        }
    }
}

/// Everything needed to (re)submit speech for one session.
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    pub session_id: SessionId,
    /// Text from the session's current word onward.
    pub text: String,
    /// Session word index at which `text` begins.
    pub base_word_index: usize,
    pub rate: f32,
    pub volume: f32,
    pub voice: VoicePreference,
}

impl SpeechRequest {
    /// Build a request from the session's current position.
    pub fn from_session(session: &PlaybackSession, voice: VoicePreference) -> Self {
        Self {
            session_id: session.id(),
            text: session.remaining_text().to_string(),
            base_word_index: session.word_index(),
            rate: session.speed(),
            volume: session.volume(),
            voice,
        }
    }
}

/// Outcome of a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeechStart {
    pub utterance: UtteranceId,
    /// Session whose utterance was cancelled to make room, if it differs
    /// from the requesting one.
    pub preempted: Option<SessionId>,
}

/// A submission that did not go through.
///
/// `preempted` names the session whose utterance was already cancelled when
/// the engine refused the new one; that session no longer has a live
/// utterance either.
#[derive(Debug, Clone, PartialEq)]
pub struct StartFailure {
    pub error: ReaderError,
    pub preempted: Option<SessionId>,
}

impl From<ReaderError> for StartFailure {
    fn from(error: ReaderError) -> Self {
        Self {
            error,
            preempted: None,
        }
    }
}

/// Session-level meaning of one engine event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechUpdate {
    Started { session_id: SessionId },
    Position { session_id: SessionId, word_index: usize },
    Finished { session_id: SessionId },
    Failed { session_id: SessionId, reason: String },
}

/// The utterance currently driving the engine.
#[derive(Debug)]
struct Focus {
    session_id: SessionId,
    utterance: UtteranceId,
    base_word_index: usize,
    text: String,
}

#[derive(Debug, Default)]
struct AdapterState {
    focus: Option<Focus>,
    next_utterance: u64,
    next_ticket: u64,
    /// Start waiting for voices: (ticket, session).
    pending: Option<(u64, SessionId)>,
    /// Voice chosen at a session's first start, reused on restarts.
    session_voices: HashMap<SessionId, VoiceInfo>,
}

/// Serializes all access to one speech engine.
pub struct SpeechAdapter {
    engine: Arc<dyn SpeechEngine>,
    config: SpeechConfig,
    sender: EngineEventSender,
    state: Mutex<AdapterState>,
}

impl SpeechAdapter {
    /// Create an adapter whose utterances report into `sender`.
    pub fn new(
        engine: Arc<dyn SpeechEngine>,
        config: SpeechConfig,
        sender: EngineEventSender,
    ) -> Self {
        Self {
            engine,
            config,
            sender,
            state: Mutex::new(AdapterState::default()),
        }
    }

    pub const fn config(&self) -> &SpeechConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, AdapterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Starting ───────────────────────────────────────────────────

    /// Select a voice and submit the request's text.
    ///
    /// Waits (bounded) for the voice list. Fails with `StartCancelled` when
    /// [`stop`](Self::stop) or a newer start arrived during that wait.
    pub async fn start_speech(
        &self,
        request: SpeechRequest,
    ) -> Result<SpeechStart, StartFailure> {
        self.check_request(&request)?;

        let ticket = {
            let mut state = self.lock();
            state.next_ticket += 1;
            let ticket = state.next_ticket;
            state.pending = Some((ticket, request.session_id));
            ticket
        };

        let voices = wait_for_voices(
            self.engine.as_ref(),
            self.config.voice_wait_timeout,
            self.config.voice_poll_interval,
        )
        .await;

        let mut state = self.lock();
        if state.pending != Some((ticket, request.session_id)) {
            tracing::debug!(session_id = %request.session_id, "Pending start was cancelled");
            return Err(ReaderError::StartCancelled.into());
        }
        state.pending = None;

        let voice = select_voice(&voices, &request.voice, self.config.preferred_lang.as_deref())
            .ok_or(ReaderError::VoiceNotAvailable)?;
        self.submit(&mut state, request, voice)
    }

    /// Cancel and resubmit from the request's position without waiting for
    /// voices. Used for rate/volume changes and for resuming a session that
    /// lost focus.
    pub fn restart(&self, request: SpeechRequest) -> Result<SpeechStart, StartFailure> {
        self.check_request(&request)?;

        let mut state = self.lock();
        state.pending = None;
        let voice = match state.session_voices.get(&request.session_id) {
            Some(voice) => voice.clone(),
            None => select_voice(
                &self.engine.voices(),
                &request.voice,
                self.config.preferred_lang.as_deref(),
            )
            .ok_or(ReaderError::VoiceNotAvailable)?,
        };
        self.submit(&mut state, request, voice)
    }

    fn check_request(&self, request: &SpeechRequest) -> ReaderResult<()> {
        if !self.engine.is_supported() {
            return Err(ReaderError::SpeechNotSupported);
        }
        if request.text.trim().is_empty() {
            return Err(ReaderError::TextProcessingError {
                message: "nothing left to read".to_string(),
            });
        }
        Ok(())
    }

    /// Cancel the focused utterance, if any, then speak. Caller holds the lock.
    fn submit(
        &self,
        state: &mut AdapterState,
        request: SpeechRequest,
        voice: VoiceInfo,
    ) -> Result<SpeechStart, StartFailure> {
        let preempted = state.focus.take().map(|previous| {
            tracing::debug!(
                session_id = %previous.session_id,
                utterance = %previous.utterance,
                "Cancelling focused utterance"
            );
            self.engine.cancel();
            previous.session_id
        });

        state.next_utterance += 1;
        let id = UtteranceId(state.next_utterance);
        let utterance = Utterance {
            id,
            text: request.text.clone(),
            rate: request.rate,
            volume: request.volume,
            lang: Some(voice.lang.clone()),
            voice: Some(voice.clone()),
            callbacks: self.sender.callbacks(id),
        };
        let preempted = preempted.filter(|&previous| previous != request.session_id);
        if let Err(error) = self.engine.speak(utterance) {
            return Err(StartFailure { error, preempted });
        }

        tracing::info!(
            session_id = %request.session_id,
            utterance = %id,
            voice = %voice.id,
            rate = request.rate,
            base_word_index = request.base_word_index,
            "Utterance submitted"
        );
        state.session_voices.insert(request.session_id, voice);
        state.focus = Some(Focus {
            session_id: request.session_id,
            utterance: id,
            base_word_index: request.base_word_index,
            text: request.text,
        });

        Ok(SpeechStart {
            utterance: id,
            preempted,
        })
    }

    // ── Control ────────────────────────────────────────────────────

    /// Cancel the session's pending start and live utterance.
    ///
    /// Returns whether anything was cancelled.
    pub fn stop(&self, session_id: SessionId) -> bool {
        let mut state = self.lock();
        let mut cancelled = false;
        if state.pending.is_some_and(|(_, pending)| pending == session_id) {
            state.pending = None;
            cancelled = true;
        }
        if state
            .focus
            .as_ref()
            .is_some_and(|focus| focus.session_id == session_id)
        {
            state.focus = None;
            self.engine.cancel();
            cancelled = true;
        }
        if cancelled {
            tracing::debug!(session_id = %session_id, "Speech stopped");
        }
        cancelled
    }

    /// Cancel whatever is pending or speaking.
    pub fn stop_all(&self) {
        let mut state = self.lock();
        state.pending = None;
        if state.focus.take().is_some() {
            self.engine.cancel();
        }
    }

    /// Pause the engine if `session_id` holds focus.
    pub fn pause(&self, session_id: SessionId) -> bool {
        let state = self.lock();
        let focused = Self::is_focus(&state, session_id);
        if focused {
            self.engine.pause();
        }
        focused
    }

    /// Resume the engine if `session_id` holds focus.
    ///
    /// Returns `false` when the session lost focus and must be restarted.
    pub fn resume(&self, session_id: SessionId) -> bool {
        let state = self.lock();
        let focused = Self::is_focus(&state, session_id);
        if focused {
            self.engine.resume();
        }
        focused
    }

    /// Forget per-session data once the session is gone.
    pub fn forget(&self, session_id: SessionId) {
        self.lock().session_voices.remove(&session_id);
    }

    fn is_focus(state: &AdapterState, session_id: SessionId) -> bool {
        state
            .focus
            .as_ref()
            .is_some_and(|focus| focus.session_id == session_id)
    }

    pub fn has_focus(&self, session_id: SessionId) -> bool {
        Self::is_focus(&self.lock(), session_id)
    }

    pub fn focus_session(&self) -> Option<SessionId> {
        self.lock().focus.as_ref().map(|focus| focus.session_id)
    }

    pub fn focus_utterance(&self) -> Option<UtteranceId> {
        self.lock().focus.as_ref().map(|focus| focus.utterance)
    }

    // ── Engine events ──────────────────────────────────────────────

    /// Translate an engine event for the focused utterance.
    ///
    /// Events for any other utterance return `None`.
    pub fn handle_event(&self, event: &EngineEvent) -> Option<SpeechUpdate> {
        let mut state = self.lock();
        let Some(focus) = state
            .focus
            .as_ref()
            .filter(|focus| focus.utterance == event.utterance)
        else {
            tracing::trace!(
                utterance = %event.utterance,
                kind = ?event.kind,
                "Dropping stale engine event"
            );
            return None;
        };
        let session_id = focus.session_id;

        match &event.kind {
            EngineEventKind::Started => Some(SpeechUpdate::Started { session_id }),
            EngineEventKind::Boundary { char_index, .. } => {
                let word_index = focus.base_word_index + words_before(&focus.text, *char_index);
                Some(SpeechUpdate::Position {
                    session_id,
                    word_index,
                })
            }
            EngineEventKind::Ended => {
                state.focus = None;
                Some(SpeechUpdate::Finished { session_id })
            }
            EngineEventKind::Error { reason } => {
                tracing::warn!(
                    session_id = %session_id,
                    utterance = %event.utterance,
                    %reason,
                    "Engine error"
                );
                state.focus = None;
                Some(SpeechUpdate::Failed {
                    session_id,
                    reason: reason.clone(),
                })
            }
        }
    }
}

impl std::fmt::Debug for SpeechAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechAdapter")
            .field("config", &self.config)
            .field("focus", &self.focus_session())
            .finish_non_exhaustive()
    }
}
