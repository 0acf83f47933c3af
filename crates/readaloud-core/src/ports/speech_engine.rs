//! Speech engine port.
//!
//! The engine is an external, callback-driven black box: utterances are
//! submitted with `speak`, and progress comes back through four callback
//! slots (start, boundary, end, error). Here the callbacks are modelled as
//! [`UtteranceCallbacks`], which turn each engine callback into an
//! [`EngineEvent`] on a single inbox channel. The adapter consumes that inbox
//! in order, which keeps engine re-entrancy out of session code and makes
//! stale events (from a cancelled utterance) easy to recognize by id.
//!
//! # Design Rules
//!
//! - The engine is injected, never global.
//! - Boundary `char_index` values are byte offsets into the utterance text.
//! - Implementations must not call back synchronously from inside `speak`
//!   in a way that requires the caller's locks; callbacks only enqueue.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ReaderResult;

// ── Voices ─────────────────────────────────────────────────────────

/// One voice offered by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceInfo {
    /// Engine voice identifier (the voice URI in browsers).
    pub id: String,
    pub name: String,
    /// BCP 47 language tag, e.g. `en-US`.
    pub lang: String,
    /// Synthesized on-device rather than by a remote service.
    pub local_service: bool,
    /// The engine's default voice.
    pub is_default: bool,
}

impl VoiceInfo {
    pub fn new(id: &str, lang: &str, local_service: bool) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            lang: lang.to_string(),
            local_service,
            is_default: false,
        }
    }

    #[must_use]
    pub const fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }
}

// ── Engine events ──────────────────────────────────────────────────

/// Identity of one submitted utterance. Never reused by an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "utt-{}", self.0)
    }
}

/// Granularity of a boundary callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryKind {
    Word,
    Sentence,
}

/// What the engine reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEventKind {
    Started,
    Boundary {
        #[serde(rename = "charIndex")]
        char_index: usize,
        kind: BoundaryKind,
    },
    Ended,
    Error {
        reason: String,
    },
}

/// One engine callback, tagged with the utterance it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineEvent {
    pub utterance: UtteranceId,
    pub kind: EngineEventKind,
}

// ── Inbox channel ──────────────────────────────────────────────────

/// Sending half of the engine inbox.
#[derive(Debug, Clone)]
pub struct EngineEventSender {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EngineEventSender {
    /// Enqueue an event. Dropped silently once the inbox is gone.
    pub fn send(&self, event: EngineEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Engine inbox closed, dropping event");
        }
    }

    /// Callback slots bound to `utterance`.
    pub fn callbacks(&self, utterance: UtteranceId) -> UtteranceCallbacks {
        UtteranceCallbacks {
            utterance,
            sender: self.clone(),
        }
    }
}

/// Receiving half of the engine inbox.
#[derive(Debug)]
pub struct EngineInbox {
    rx: mpsc::UnboundedReceiver<EngineEvent>,
}

impl EngineInbox {
    /// Wait for the next event; `None` once every sender is dropped.
    pub async fn recv(&mut self) -> Option<EngineEvent> {
        self.rx.recv().await
    }

    /// Next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<EngineEvent> {
        self.rx.try_recv().ok()
    }
}

/// Create a connected sender/inbox pair.
pub fn engine_channel() -> (EngineEventSender, EngineInbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EngineEventSender { tx }, EngineInbox { rx })
}

/// The four callback slots of one utterance.
#[derive(Debug, Clone)]
pub struct UtteranceCallbacks {
    utterance: UtteranceId,
    sender: EngineEventSender,
}

impl UtteranceCallbacks {
    fn fire(&self, kind: EngineEventKind) {
        self.sender.send(EngineEvent {
            utterance: self.utterance,
            kind,
        });
    }

    pub fn on_start(&self) {
        self.fire(EngineEventKind::Started);
    }

    pub fn on_boundary(&self, char_index: usize, kind: BoundaryKind) {
        self.fire(EngineEventKind::Boundary { char_index, kind });
    }

    pub fn on_end(&self) {
        self.fire(EngineEventKind::Ended);
    }

    pub fn on_error(&self, reason: impl Into<String>) {
        self.fire(EngineEventKind::Error {
            reason: reason.into(),
        });
    }
}

// ── Utterance and engine ───────────────────────────────────────────

/// One unit of text submitted to the engine.
#[derive(Debug, Clone)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    /// Speech rate multiplier.
    pub rate: f32,
    pub volume: f32,
    pub voice: Option<VoiceInfo>,
    pub lang: Option<String>,
    pub callbacks: UtteranceCallbacks,
}

/// External text-to-speech capability.
///
/// Mirrors the browser `speechSynthesis` shape. Methods are synchronous and
/// must return promptly; progress is reported through the utterance's
/// callbacks.
pub trait SpeechEngine: Send + Sync {
    /// Whether the platform can synthesize speech at all.
    fn is_supported(&self) -> bool;

    /// Voices currently known. May be empty while the list is still loading.
    fn voices(&self) -> Vec<VoiceInfo>;

    /// Queue an utterance for synthesis.
    fn speak(&self, utterance: Utterance) -> ReaderResult<()>;

    fn pause(&self);

    fn resume(&self);

    /// Drop the current and queued utterances.
    fn cancel(&self);

    fn is_speaking(&self) -> bool;

    fn is_paused(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callbacks_tag_events_with_utterance() {
        let (sender, mut inbox) = engine_channel();
        let callbacks = sender.callbacks(UtteranceId(4));
        callbacks.on_start();
        callbacks.on_boundary(6, BoundaryKind::Word);
        callbacks.on_error("interrupted");

        assert_eq!(
            inbox.try_recv(),
            Some(EngineEvent {
                utterance: UtteranceId(4),
                kind: EngineEventKind::Started
            })
        );
        assert_eq!(
            inbox.try_recv().map(|e| e.kind),
            Some(EngineEventKind::Boundary {
                char_index: 6,
                kind: BoundaryKind::Word
            })
        );
        assert!(matches!(
            inbox.try_recv().map(|e| e.kind),
            Some(EngineEventKind::Error { .. })
        ));
        assert_eq!(inbox.try_recv(), None);
    }

    #[tokio::test]
    async fn inbox_closes_when_senders_drop() {
        let (sender, mut inbox) = engine_channel();
        sender.callbacks(UtteranceId(1)).on_end();
        drop(sender);
        assert!(inbox.recv().await.is_some());
        assert!(inbox.recv().await.is_none());
    }

    #[test]
    fn sending_after_inbox_drop_is_silent() {
        let (sender, inbox) = engine_channel();
        drop(inbox);
        sender.callbacks(UtteranceId(1)).on_end();
    }
}
