//! Playback session state machine.
//!
//! ```text
//!   Created ──start──▶ Playing ◀──resume── Paused
//!                         │ ──pause──────▶   │
//!                         └────stop──▶ Stopped ◀──stop──┘
//! ```
//!
//! [`SessionState`] is the single source of truth; `is_playing` and
//! `is_paused` are derived from it, so they can never both be true.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::article::ArticleId;
use crate::commands::TabId;
use crate::error::{ReaderError, ReaderResult};
use crate::events::SessionSnapshot;
use crate::text::{count_words, word_start_offset};

pub const MIN_SPEED: f32 = 0.5;
pub const MAX_SPEED: f32 = 2.0;
pub const DEFAULT_SPEED: f32 = 1.0;
pub const MIN_VOLUME: f32 = 0.0;
pub const MAX_VOLUME: f32 = 1.0;
pub const DEFAULT_VOLUME: f32 = 1.0;

// ── Identity ───────────────────────────────────────────────────────

/// Unique id of one playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an id received from the UI.
    pub fn parse(raw: &str) -> ReaderResult<Self> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| ReaderError::session_not_found(raw))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── State ──────────────────────────────────────────────────────────

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Built but not yet speaking. Transient.
    Created,
    Playing,
    Paused,
    /// Terminal.
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        })
    }
}

// ── Session ────────────────────────────────────────────────────────

/// One reading activity over the text of one article.
///
/// Position only moves through [`PlaybackSession::update_position`], which the
/// speech adapter calls from engine boundary events.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    id: SessionId,
    article_id: ArticleId,
    tab_id: TabId,
    text: String,
    start_sentence_index: usize,
    word_index: usize,
    total_words: usize,
    state: SessionState,
    speed: f32,
    volume: f32,
    created_at: DateTime<Utc>,
    last_active_at: DateTime<Utc>,
    last_error: Option<String>,
}

impl PlaybackSession {
    /// Create a session that will read `text`, starting at word 0.
    pub fn new(
        article_id: ArticleId,
        tab_id: TabId,
        text: impl Into<String>,
        start_sentence_index: usize,
    ) -> Self {
        let text = text.into();
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            article_id,
            tab_id,
            total_words: count_words(&text),
            text,
            start_sentence_index,
            word_index: 0,
            state: SessionState::Created,
            speed: DEFAULT_SPEED,
            volume: DEFAULT_VOLUME,
            created_at: now,
            last_active_at: now,
            last_error: None,
        }
    }

    fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }

    fn set_state(&mut self, new_state: SessionState) {
        if self.state != new_state {
            tracing::debug!(
                session_id = %self.id,
                old = %self.state,
                new = %new_state,
                "Session state transition"
            );
            self.state = new_state;
        }
        self.touch();
    }

    fn ensure_active(&self, operation: &str) -> ReaderResult<()> {
        if self.state == SessionState::Stopped {
            return Err(ReaderError::invalid_state(operation, self.state));
        }
        Ok(())
    }

    // ── Transitions ────────────────────────────────────────────────

    /// `Created → Playing`. Requires non-empty text.
    pub fn start(&mut self) -> ReaderResult<()> {
        if self.state != SessionState::Created {
            return Err(ReaderError::invalid_state("start", self.state));
        }
        if self.text.trim().is_empty() {
            return Err(ReaderError::TextProcessingError {
                message: "session has no text to read".to_string(),
            });
        }
        self.set_state(SessionState::Playing);
        Ok(())
    }

    /// `Playing → Paused`. Pausing a paused session is a no-op.
    pub fn pause(&mut self) -> ReaderResult<()> {
        match self.state {
            SessionState::Playing => {
                self.set_state(SessionState::Paused);
                Ok(())
            }
            SessionState::Paused => Ok(()),
            state => Err(ReaderError::invalid_state("pause", state)),
        }
    }

    /// `Paused → Playing`.
    pub fn resume(&mut self) -> ReaderResult<()> {
        if self.state != SessionState::Paused {
            return Err(ReaderError::invalid_state("resume", self.state));
        }
        self.set_state(SessionState::Playing);
        Ok(())
    }

    /// Any non-stopped state `→ Stopped`.
    pub fn stop(&mut self) -> ReaderResult<()> {
        self.ensure_active("stop")?;
        self.set_state(SessionState::Stopped);
        Ok(())
    }

    /// Set the speech rate. Out-of-range values are rejected, never clamped.
    pub fn set_speed(&mut self, speed: f32) -> ReaderResult<()> {
        self.ensure_active("set speed")?;
        if !(MIN_SPEED..=MAX_SPEED).contains(&speed) {
            return Err(ReaderError::invalid_parameter(
                "speed",
                speed,
                format!("must be between {MIN_SPEED} and {MAX_SPEED}"),
            ));
        }
        self.speed = speed;
        self.touch();
        Ok(())
    }

    /// Set the volume. Out-of-range values are rejected, never clamped.
    pub fn set_volume(&mut self, volume: f32) -> ReaderResult<()> {
        self.ensure_active("set volume")?;
        if !(MIN_VOLUME..=MAX_VOLUME).contains(&volume) {
            return Err(ReaderError::invalid_parameter(
                "volume",
                volume,
                format!("must be between {MIN_VOLUME} and {MAX_VOLUME}"),
            ));
        }
        self.volume = volume;
        self.touch();
        Ok(())
    }

    /// Move to an absolute word index reported by the speech engine.
    ///
    /// Clamped to `total_words`; backward moves and updates on a stopped
    /// session are ignored. Returns whether the position changed.
    pub fn update_position(&mut self, word_index: usize) -> bool {
        if self.state == SessionState::Stopped {
            return false;
        }
        let clamped = word_index.min(self.total_words);
        if clamped <= self.word_index {
            return false;
        }
        tracing::trace!(session_id = %self.id, word_index = clamped, "Position update");
        self.word_index = clamped;
        self.touch();
        true
    }

    /// The engine finished the text: jump to the end and stop.
    pub fn mark_finished(&mut self) {
        self.word_index = self.total_words;
        self.set_state(SessionState::Stopped);
    }

    /// The engine failed mid-read. The session stops playing but stays
    /// paused at its position so the user can retry with `Play`.
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(session_id = %self.id, %reason, "Session playback failed");
        self.last_error = Some(reason);
        if matches!(self.state, SessionState::Playing | SessionState::Created) {
            self.set_state(SessionState::Paused);
        }
    }

    /// Clear a recorded failure, typically before a retry.
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Text from the current word to the end.
    ///
    /// This is the only source used when (re)submitting speech, so a restart
    /// neither repeats nor skips words.
    pub fn remaining_text(&self) -> &str {
        &self.text[word_start_offset(&self.text, self.word_index)..]
    }

    /// Fraction of words read, in `[0, 1]`.
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f64 {
        if self.total_words == 0 {
            return 0.0;
        }
        self.word_index as f64 / self.total_words as f64
    }

    /// Whether the session was last active before `cutoff`.
    pub fn is_idle_since(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_active_at < cutoff
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            article_id: self.article_id,
            tab_id: self.tab_id,
            state: self.state,
            is_playing: self.is_playing(),
            is_paused: self.is_paused(),
            word_index: self.word_index,
            total_words: self.total_words,
            start_sentence_index: self.start_sentence_index,
            progress: self.progress(),
            speed: self.speed,
            volume: self.volume,
            created_at: self.created_at,
            last_active_at: self.last_active_at,
            last_error: self.last_error.clone(),
        }
    }

    pub const fn id(&self) -> SessionId {
        self.id
    }

    pub const fn article_id(&self) -> ArticleId {
        self.article_id
    }

    pub const fn tab_id(&self) -> TabId {
        self.tab_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn start_sentence_index(&self) -> usize {
        self.start_sentence_index
    }

    pub const fn word_index(&self) -> usize {
        self.word_index
    }

    pub const fn total_words(&self) -> usize {
        self.total_words
    }

    pub const fn state(&self) -> SessionState {
        self.state
    }

    pub const fn is_playing(&self) -> bool {
        matches!(self.state, SessionState::Playing)
    }

    pub const fn is_paused(&self) -> bool {
        matches!(self.state, SessionState::Paused)
    }

    pub const fn is_stopped(&self) -> bool {
        matches!(self.state, SessionState::Stopped)
    }

    pub const fn speed(&self) -> f32 {
        self.speed
    }

    pub const fn volume(&self) -> f32 {
        self.volume
    }

    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub const fn last_active_at(&self) -> DateTime<Utc> {
        self.last_active_at
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
