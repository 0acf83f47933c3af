//! A speech engine that prints instead of speaking.
//!
//! Each utterance runs on a tokio task that writes one word at a time and
//! reports a word boundary per word, paced by words per minute and the
//! utterance rate. Cancelling bumps a generation counter that running tasks
//! check between words.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use readaloud_core::{BoundaryKind, ReaderError, ReaderResult, SpeechEngine, Utterance, VoiceInfo};
use tokio::runtime::Handle;

const PAUSE_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
struct Flags {
    generation: AtomicU64,
    speaking: AtomicBool,
    paused: AtomicBool,
}

/// Console-backed [`SpeechEngine`].
#[derive(Debug, Clone)]
pub struct ConsoleEngine {
    words_per_minute: u32,
    flags: Arc<Flags>,
}

impl ConsoleEngine {
    pub fn new(words_per_minute: u32) -> Self {
        Self {
            words_per_minute: words_per_minute.max(1),
            flags: Arc::new(Flags::default()),
        }
    }

    /// Delay between words at `rate`.
    fn word_delay(&self, rate: f32) -> Duration {
        let per_minute = f64::from(self.words_per_minute) * f64::from(rate.max(0.1));
        Duration::from_secs_f64(60.0 / per_minute)
    }
}

/// Print one word and flush so it shows up as it is "spoken".
fn print_word(out: &mut impl Write, word: &str) -> io::Result<()> {
    write!(out, "{word} ")?;
    out.flush()
}

impl SpeechEngine for ConsoleEngine {
    fn is_supported(&self) -> bool {
        true
    }

    fn voices(&self) -> Vec<VoiceInfo> {
        vec![VoiceInfo::new("console", "en-US", true).with_default(true)]
    }

    fn speak(&self, utterance: Utterance) -> ReaderResult<()> {
        let handle = Handle::try_current().map_err(|err| ReaderError::EngineFailure {
            reason: err.to_string(),
        })?;
        let generation = self.flags.generation.load(Ordering::SeqCst);
        let flags = Arc::clone(&self.flags);
        let delay = self.word_delay(utterance.rate);
        flags.speaking.store(true, Ordering::SeqCst);
        flags.paused.store(false, Ordering::SeqCst);

        handle.spawn(async move {
            let live = || flags.generation.load(Ordering::SeqCst) == generation;
            let callbacks = utterance.callbacks;
            callbacks.on_start();

            let mut out = std::io::stdout();
            let mut word_start = None;
            let text = utterance.text;
            let boundaries = text
                .char_indices()
                .chain(std::iter::once((text.len(), ' ')));
            for (idx, c) in boundaries {
                match (c.is_whitespace(), word_start) {
                    (false, None) => word_start = Some(idx),
                    (true, Some(start)) => {
                        while flags.paused.load(Ordering::SeqCst) && live() {
                            tokio::time::sleep(PAUSE_POLL).await;
                        }
                        if !live() {
                            callbacks.on_error("interrupted");
                            return;
                        }
                        callbacks.on_boundary(start, BoundaryKind::Word);
                        if let Err(err) = print_word(&mut out, &text[start..idx]) {
                            tracing::debug!(%err, "Console write failed");
                        }
                        word_start = None;
                        tokio::time::sleep(delay).await;
                    }
                    _ => {}
                }
            }

            if live() {
                if let Err(err) = writeln!(out).and_then(|()| out.flush()) {
                    tracing::debug!(%err, "Console write failed");
                }
                flags.speaking.store(false, Ordering::SeqCst);
                callbacks.on_end();
            } else {
                callbacks.on_error("interrupted");
            }
        });
        Ok(())
    }

    fn pause(&self) {
        self.flags.paused.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.flags.paused.store(false, Ordering::SeqCst);
    }

    fn cancel(&self) {
        self.flags.generation.fetch_add(1, Ordering::SeqCst);
        self.flags.speaking.store(false, Ordering::SeqCst);
        self.flags.paused.store(false, Ordering::SeqCst);
    }

    fn is_speaking(&self) -> bool {
        self.flags.speaking.load(Ordering::SeqCst)
    }

    fn is_paused(&self) -> bool {
        self.flags.paused.load(Ordering::SeqCst)
    }
}
