//! Text utilities: sentence segmentation, word positions and cleanup.

pub mod cleanup;
pub mod sentences;
pub mod words;

pub use sentences::{SentenceSpan, segment};
pub use words::{count_words, word_start_offset, words_before};
