//! Sentence segmentation.
//!
//! Splitting is punctuation-based and intentionally naive: every run of
//! `.`, `!` or `?` ends a sentence. Abbreviations ("Dr."), decimal numbers
//! ("3.14") and punctuation inside quotes are not special-cased.
//!
//! Offsets are UTF-8 byte offsets into the segmented text. Each span's
//! `start..end` covers exactly its trimmed `text`, so
//! `&source[span.start..span.end] == span.text` always holds.

use serde::{Deserialize, Serialize};

/// One sentence located inside a larger text blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceSpan {
    /// Trimmed sentence text.
    pub text: String,
    /// Byte offset of the first character.
    #[serde(rename = "startOffset")]
    pub start: usize,
    /// Byte offset one past the last character.
    #[serde(rename = "endOffset")]
    pub end: usize,
}

impl SentenceSpan {
    /// Whether `offset` falls inside this span.
    pub const fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    /// Length of the sentence in bytes.
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Spans are never empty; provided for clippy's `len_without_is_empty`.
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

const fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Split `text` into ordered, non-overlapping sentence spans.
///
/// Trailing text without terminal punctuation becomes a final sentence.
/// Whitespace-only stretches are dropped.
#[must_use]
pub fn segment(text: &str) -> Vec<SentenceSpan> {
    let mut spans = Vec::new();
    let mut segment_start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !is_terminal(c) {
            continue;
        }

        // Swallow the whole punctuation run ("?!", "...") into this sentence.
        let mut end = idx + c.len_utf8();
        while let Some(&(next_idx, next)) = chars.peek() {
            if !is_terminal(next) {
                break;
            }
            end = next_idx + next.len_utf8();
            chars.next();
        }

        push_trimmed(text, segment_start, end, &mut spans);
        segment_start = end;
    }

    push_trimmed(text, segment_start, text.len(), &mut spans);
    spans
}

fn push_trimmed(text: &str, start: usize, end: usize, spans: &mut Vec<SentenceSpan>) {
    let raw = &text[start..end];
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }

    let lead = raw.len() - raw.trim_start().len();
    let abs_start = start + lead;
    spans.push(SentenceSpan {
        text: trimmed.to_string(),
        start: abs_start,
        end: abs_start + trimmed.len(),
    });
}

/// Index of the span a byte offset belongs to.
///
/// Offsets in the whitespace between two sentences resolve to the
/// following sentence; offsets past the last sentence resolve to the last
/// one. Returns `None` only when `spans` is empty.
pub fn span_index_at(spans: &[SentenceSpan], offset: usize) -> Option<usize> {
    if spans.is_empty() {
        return None;
    }
    spans
        .iter()
        .position(|span| offset < span.end)
        .or(Some(spans.len() - 1))
}

/// Whether `text` contains any sentence-terminal punctuation.
pub fn has_terminal_punctuation(text: &str) -> bool {
    text.chars().any(is_terminal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(spans: &[SentenceSpan]) -> Vec<&str> {
        spans.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn splits_on_terminal_punctuation() {
        let spans = segment("First sentence here. Second one follows. Third ends it!");
        assert_eq!(
            texts(&spans),
            vec!["First sentence here.", "Second one follows.", "Third ends it!"]
        );
        assert_eq!(spans[0].start, 0);
        assert_eq!(spans[0].end, 20);
        assert_eq!(spans[1].start, 21);
    }

    #[test]
    fn punctuation_runs_stay_together() {
        let spans = segment("Really?! Yes... Fine.");
        assert_eq!(texts(&spans), vec!["Really?!", "Yes...", "Fine."]);
    }

    #[test]
    fn trailing_text_without_punctuation_is_kept() {
        let spans = segment("One. And then some");
        assert_eq!(texts(&spans), vec!["One.", "And then some"]);
    }

    #[test]
    fn whitespace_only_spans_are_dropped() {
        assert!(segment("   \n\t ").is_empty());
        assert!(segment("").is_empty());
        let spans = segment("Hi.   ");
        assert_eq!(texts(&spans), vec!["Hi."]);
    }

    #[test]
    fn decimals_are_split_naively() {
        let spans = segment("Pi is 3.14 roughly.");
        assert_eq!(texts(&spans), vec!["Pi is 3.", "14 roughly."]);
    }

    #[test]
    fn offsets_cover_trimmed_text() {
        let source = "  Alpha beta.\n\n  Gamma?  Delta ";
        for span in segment(source) {
            assert_eq!(&source[span.start..span.end], span.text);
            assert_eq!(source[span.start..span.end].trim(), span.text);
        }
    }

    #[test]
    fn multibyte_text_keeps_char_boundaries() {
        let source = "Café crème. Naïve résumé!";
        let spans = segment(source);
        assert_eq!(texts(&spans), vec!["Café crème.", "Naïve résumé!"]);
        for span in &spans {
            assert_eq!(&source[span.start..span.end], span.text);
        }
    }

    #[test]
    fn resegmenting_joined_sentences_is_stable() {
        let source = "One fish.  Two fish!\nRed fish?   Blue fish.";
        let first = segment(source);
        let joined = texts(&first).join(" ");
        let second = segment(&joined);
        assert_eq!(texts(&first), texts(&second));
    }

    #[test]
    fn offset_lookup_prefers_following_sentence_in_gaps() {
        let spans = segment("Aa. Bb. Cc.");
        assert_eq!(span_index_at(&spans, 0), Some(0));
        assert_eq!(span_index_at(&spans, 3), Some(1));
        assert_eq!(span_index_at(&spans, 5), Some(1));
        assert_eq!(span_index_at(&spans, 99), Some(2));
        assert_eq!(span_index_at(&[], 0), None);
    }
}
