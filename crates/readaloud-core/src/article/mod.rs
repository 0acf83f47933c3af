//! Article extraction.
//!
//! Turns an arbitrary page into one [`ArticleContent`]: the cleaned main
//! text, its sentence spans, a title and the geometry of the container it
//! came from. Three tiers produce content, recorded as [`ExtractionMethod`]:
//!
//! 1. `Readability` - the best density-scored container ([`scoring`]).
//! 2. `Fallback` - a conventional content selector, or the whole page.
//! 3. `Selection` - text the user selected, wrapped as-is.

pub mod config;
mod extractor;
pub mod filter;
pub mod scoring;
mod selection;
pub mod title;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dom::Rect;
use crate::text::{SentenceSpan, count_words, segment};

pub use config::ExtractionConfig;
pub use extractor::ArticleExtractor;
pub use selection::extract_selection;

/// Unique id of one extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(Uuid);

impl ArticleId {
    /// Generate a fresh id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ArticleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which tier produced an article's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    Readability,
    Fallback,
    Selection,
}

impl ExtractionMethod {
    /// Confidence rank: selection, then readability, then fallback.
    pub const fn confidence(self) -> u8 {
        match self {
            Self::Selection => 3,
            Self::Readability => 2,
            Self::Fallback => 1,
        }
    }

    /// Whether `self` is strictly more trustworthy than `other`.
    pub const fn outranks(self, other: Self) -> bool {
        self.confidence() > other.confidence()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Readability => "readability",
            Self::Fallback => "fallback",
            Self::Selection => "selection",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of extracting one page. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleContent {
    pub id: ArticleId,
    pub source_url: String,
    pub title: String,
    pub full_text: String,
    /// Ordered, non-overlapping spans over `full_text`.
    pub sentences: Vec<SentenceSpan>,
    pub extraction_method: ExtractionMethod,
    /// Geometry of the winning container, when known.
    pub bounds: Option<Rect>,
    pub word_count: usize,
    pub extracted_at: DateTime<Utc>,
}

impl ArticleContent {
    /// Build an article from already-cleaned text, segmenting it once.
    pub fn new(
        source_url: impl Into<String>,
        title: impl Into<String>,
        full_text: impl Into<String>,
        extraction_method: ExtractionMethod,
        bounds: Option<Rect>,
    ) -> Self {
        let full_text = full_text.into();
        Self {
            id: ArticleId::new(),
            source_url: source_url.into(),
            title: title.into(),
            sentences: segment(&full_text),
            word_count: count_words(&full_text),
            full_text,
            extraction_method,
            bounds,
            extracted_at: Utc::now(),
        }
    }

    /// Sentences from `index` to the end, joined with single spaces.
    ///
    /// An index past the end yields an empty string.
    pub fn remaining_from(&self, index: usize) -> String {
        self.sentences
            .get(index..)
            .unwrap_or_default()
            .iter()
            .map(|span| span.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Index of the sentence containing byte `offset` of `full_text`.
    pub fn sentence_at_offset(&self, offset: usize) -> Option<usize> {
        crate::text::sentences::span_index_at(&self.sentences, offset)
    }

    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_confidence_order() {
        assert!(ExtractionMethod::Selection.outranks(ExtractionMethod::Readability));
        assert!(ExtractionMethod::Readability.outranks(ExtractionMethod::Fallback));
        assert!(!ExtractionMethod::Fallback.outranks(ExtractionMethod::Fallback));
    }

    #[test]
    fn remaining_text_from_index() {
        let article = ArticleContent::new(
            "https://example.com",
            "T",
            "First sentence here. Second one follows. Third ends it!",
            ExtractionMethod::Readability,
            None,
        );
        assert_eq!(article.sentence_count(), 3);
        assert_eq!(article.word_count, 9);
        assert_eq!(article.remaining_from(1), "Second one follows. Third ends it!");
        assert_eq!(article.remaining_from(0), article.full_text);
        assert_eq!(article.remaining_from(7), "");
        assert_eq!(article.sentence_at_offset(25), Some(1));
    }

    #[test]
    fn serializes_camel_case() {
        let article =
            ArticleContent::new("u", "t", "One. Two.", ExtractionMethod::Selection, None);
        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["extractionMethod"], "selection");
        assert_eq!(json["sentences"][1]["startOffset"], 5);
        assert_eq!(json["fullText"], "One. Two.");
    }
}
