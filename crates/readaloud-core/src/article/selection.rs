use tracing::debug;

use super::{ArticleContent, ExtractionMethod};
use crate::error::{ReaderError, ReaderResult};
use crate::text::cleanup::collapse_whitespace;

/// Title given to selections when the page title is unknown.
const SELECTION_TITLE: &str = "Selected text";

/// Wrap a user selection as an article.
///
/// The selection is only whitespace-collapsed; no scoring or boilerplate
/// filtering is applied.
pub fn extract_selection(
    selection: &str,
    source_url: &str,
    page_title: Option<&str>,
) -> ReaderResult<ArticleContent> {
    let text = collapse_whitespace(selection);
    if text.is_empty() {
        return Err(ReaderError::EmptySelection);
    }

    let title = page_title
        .map(collapse_whitespace)
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| SELECTION_TITLE.to_string());

    debug!(chars = text.len(), "Wrapping selection as article");
    Ok(ArticleContent::new(
        source_url,
        title,
        text,
        ExtractionMethod::Selection,
        None,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_selection() {
        let article = extract_selection("  Hello\n there.  Bye ", "u", Some("Page")).unwrap();
        assert_eq!(article.full_text, "Hello there. Bye");
        assert_eq!(article.extraction_method, ExtractionMethod::Selection);
        assert_eq!(article.title, "Page");
        assert_eq!(article.sentence_count(), 2);
    }

    #[test]
    fn blank_selection_is_rejected() {
        assert_eq!(
            extract_selection(" \n\t ", "u", None).unwrap_err(),
            ReaderError::EmptySelection
        );
    }

    #[test]
    fn untitled_selection() {
        let article = extract_selection("Text.", "u", Some("  ")).unwrap();
        assert_eq!(article.title, SELECTION_TITLE);
    }
}
