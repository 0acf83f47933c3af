//! Extract command handler.
//!
//! Prints the extracted article: title, method and numbered sentences, or
//! the whole `ArticleContent` as JSON.

use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use readaloud_core::{ArticleContent, ArticleExtractor};

use super::{file_url, load_document};

/// Execute the extract command.
pub fn execute(file: &Path, json: bool) -> Result<()> {
    let doc = load_document(file)?;
    let article = ArticleExtractor::default()
        .extract(&doc, &file_url(file))
        .map_err(crate::CliError::from)?;

    let mut out = io::stdout().lock();
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&article)?)?;
    } else {
        render(&article, &mut out)?;
    }
    out.flush()?;
    Ok(())
}

/// Write the human-readable article listing.
fn render(article: &ArticleContent, out: &mut impl Write) -> io::Result<()> {
    writeln!(
        out,
        "{}\n{} words, {} sentences (method: {})\n",
        article.title,
        article.word_count,
        article.sentence_count(),
        article.extraction_method
    )?;
    for (index, sentence) in article.sentences.iter().enumerate() {
        writeln!(out, "{index:>4}  {}", sentence.text)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use readaloud_core::ExtractionMethod;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn article() -> ArticleContent {
        ArticleContent::new(
            "u",
            "Notes",
            "One here. Two there.",
            ExtractionMethod::Fallback,
            None,
        )
    }

    #[test]
    fn renders_numbered_sentences() {
        let mut buf = Vec::new();
        render(&article(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("Notes\n4 words, 2 sentences (method: fallback)"));
        assert!(text.contains("   0  One here.\n"));
        assert!(text.contains("   1  Two there.\n"));
    }

    #[test]
    fn write_errors_are_reported() {
        let err = render(&article(), &mut BrokenPipe).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
