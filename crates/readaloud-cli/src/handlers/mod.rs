//! Command handlers.
//!
//! Handlers follow one pattern:
//! - Signature: `pub fn execute(...) -> Result<()>` (async where speech runs)
//! - Load the page, call into `readaloud-core`/`readaloud-speech`, format
//!   output for the terminal

pub mod extract;
pub mod read;

use std::fs;
use std::path::Path;

use readaloud_core::MemoryDocument;

use crate::error::CliError;

/// Parse `path` into a document tree.
pub fn load_document(path: &Path) -> Result<MemoryDocument, CliError> {
    let markup = fs::read_to_string(path)
        .map_err(|err| CliError::Io(format!("{}: {err}", path.display())))?;
    Ok(MemoryDocument::from_markup(&markup)?)
}

/// URL used as the article source for a local file.
pub fn file_url(path: &Path) -> String {
    let absolute = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use readaloud_core::DocumentTree;
    use std::io::Write;

    #[test]
    fn loads_markup_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<html><head><title>Saved</title></head><body><p>Hi.</p></body></html>")
            .unwrap();

        let doc = load_document(file.path()).unwrap();
        assert_eq!(doc.document_title(), Some("Saved"));
        assert!(file_url(file.path()).starts_with("file://"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_document(Path::new("/definitely/not/here.html")).unwrap_err();
        assert_eq!(err.exit_code(), 66);
    }
}
