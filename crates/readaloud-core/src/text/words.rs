//! Whitespace word counting and word/byte-offset conversion.
//!
//! Word positions are approximate: a word is any run of non-whitespace
//! characters. This matches how speech engines report word boundaries
//! closely enough for progress tracking.

/// Number of whitespace-separated words in `text`.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Byte offset where the `word_index`-th word (0-based) begins.
///
/// Returns `text.len()` when the index is past the last word.
pub fn word_start_offset(text: &str, word_index: usize) -> usize {
    word_starts(text).nth(word_index).unwrap_or(text.len())
}

/// Number of words that begin strictly before `byte_offset`.
///
/// A boundary event reporting the start of word `k` therefore maps back to
/// `k`, the index of the word currently being spoken.
pub fn words_before(text: &str, byte_offset: usize) -> usize {
    word_starts(text).take_while(|&start| start < byte_offset).count()
}

/// Iterator over the byte offsets at which each word starts.
fn word_starts(text: &str) -> impl Iterator<Item = usize> + '_ {
    let mut prev_ws = true;
    text.char_indices().filter_map(move |(idx, c)| {
        let is_ws = c.is_whitespace();
        let starts_word = prev_ws && !is_ws;
        prev_ws = is_ws;
        starts_word.then_some(idx)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_words_across_whitespace_kinds() {
        assert_eq!(count_words("  one two\tthree\nfour  "), 4);
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words("   "), 0);
    }

    #[test]
    fn word_start_offsets() {
        let text = "alpha  beta gamma";
        assert_eq!(word_start_offset(text, 0), 0);
        assert_eq!(word_start_offset(text, 1), 7);
        assert_eq!(word_start_offset(text, 2), 12);
        assert_eq!(word_start_offset(text, 3), text.len());
        assert_eq!(&text[word_start_offset(text, 1)..], "beta gamma");
    }

    #[test]
    fn words_before_offset() {
        let text = "alpha  beta gamma";
        assert_eq!(words_before(text, 0), 0);
        assert_eq!(words_before(text, 1), 1);
        assert_eq!(words_before(text, 7), 1);
        assert_eq!(words_before(text, 12), 2);
        assert_eq!(words_before(text, 500), 3);
    }

    #[test]
    fn leading_whitespace_is_not_a_word() {
        assert_eq!(word_start_offset("  hi there", 0), 2);
        assert_eq!(words_before("  hi there", 2), 0);
    }
}
