//! Text cleanup for extracted article blocks.
//!
//! Removes markup residue that survives node stripping (inline script or
//! style bodies, comments, stray tags), drops boilerplate blocks such as
//! "Advertisement" labels, and collapses whitespace so sentence offsets are
//! computed over a normalized string.

/// Blocks shorter than this are checked against [`BOILERPLATE_PREFIXES`].
const BOILERPLATE_MAX_CHARS: usize = 80;

/// Lower-case prefixes of short blocks that are page chrome, not content.
const BOILERPLATE_PREFIXES: &[&str] = &[
    "advertisement",
    "sponsored",
    "skip to content",
    "skip to main content",
    "share this",
    "share on",
    "follow us",
    "sign up for our newsletter",
    "subscribe to our newsletter",
    "related articles",
    "read more:",
    "we use cookies",
    "accept cookies",
];

/// Clean a sequence of raw text blocks into one normalized string.
///
/// Each block is stripped of markup residue and collapsed; empty and
/// boilerplate blocks are skipped; survivors are joined with single spaces.
pub fn clean_blocks<I, S>(blocks: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut result = String::new();

    for block in blocks {
        let cleaned = collapse_whitespace(&strip_markup_residue(block.as_ref()));
        if cleaned.is_empty() || is_boilerplate(&cleaned) {
            continue;
        }
        if !result.is_empty() {
            result.push(' ');
        }
        result.push_str(&cleaned);
    }

    result
}

/// Remove script/style bodies, comments and any remaining tags.
pub fn strip_markup_residue(text: &str) -> String {
    let mut result = strip_tag_block_pair(text, "<script", "</script>");
    result = strip_tag_block_pair(&result, "<style", "</style>");
    result = strip_tag_block_pair(&result, "<noscript", "</noscript>");
    result = strip_comments(&result);
    strip_html_tags(&result)
}

/// Whether a cleaned block is a known piece of page chrome.
pub fn is_boilerplate(block: &str) -> bool {
    if block.chars().count() > BOILERPLATE_MAX_CHARS {
        return false;
    }
    let lower = block.to_lowercase();
    BOILERPLATE_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// Collapse every whitespace run to one space and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_space = false;

    for c in text.chars() {
        if c.is_whitespace() {
            if !prev_space {
                result.push(' ');
                prev_space = true;
            }
        } else {
            result.push(c);
            prev_space = false;
        }
    }

    result.trim().to_string()
}

/// Remove all occurrences of `<open_prefix…>…<close_tag>` from text.
///
/// `open_prefix` may be a prefix like `<script` that matches `<script>` and
/// `<script type="module">`. Matching is ASCII case-insensitive.
pub(crate) fn strip_tag_block_pair(text: &str, open_prefix: &str, close_tag: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let haystack = text.to_ascii_lowercase();
    let open_lower = open_prefix.to_ascii_lowercase();
    let close_lower = close_tag.to_ascii_lowercase();

    let mut cursor = 0;

    while cursor < text.len() {
        let Some(open_start) = haystack[cursor..].find(&open_lower) else {
            result.push_str(&text[cursor..]);
            break;
        };
        let abs_open = cursor + open_start;

        if let Some(tag_end_offset) = haystack[abs_open..].find('>') {
            let tag_end = abs_open + tag_end_offset + 1;
            if let Some(close_offset) = haystack[tag_end..].find(&close_lower) {
                result.push_str(&text[cursor..abs_open]);
                cursor = tag_end + close_offset + close_tag.len();
                continue;
            }
        }

        // Unterminated block: keep it and move past the prefix.
        result.push_str(&text[cursor..abs_open + open_prefix.len()]);
        cursor = abs_open + open_prefix.len();
    }

    result
}

fn strip_comments(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("<!--") {
        result.push_str(&rest[..start]);
        match rest[start..].find("-->") {
            Some(end) => rest = &rest[start + end + 3..],
            None => {
                rest = "";
                break;
            }
        }
    }
    result.push_str(rest);
    result
}

fn strip_html_tags(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        // Only treat '<' as a tag opener when it looks like one, so prose
        // such as "a < b" survives.
        let opens_tag = c == '<'
            && chars
                .peek()
                .is_some_and(|next| next.is_ascii_alphabetic() || matches!(next, '/' | '!'));
        if !opens_tag {
            result.push(c);
            continue;
        }
        for inner in chars.by_ref() {
            if inner == '>' {
                break;
            }
        }
        result.push(' ');
    }

    result
}
