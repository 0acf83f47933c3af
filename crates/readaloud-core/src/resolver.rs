//! Click-to-position resolution.
//!
//! Maps a click on the page to a sentence of an already extracted article.
//! The clicked sentence is found in the DOM first (nearest paragraph-like
//! block around the hit text, segmented on its own) and then looked up in
//! the article's sentence list by text, because DOM offsets and article
//! offsets do not line up once the article text has been cleaned.
//!
//! Resolution never fails: a click that matches nothing reads the whole
//! article.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::article::ArticleContent;
use crate::dom::{CaretPosition, DocumentTree, NodeId};
use crate::text::cleanup::collapse_whitespace;
use crate::text::sentences::{has_terminal_punctuation, span_index_at};
use crate::text::segment;

/// Inline tags skipped while walking up to the enclosing block.
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "cite", "code", "em", "font", "i", "label", "mark", "q", "s", "small",
    "span", "strong", "sub", "sup", "time", "u",
];

/// What the user clicked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClickTarget {
    /// Page coordinates, hit-tested through the tree.
    Point { x: f64, y: f64 },
    /// An already hit-tested caret.
    Caret(CaretPosition),
    /// A node, treated as a click at its start.
    Node { node: NodeId },
}

/// Where reading should start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPosition {
    pub start_sentence_index: usize,
    /// Sentences from `start_sentence_index` to the end, space-joined.
    pub remaining_text: String,
    /// `false` when resolution fell back to the start of the article.
    pub matched: bool,
    /// The sentence found under the click in the DOM, if any.
    pub clicked_sentence: Option<String>,
}

/// Resolves clicks against extracted articles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClickResolver;

impl ClickResolver {
    pub const fn new() -> Self {
        Self
    }

    /// Resolve `target` to a start sentence of `article`.
    pub fn resolve(
        &self,
        tree: &dyn DocumentTree,
        target: ClickTarget,
        article: &ArticleContent,
    ) -> ResolvedPosition {
        let clicked = clicked_sentence(tree, target);
        let index = clicked
            .as_deref()
            .and_then(|sentence| match_sentence(article, sentence));

        match index {
            Some(index) => {
                debug!(index, "Click matched article sentence");
                ResolvedPosition {
                    start_sentence_index: index,
                    remaining_text: article.remaining_from(index),
                    matched: true,
                    clicked_sentence: clicked,
                }
            }
            None => {
                debug!(
                    clicked = clicked.as_deref().unwrap_or(""),
                    "Click did not match, reading from the start"
                );
                ResolvedPosition {
                    start_sentence_index: 0,
                    remaining_text: article.remaining_from(0),
                    matched: false,
                    clicked_sentence: clicked,
                }
            }
        }
    }
}

fn caret_for(tree: &dyn DocumentTree, target: ClickTarget) -> Option<CaretPosition> {
    match target {
        ClickTarget::Point { x, y } => tree.caret_from_point(x, y),
        ClickTarget::Caret(caret) => tree.kind(caret.node).map(|_| caret),
        ClickTarget::Node { node } => tree
            .kind(node)
            .map(|_| CaretPosition { node, offset: 0 }),
    }
}

/// Nearest non-inline element at or above `start` whose text has
/// sentence-terminal punctuation.
fn enclosing_block(tree: &dyn DocumentTree, hit: NodeId) -> Option<NodeId> {
    let start = if tree.text(hit).is_some() {
        tree.parent(hit)?
    } else {
        hit
    };

    std::iter::once(start)
        .chain(tree.ancestors(start))
        .find(|&id| {
            tree.element(id).is_some_and(|el| {
                !INLINE_TAGS.contains(&el.tag.as_str())
                    && has_terminal_punctuation(&tree.text_content(id))
            })
        })
}

/// Byte offset of the caret within the concatenated text of `block`.
fn offset_in_block(tree: &dyn DocumentTree, block: NodeId, caret: CaretPosition) -> usize {
    if caret.node == block {
        return 0;
    }
    let mut offset = 0;
    for id in tree.descendants(block) {
        let len = tree.text(id).map_or(0, str::len);
        if id == caret.node {
            return offset + caret.offset.min(len);
        }
        offset += len;
    }
    offset
}

/// The whitespace-collapsed sentence under the click, found in the DOM.
fn clicked_sentence(tree: &dyn DocumentTree, target: ClickTarget) -> Option<String> {
    let caret = caret_for(tree, target)?;
    let block = enclosing_block(tree, caret.node)?;
    let offset = offset_in_block(tree, block, caret);

    let block_text = tree.text_content(block);
    let spans = segment(&block_text);
    let index = span_index_at(&spans, offset)?;
    let sentence = collapse_whitespace(&spans[index].text);
    (!sentence.is_empty()).then_some(sentence)
}

/// Exact match first, then containment in either direction; first wins.
fn match_sentence(article: &ArticleContent, clicked: &str) -> Option<usize> {
    let normalized: Vec<String> = article
        .sentences
        .iter()
        .map(|span| collapse_whitespace(&span.text))
        .collect();

    normalized
        .iter()
        .position(|sentence| sentence == clicked)
        .or_else(|| {
            normalized.iter().position(|sentence| {
                !sentence.is_empty()
                    && (sentence.contains(clicked) || clicked.contains(sentence.as_str()))
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::{ArticleExtractor, ExtractionMethod};
    use crate::dom::{Element, MemoryDocument, Rect};

    const TEXT: &str = "First sentence here. Second one follows. Third ends it!";

    fn article() -> ArticleContent {
        ArticleContent::new("u", "t", TEXT, ExtractionMethod::Readability, None)
    }

    #[test]
    fn caret_inside_second_sentence() {
        let doc = MemoryDocument::from_markup(&format!("<article><p>{TEXT}</p></article>")).unwrap();
        let node = doc.find_text("Second").unwrap();
        let resolved = ClickResolver::new().resolve(
            &doc,
            ClickTarget::Caret(CaretPosition { node, offset: 25 }),
            &article(),
        );
        assert_eq!(resolved.start_sentence_index, 1);
        assert_eq!(resolved.remaining_text, "Second one follows. Third ends it!");
        assert!(resolved.matched);
    }

    #[test]
    fn click_on_inline_element_walks_up_to_paragraph() {
        let doc = MemoryDocument::from_markup(
            "<div><p>First sentence here. Second <b>one</b> follows. Third ends it!</p></div>",
        )
        .unwrap();
        let bold = doc.find_text("one").unwrap();
        let resolved = ClickResolver::new().resolve(
            &doc,
            ClickTarget::Caret(CaretPosition { node: bold, offset: 1 }),
            &article(),
        );
        assert_eq!(resolved.start_sentence_index, 1);
        assert_eq!(resolved.clicked_sentence.as_deref(), Some("Second one follows."));
    }

    #[test]
    fn point_clicks_are_hit_tested() {
        let mut doc = MemoryDocument::new();
        let p = doc.append_element(doc.root(), Element::new("p"));
        let text = doc.append_text(p, TEXT);
        doc.set_bounds(text, Rect::new(0.0, 0.0, 550.0, 20.0));

        // 55 chars over 550px: x=450 lands in "Third".
        let resolved =
            ClickResolver::new().resolve(&doc, ClickTarget::Point { x: 450.0, y: 10.0 }, &article());
        assert_eq!(resolved.start_sentence_index, 2);
        assert_eq!(resolved.remaining_text, "Third ends it!");
    }

    #[test]
    fn containment_match_when_dom_has_extra_words() {
        let doc = MemoryDocument::from_markup("<p>Update: Second one follows.</p>").unwrap();
        let node = doc.find_text("Update").unwrap();
        let resolved = ClickResolver::new().resolve(
            &doc,
            ClickTarget::Caret(CaretPosition { node, offset: 0 }),
            &article(),
        );
        assert!(resolved.matched);
        assert_eq!(resolved.start_sentence_index, 1);
    }

    #[test]
    fn misses_fall_back_to_start() {
        let doc = MemoryDocument::from_markup("<nav><p>Unrelated menu text.</p></nav>").unwrap();
        let node = doc.find_text("Unrelated").unwrap();
        let resolver = ClickResolver::new();

        let unmatched = resolver.resolve(
            &doc,
            ClickTarget::Caret(CaretPosition { node, offset: 3 }),
            &article(),
        );
        assert_eq!(unmatched.start_sentence_index, 0);
        assert!(!unmatched.matched);
        assert_eq!(unmatched.remaining_text, TEXT);

        let nowhere = resolver.resolve(&doc, ClickTarget::Point { x: 9e6, y: 9e6 }, &article());
        assert_eq!(nowhere.start_sentence_index, 0);
        assert_eq!(nowhere.clicked_sentence, None);
    }

    #[test]
    fn node_target_resolves_at_node_start() {
        let doc = MemoryDocument::from_markup(
            "<article><p>First sentence here.</p><p>Second one follows.</p><p>Third ends it!</p></article>",
        )
        .unwrap();
        let extracted = ArticleExtractor::default().extract(&doc, "u").unwrap();
        let third = doc.find_text("Third").unwrap();
        let p = doc.parent(third).unwrap();

        let resolved = ClickResolver::new().resolve(&doc, ClickTarget::Node { node: p }, &extracted);
        assert_eq!(resolved.start_sentence_index, 2);
    }
}
