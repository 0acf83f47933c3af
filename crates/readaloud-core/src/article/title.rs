//! Article title derivation.

use super::config::ExtractionConfig;
use crate::dom::{DocumentTree, NodeId};
use crate::text::cleanup::collapse_whitespace;

/// Title used when no candidate qualifies.
pub const UNTITLED: &str = "Untitled";

const TITLE_MARKERS: &[&str] = &["title", "headline"];

const META_TITLE_KEYS: &[&str] = &["og:title", "twitter:title"];

/// Pick the first usable title.
///
/// Order: `<h1>` inside the container, any `<h1>`, `<h2>` inside the
/// container, an element with a title/headline class or id, an OpenGraph or
/// Twitter title `<meta>`, then the document title. Candidates that are empty
/// or at least `max_title_chars` long are skipped.
pub fn derive_title(
    tree: &dyn DocumentTree,
    container: Option<NodeId>,
    config: &ExtractionConfig,
) -> String {
    let root = tree.root();
    let usable = |text: String| {
        let title = collapse_whitespace(&text);
        (!title.is_empty() && title.chars().count() < config.max_title_chars).then_some(title)
    };
    let first_heading = |scope: NodeId, tag: &str| {
        tree.descendants(scope)
            .into_iter()
            .filter(|&id| tree.element(id).is_some_and(|el| el.is(tag)))
            .find_map(|id| usable(tree.text_content(id)))
    };

    container
        .and_then(|node| first_heading(node, "h1"))
        .or_else(|| first_heading(root, "h1"))
        .or_else(|| container.and_then(|node| first_heading(node, "h2")))
        .or_else(|| {
            tree.descendants(root)
                .into_iter()
                .filter(|&id| {
                    tree.element(id).is_some_and(|el| {
                        !el.is("meta")
                            && !el.is("title")
                            && el
                                .name_tokens()
                                .iter()
                                .any(|token| TITLE_MARKERS.iter().any(|m| token.contains(m)))
                    })
                })
                .find_map(|id| usable(tree.text_content(id)))
        })
        .or_else(|| {
            tree.descendants(root).into_iter().find_map(|id| {
                let el = tree.element(id).filter(|el| el.is("meta"))?;
                let key = el.attr("property").or_else(|| el.attr("name"))?;
                if !META_TITLE_KEYS.iter().any(|k| key.eq_ignore_ascii_case(k)) {
                    return None;
                }
                usable(el.attr("content")?.to_string())
            })
        })
        .or_else(|| tree.document_title().and_then(|t| usable(t.to_string())))
        .unwrap_or_else(|| UNTITLED.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDocument;

    fn title_of(markup: &str) -> String {
        let doc = MemoryDocument::from_markup(markup).unwrap();
        let container = doc
            .descendants(doc.root())
            .into_iter()
            .find(|&id| doc.element(id).is_some_and(|el| el.is("article")));
        derive_title(&doc, container, &ExtractionConfig::default())
    }

    #[test]
    fn prefers_heading_inside_container() {
        assert_eq!(
            title_of("<h1>Site Name</h1><article><h1> The  Story </h1><p>x</p></article>"),
            "The Story"
        );
    }

    #[test]
    fn falls_back_through_sources() {
        assert_eq!(title_of("<h1>Page Heading</h1><article><p>x</p></article>"), "Page Heading");
        assert_eq!(title_of("<article><h2>Sub</h2></article>"), "Sub");
        assert_eq!(
            title_of("<div class=\"entry-title\">Marked</div><article>x</article>"),
            "Marked"
        );
        assert_eq!(
            title_of("<meta property=\"og:title\" content=\"Open Graph\"><article>x</article>"),
            "Open Graph"
        );
        assert_eq!(
            title_of("<html><head><title>Doc Title</title></head><body><article>x</article></body></html>"),
            "Doc Title"
        );
        assert_eq!(title_of("<article>x</article>"), UNTITLED);
    }

    #[test]
    fn overlong_candidates_are_skipped() {
        let long = "L".repeat(200);
        let markup = format!("<article><h1>{long}</h1><h2>Short</h2></article>");
        assert_eq!(title_of(&markup), "Short");
    }
}
