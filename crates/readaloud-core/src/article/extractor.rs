use tracing::{debug, info};

use super::config::ExtractionConfig;
use super::filter::{has_marker, strip_non_content};
use super::scoring::{best_candidate, score_candidates};
use super::title::derive_title;
use super::{ArticleContent, ExtractionMethod};
use crate::dom::{DocumentTree, MemoryDocument, NodeId, NodeKind};
use crate::error::{ReaderError, ReaderResult};
use crate::text::cleanup::clean_blocks;

/// Tags whose boundaries separate text blocks.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption", "figure",
    "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li", "main", "ol", "p", "pre", "section", "table",
    "td", "th", "tr", "ul",
];

/// Extracts the main article of a page.
///
/// The input tree is never mutated: it is first copied into a pristine
/// [`MemoryDocument`], and non-content nodes are stripped from a clone of
/// that copy. Node ids of the pristine copy and the working clone agree, so
/// titles and geometry are read from the pristine copy.
#[derive(Debug, Clone, Default)]
pub struct ArticleExtractor {
    config: ExtractionConfig,
}

impl ArticleExtractor {
    pub const fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract the article of `tree`.
    ///
    /// Fails with [`ReaderError::NoContentFound`] when even the whole page
    /// yields no text.
    pub fn extract(
        &self,
        tree: &dyn DocumentTree,
        source_url: &str,
    ) -> ReaderResult<ArticleContent> {
        let pristine = MemoryDocument::snapshot(tree);
        let mut working = pristine.clone();
        let stripped = strip_non_content(&mut working, &self.config);
        debug!(stripped, "Stripped non-content nodes");

        let (node, text, method) = self
            .readability(&working)
            .map(|(node, text)| (node, text, ExtractionMethod::Readability))
            .or_else(|| {
                self.selector_fallback(&working)
                    .map(|(node, text)| (node, text, ExtractionMethod::Fallback))
            })
            .or_else(|| {
                self.whole_page(&working)
                    .map(|(node, text)| (node, text, ExtractionMethod::Fallback))
            })
            .ok_or(ReaderError::NoContentFound)?;

        let title = derive_title(&pristine, Some(node), &self.config);
        let article = ArticleContent::new(source_url, title, text, method, pristine.bounds(node));

        info!(
            method = %article.extraction_method,
            sentences = article.sentence_count(),
            words = article.word_count,
            "Article extracted"
        );
        Ok(article)
    }

    fn readability(&self, working: &MemoryDocument) -> Option<(NodeId, String)> {
        let candidates = score_candidates(working, &self.config);
        let best = best_candidate(&candidates, &self.config)?;
        debug!(
            node = best.node.0,
            score = best.score,
            candidates = candidates.len(),
            "Readability winner"
        );
        let text = self.container_text(working, best.node)?;
        (text.chars().count() >= self.config.min_candidate_text_length).then_some((best.node, text))
    }

    /// First match of: `<main>`, `<article>`, `role="main"`, then a
    /// content-ish class or id.
    fn selector_fallback(&self, working: &MemoryDocument) -> Option<(NodeId, String)> {
        let nodes = working.descendants(working.root());
        let by_tag = |tag: &'static str| {
            move |id: &NodeId| working.element(*id).is_some_and(|el| el.is(tag))
        };
        let by_role = |id: &NodeId| {
            working.element(*id).is_some_and(|el| {
                el.attr("role")
                    .is_some_and(|role| role.eq_ignore_ascii_case("main"))
            })
        };
        let by_marker = |id: &NodeId| {
            working
                .element(*id)
                .is_some_and(|el| has_marker(el, &self.config.content_markers))
        };

        let tiers: [&dyn Fn(&NodeId) -> bool; 4] =
            [&by_tag("main"), &by_tag("article"), &by_role, &by_marker];
        tiers.iter().find_map(|matches| {
            nodes
                .iter()
                .filter(|&id| matches(id))
                .find_map(|&id| self.container_text(working, id).map(|text| (id, text)))
        })
    }

    fn whole_page(&self, working: &MemoryDocument) -> Option<(NodeId, String)> {
        let body = working
            .descendants(working.root())
            .into_iter()
            .find(|&id| working.element(id).is_some_and(|el| el.is("body")))
            .unwrap_or_else(|| working.root());
        self.container_text(working, body).map(|text| (body, text))
    }

    /// Cleaned block text under `node`, or `None` when too short.
    fn container_text(&self, working: &MemoryDocument, node: NodeId) -> Option<String> {
        let mut blocks = vec![String::new()];
        collect_blocks(working, node, &mut blocks);
        let text = clean_blocks(&blocks);
        (text.chars().count() >= self.config.min_page_text_length.max(1)).then_some(text)
    }
}

fn collect_blocks(tree: &dyn DocumentTree, node: NodeId, blocks: &mut Vec<String>) {
    for &child in tree.children(node) {
        match tree.kind(child) {
            Some(NodeKind::Text(text)) => {
                if let Some(current) = blocks.last_mut() {
                    current.push_str(text);
                }
            }
            Some(NodeKind::Element(el)) if BLOCK_TAGS.contains(&el.tag.as_str()) => {
                blocks.push(String::new());
                collect_blocks(tree, child, blocks);
                blocks.push(String::new());
            }
            Some(_) => collect_blocks(tree, child, blocks),
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(markup: &str) -> ReaderResult<ArticleContent> {
        let doc = MemoryDocument::from_markup(markup)?;
        ArticleExtractor::default().extract(&doc, "https://example.com/post")
    }

    #[test]
    fn readability_picks_dense_container() {
        let article = extract(
            "<body>\
               <nav><a href=\"/\">Home</a> <a href=\"/about\">About</a></nav>\
               <div class=\"story\">\
                 <h1>Big News</h1>\
                 <p>The council voted on Tuesday to expand the park.</p>\
                 <p>Residents had asked for more green space for years.</p>\
               </div>\
               <footer>Copyright</footer>\
             </body>",
        )
        .unwrap();

        assert_eq!(article.extraction_method, ExtractionMethod::Readability);
        assert_eq!(article.title, "Big News");
        assert_eq!(
            article.full_text,
            "Big News The council voted on Tuesday to expand the park. \
             Residents had asked for more green space for years."
        );
        assert!(!article.full_text.contains("Home"));
    }

    #[test]
    fn blocks_are_separated_by_spaces() {
        let article = extract(
            "<article><p>One sentence without gap.</p><p>Another follows here.</p>\
             <ul><li>Item one</li><li>Item two</li></ul></article>",
        )
        .unwrap();
        assert!(article.full_text.contains("gap. Another"));
        assert!(article.full_text.contains("Item one Item two"));
    }

    #[test]
    fn short_content_uses_selector_fallback() {
        let article = extract("<body><main><p>Tiny text.</p></main><p>Other.</p></body>").unwrap();
        assert_eq!(article.extraction_method, ExtractionMethod::Fallback);
        assert_eq!(article.full_text, "Tiny text.");
    }

    #[test]
    fn content_marker_fallback() {
        let article =
            extract("<body><div id=\"post-body\"><p>Short post.</p></div><p>Else.</p></body>").unwrap();
        assert_eq!(article.extraction_method, ExtractionMethod::Fallback);
        assert_eq!(article.full_text, "Short post.");
    }

    #[test]
    fn whole_page_fallback() {
        let article = extract("<body><p>Just a line.</p><span>And more</span></body>").unwrap();
        assert_eq!(article.extraction_method, ExtractionMethod::Fallback);
        assert_eq!(article.full_text, "Just a line. And more");
    }

    #[test]
    fn empty_page_is_no_content() {
        let err = extract("<body><nav>Menu</nav><div class=\"ad\">Buy</div></body>").unwrap_err();
        assert_eq!(err, ReaderError::NoContentFound);
    }

    #[test]
    fn live_tree_is_not_mutated() {
        let doc = MemoryDocument::from_markup(
            "<body><nav>Menu</nav><article><p>Body text.</p></article></body>",
        )
        .unwrap();
        ArticleExtractor::default().extract(&doc, "u").unwrap();
        assert!(doc.find_text("Menu").is_some());
    }
}
