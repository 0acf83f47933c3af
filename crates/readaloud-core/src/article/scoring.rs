//! Content-density scoring of candidate containers.

use tracing::trace;

use super::config::ExtractionConfig;
use crate::dom::{DocumentTree, Element, NodeId};
use crate::text::cleanup::collapse_whitespace;

/// Tags that may hold an article body.
const CANDIDATE_TAGS: &[&str] = &["div", "section", "article", "main", "td", "blockquote"];

/// A scored container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub node: NodeId,
    pub score: f64,
    /// Length of the collapsed text, in characters.
    pub text_len: usize,
}

/// `<article>`, `<main>` or anything with `role="main"`.
pub fn is_semantic_container(element: &Element) -> bool {
    element.is("article")
        || element.is("main")
        || element
            .attr("role")
            .is_some_and(|role| role.eq_ignore_ascii_case("main"))
}

fn is_candidate(element: &Element) -> bool {
    CANDIDATE_TAGS.iter().any(|tag| element.is(tag)) || is_semantic_container(element)
}

fn text_len(tree: &dyn DocumentTree, node: NodeId) -> usize {
    collapse_whitespace(&tree.text_content(node)).chars().count()
}

/// Share of the text under `node` that sits inside links.
#[allow(clippy::cast_precision_loss)]
pub fn link_density(tree: &dyn DocumentTree, node: NodeId) -> f64 {
    let total = text_len(tree, node);
    if total == 0 {
        return 0.0;
    }
    let linked: usize = tree
        .descendants(node)
        .into_iter()
        .filter(|&id| tree.element(id).is_some_and(|el| el.is("a")))
        .map(|id| text_len(tree, id))
        .sum();
    (linked as f64 / total as f64).min(1.0)
}

/// Score one node, or `None` when it is not a candidate container.
///
/// `text_len / chars_per_point + points_per_paragraph * direct <p> children`,
/// plus the semantic bonus, scaled by `1 - link_density` when links dominate
/// and halved for crowded, sparse containers.
#[allow(clippy::cast_precision_loss)]
pub fn score_node(
    tree: &dyn DocumentTree,
    node: NodeId,
    config: &ExtractionConfig,
) -> Option<Candidate> {
    let element = tree.element(node)?;
    if !is_candidate(element) {
        return None;
    }

    let text_len = text_len(tree, node);
    let children: Vec<&Element> = tree
        .children(node)
        .iter()
        .filter_map(|&id| tree.element(id))
        .collect();
    let paragraphs = children.iter().filter(|el| el.is("p")).count();

    let mut score = text_len as f64 / config.chars_per_point
        + config.points_per_paragraph * paragraphs as f64;

    if is_semantic_container(element) {
        score += config.semantic_bonus;
    }

    let density = link_density(tree, node);
    if density > config.link_density_threshold {
        score *= 1.0 - density;
    }

    if children.len() > config.crowded_child_count
        && (text_len as f64 / children.len() as f64) < config.crowded_min_chars_per_child
    {
        score /= 2.0;
    }

    Some(Candidate {
        node,
        score,
        text_len,
    })
}

/// Score every candidate container below the root, in document order.
pub fn score_candidates(tree: &dyn DocumentTree, config: &ExtractionConfig) -> Vec<Candidate> {
    tree.descendants(tree.root())
        .into_iter()
        .filter_map(|id| score_node(tree, id, config))
        .inspect(|c| {
            trace!(node = c.node.0, score = c.score, text_len = c.text_len, "Scored candidate");
        })
        .collect()
}

/// Highest-scoring candidate that clears both minimums.
///
/// Ties go to the earlier node in document order.
pub fn best_candidate(candidates: &[Candidate], config: &ExtractionConfig) -> Option<Candidate> {
    candidates
        .iter()
        .filter(|c| {
            c.score >= config.min_candidate_score && c.text_len >= config.min_candidate_text_length
        })
        .fold(None, |best: Option<Candidate>, c| match best {
            Some(b) if b.score >= c.score => Some(b),
            _ => Some(*c),
        })
}
