//! Non-content node detection.

use super::config::ExtractionConfig;
use crate::dom::{DocumentTree, Element, MemoryDocument, NodeId};

/// Whether an element is page chrome that never holds article text.
pub fn is_non_content(element: &Element, config: &ExtractionConfig) -> bool {
    if config.deny_tags.iter().any(|tag| element.is(tag)) {
        return true;
    }
    if element.attr("hidden").is_some()
        || element
            .attr("aria-hidden")
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    {
        return true;
    }
    if element.attr("role").is_some_and(|role| {
        config
            .deny_roles
            .iter()
            .any(|denied| role.eq_ignore_ascii_case(denied))
    }) {
        return true;
    }
    has_marker(element, &config.deny_markers)
}

/// Whether any class/id token matches one of `markers`.
///
/// A token matches when it equals the marker, or when the marker is at
/// least four characters and the token contains it (`sidebar-left` matches
/// `sidebar`, but `head` does not match `ad`).
pub fn has_marker(element: &Element, markers: &[String]) -> bool {
    element.name_tokens().iter().any(|token| {
        markers
            .iter()
            .any(|marker| token == marker || (marker.len() >= 4 && token.contains(marker.as_str())))
    })
}

/// Detach every non-content subtree of a working copy. Returns the count.
pub fn strip_non_content(doc: &mut MemoryDocument, config: &ExtractionConfig) -> usize {
    let doomed: Vec<NodeId> = doc
        .descendants(doc.root())
        .into_iter()
        .filter(|&id| {
            doc.element(id)
                .is_some_and(|element| is_non_content(element, config))
        })
        .collect();

    // Ancestors come first in pre-order, so a nested match is detached from
    // an already-detached subtree, which is harmless.
    for &id in &doomed {
        doc.detach(id);
    }
    doomed.len()
}
