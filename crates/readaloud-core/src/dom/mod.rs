//! Read-only document tree abstraction.
//!
//! The extractor and click resolver never touch a live page directly. They
//! work against [`DocumentTree`], a small traversal + geometry interface that
//! a browser adapter implements over the real DOM and that tests implement
//! with [`MemoryDocument`].
//!
//! # Design Rules
//!
//! - Implementations are read-only from the core's point of view.
//! - Node removal only ever happens on a detached [`MemoryDocument`] copy.
//! - Caret offsets are UTF-8 byte offsets into a text node's content.

mod markup;
mod memory;

use serde::{Deserialize, Serialize};

pub use memory::MemoryDocument;

/// Opaque handle to a node inside one [`DocumentTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

/// Axis-aligned rectangle in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a rectangle from origin and size.
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the point lies inside (edges inclusive).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// An element node: lower-case tag name plus attributes in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
}

impl Element {
    /// Create an element; the tag is lower-cased.
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        }
    }

    /// Builder-style attribute setter; names are lower-cased.
    #[must_use]
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes
            .push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    /// Look up an attribute value by (lower-case) name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whether the element carries the given tag.
    pub fn is(&self, tag: &str) -> bool {
        self.tag == tag
    }

    /// Lower-cased tokens of the `class` and `id` attributes, split on any
    /// non-alphanumeric character (`"post-body main"` → `post`, `body`, `main`).
    pub fn name_tokens(&self) -> Vec<String> {
        ["class", "id"]
            .iter()
            .filter_map(|name| self.attr(name))
            .flat_map(|value| value.split(|c: char| !c.is_ascii_alphanumeric()))
            .filter(|token| !token.is_empty())
            .map(str::to_ascii_lowercase)
            .collect()
    }
}

/// What a node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document root.
    Document,
    /// An element.
    Element(Element),
    /// A text node.
    Text(String),
}

/// A caret location: a text node plus a byte offset into its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaretPosition {
    pub node: NodeId,
    pub offset: usize,
}

/// Traversable, queryable text tree.
///
/// Required methods mirror what a browser exposes: structure, node kind,
/// bounding rectangles and caret-from-point hit testing. Text and traversal
/// helpers are provided on top of those.
pub trait DocumentTree: Send + Sync {
    /// The document root node.
    fn root(&self) -> NodeId;

    /// Kind of `node`, or `None` for an unknown handle.
    fn kind(&self, node: NodeId) -> Option<&NodeKind>;

    /// Parent of `node` (`None` for the root or a detached node).
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Children of `node` in document order.
    fn children(&self, node: NodeId) -> &[NodeId];

    /// Bounding rectangle of `node`, if it is rendered.
    fn bounds(&self, node: NodeId) -> Option<Rect>;

    /// Hit-test a point to a caret position inside a text node.
    fn caret_from_point(&self, x: f64, y: f64) -> Option<CaretPosition>;

    /// The document's `<title>`, if any.
    fn document_title(&self) -> Option<&str>;

    /// The element behind `node`, if it is one.
    fn element(&self, node: NodeId) -> Option<&Element> {
        match self.kind(node) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    /// The text behind `node`, if it is a text node.
    fn text(&self, node: NodeId) -> Option<&str> {
        match self.kind(node) {
            Some(NodeKind::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// All nodes below `node` (excluding it) in pre-order.
    fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Concatenated content of every text node below (or at) `node`.
    fn text_content(&self, node: NodeId) -> String {
        if let Some(text) = self.text(node) {
            return text.to_string();
        }
        self.descendants(node)
            .into_iter()
            .filter_map(|id| self.text(id))
            .collect()
    }

    /// Ancestors of `node`, nearest first.
    fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(node);
        while let Some(id) = current {
            out.push(id);
            current = self.parent(id);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_contains_edges() {
        let rect = Rect::new(10.0, 10.0, 100.0, 20.0);
        assert!(rect.contains(10.0, 10.0));
        assert!(rect.contains(110.0, 30.0));
        assert!(!rect.contains(9.9, 15.0));
        assert!(!rect.contains(50.0, 31.0));
    }

    #[test]
    fn element_name_tokens_split_class_and_id() {
        let element = Element::new("DIV")
            .with_attr("class", "post-body Main")
            .with_attr("id", "story_1");
        assert_eq!(element.tag, "div");
        assert_eq!(element.name_tokens(), vec!["post", "body", "main", "story", "1"]);
    }
}
