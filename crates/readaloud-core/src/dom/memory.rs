//! Arena-backed in-memory [`DocumentTree`].

use super::{CaretPosition, DocumentTree, Element, NodeId, NodeKind, Rect};

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    bounds: Option<Rect>,
}

impl NodeData {
    const fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            bounds: None,
        }
    }
}

/// An owned, mutable document tree.
///
/// Used both as the test double for a live page and as the detached copy the
/// extractor strips non-content nodes from. Detached nodes stay in the arena
/// but are unreachable from the root.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: Vec<NodeData>,
    title: Option<String>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// Create a document holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new(NodeKind::Document, None)],
            title: None,
        }
    }

    /// Copy any tree (structure, kinds, bounds and title) into a new arena.
    ///
    /// Node ids are renumbered; only nodes reachable from the root are copied.
    pub fn snapshot(tree: &dyn DocumentTree) -> Self {
        let mut doc = Self::new();
        doc.title = tree.document_title().map(str::to_string);
        doc.nodes[0].bounds = tree.bounds(tree.root());

        let mut stack: Vec<(NodeId, NodeId)> = tree
            .children(tree.root())
            .iter()
            .rev()
            .map(|&child| (child, doc.root()))
            .collect();

        while let Some((source, parent)) = stack.pop() {
            let Some(kind) = tree.kind(source) else {
                continue;
            };
            let copied = doc.push(kind.clone(), parent);
            doc.nodes[copied.0].bounds = tree.bounds(source);
            stack.extend(
                tree.children(source)
                    .iter()
                    .rev()
                    .map(|&child| (child, copied)),
            );
        }

        doc
    }

    fn push(&mut self, kind: NodeKind, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData::new(kind, Some(parent)));
        if let Some(data) = self.nodes.get_mut(parent.0) {
            data.children.push(id);
        }
        id
    }

    /// Append an element as the last child of `parent`.
    pub fn append_element(&mut self, parent: NodeId, element: Element) -> NodeId {
        self.push(NodeKind::Element(element), parent)
    }

    /// Append a text node as the last child of `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()), parent)
    }

    /// Set the bounding rectangle of `node`.
    pub fn set_bounds(&mut self, node: NodeId, rect: Rect) {
        if let Some(data) = self.nodes.get_mut(node.0) {
            data.bounds = Some(rect);
        }
    }

    /// Set the document title.
    pub fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }

    /// Unlink `node` (and its subtree) from its parent.
    pub fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.nodes.get_mut(node.0).and_then(|data| data.parent.take()) else {
            return;
        };
        if let Some(data) = self.nodes.get_mut(parent.0) {
            data.children.retain(|&child| child != node);
        }
    }

    /// First attached text node (document order) whose content contains `needle`.
    pub fn find_text(&self, needle: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|&id| self.text(id).is_some_and(|text| text.contains(needle)))
    }

    /// Bounds used for hit testing a text node: its own, else its parent's.
    fn hit_bounds(&self, node: NodeId) -> Option<Rect> {
        self.bounds(node)
            .or_else(|| self.parent(node).and_then(|parent| self.bounds(parent)))
    }
}

impl DocumentTree for MemoryDocument {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.nodes.get(node.0).map(|data| &data.kind)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|data| data.parent)
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.0)
            .map_or(&[], |data| data.children.as_slice())
    }

    fn bounds(&self, node: NodeId) -> Option<Rect> {
        self.nodes.get(node.0).and_then(|data| data.bounds)
    }

    /// Picks the last text node in document order whose bounds contain the
    /// point, then maps the x position proportionally onto its characters.
    fn caret_from_point(&self, x: f64, y: f64) -> Option<CaretPosition> {
        let (node, rect) = self
            .descendants(self.root())
            .into_iter()
            .filter(|&id| self.text(id).is_some())
            .filter_map(|id| self.hit_bounds(id).map(|rect| (id, rect)))
            .rev()
            .find(|(_, rect)| rect.contains(x, y))?;

        let text = self.text(node)?;
        let char_count = text.chars().count();
        let fraction = if rect.width > 0.0 {
            ((x - rect.x) / rect.width).clamp(0.0, 1.0)
        } else {
            0.0
        };

        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let char_index = ((fraction * char_count as f64).floor() as usize).min(char_count);

        let offset = text
            .char_indices()
            .nth(char_index)
            .map_or(text.len(), |(idx, _)| idx);

        Some(CaretPosition { node, offset })
    }

    fn document_title(&self) -> Option<&str> {
        self.title.as_deref()
    }
}
