//! Rendered page surface
//!
//! An arena of rendered nodes as produced by the PDF renderer's text layer.
//! Nodes are addressed by index instead of by reference, so that a fresh
//! render simply produces a fresh arena and nothing outlives it.
//!
//! The arena is built in document order: every node is pushed after its
//! parent, and a node's descendants occupy a contiguous index range directly
//! after it.

use serde::{Deserialize, Serialize};

/// Index of a node in a [`RenderTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &Rect) -> Rect {
        let min_x = self.x.min(other.x);
        let min_y = self.y.min(other.y);
        let max_x = (self.x + self.width).max(other.x + other.width);
        let max_y = (self.y + self.height).max(other.y + other.height);

        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Express this rectangle in the coordinate space of `origin`
    pub fn relative_to(&self, origin: &Rect) -> Rect {
        Rect::new(self.x - origin.x, self.y - origin.y, self.width, self.height)
    }
}

/// What a rendered node is
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Structural element; `page_content` marks a page's content region
    Element { tag: String, page_content: bool },
    /// Text-bearing leaf
    Text { content: String },
}

/// A single rendered node
#[derive(Debug, Clone)]
pub struct RenderNode {
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    /// Position in viewport coordinates
    pub rect: Rect,
}

/// One end of a selection. `offset` counts characters into a text node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionPoint {
    pub node: NodeId,
    pub offset: usize,
}

/// A live selection over a [`RenderTree`]
///
/// `anchor` is where the user started and `focus` where they stopped, so the
/// selection may run backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: SelectionPoint,
    pub focus: SelectionPoint,
}

impl Selection {
    pub fn new(anchor: SelectionPoint, focus: SelectionPoint) -> Self {
        Self { anchor, focus }
    }

    /// Selection within a single text node
    pub fn within(node: NodeId, start: usize, end: usize) -> Self {
        Self::new(
            SelectionPoint {
                node,
                offset: start,
            },
            SelectionPoint { node, offset: end },
        )
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// The two ends in document order
    pub fn ordered(&self) -> (SelectionPoint, SelectionPoint) {
        let a = (self.anchor.node, self.anchor.offset);
        let f = (self.focus.node, self.focus.offset);
        if a <= f {
            (self.anchor, self.focus)
        } else {
            (self.focus, self.anchor)
        }
    }
}

/// Arena of rendered nodes in document order
#[derive(Debug, Clone, Default)]
pub struct RenderTree {
    nodes: Vec<RenderNode>,
}

impl RenderTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, parent: Option<NodeId>, kind: NodeKind, rect: Rect) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(RenderNode { parent, kind, rect });
        id
    }

    /// Append a structural element
    pub fn push_element(&mut self, parent: Option<NodeId>, tag: &str, rect: Rect) -> NodeId {
        self.push(
            parent,
            NodeKind::Element {
                tag: tag.to_string(),
                page_content: false,
            },
            rect,
        )
    }

    /// Append an element tagged as a page's content region
    pub fn push_page(&mut self, parent: Option<NodeId>, rect: Rect) -> NodeId {
        self.push(
            parent,
            NodeKind::Element {
                tag: "div".to_string(),
                page_content: true,
            },
            rect,
        )
    }

    /// Append a text leaf
    pub fn push_text(&mut self, parent: NodeId, content: &str, rect: Rect) -> NodeId {
        self.push(
            Some(parent),
            NodeKind::Text {
                content: content.to_string(),
            },
            rect,
        )
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&RenderNode> {
        self.nodes.get(id.0)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Text content of a text node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.kind {
            NodeKind::Text { content } => Some(content.as_str()),
            NodeKind::Element { .. } => None,
        }
    }

    /// The node itself followed by its ancestors, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let start = self.node(id).map(|_| id);
        std::iter::successors(start, move |current| self.parent(*current))
    }

    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// Deepest node containing both `a` and `b`
    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        self.ancestors(a).find(|candidate| self.is_inclusive_ancestor(*candidate, b))
    }

    /// Nearest ancestor-or-self tagged as page content
    pub fn page_container(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id).find(|candidate| {
            matches!(
                self.node(*candidate).map(|n| &n.kind),
                Some(NodeKind::Element {
                    page_content: true,
                    ..
                })
            )
        })
    }

    /// Text leaves under `container`, in document order
    pub fn text_nodes_in(&self, container: NodeId) -> Vec<NodeId> {
        (container.0..self.nodes.len())
            .map(NodeId)
            .skip(1)
            .take_while(|id| self.is_inclusive_ancestor(container, *id))
            .filter(|id| self.text(*id).is_some())
            .collect()
    }

    /// Text leaves touched by a selection, in document order
    pub(crate) fn text_nodes_between(&self, start: NodeId, end: NodeId) -> Vec<NodeId> {
        (start.0..=end.0)
            .map(NodeId)
            .filter(|id| self.text(*id).is_some())
            .collect()
    }

    /// Untrimmed text covered by a selection
    ///
    /// Returns `None` if either end is not a text node of this tree.
    pub fn selected_text(&self, selection: &Selection) -> Option<String> {
        let (start, end) = selection.ordered();
        self.text(start.node)?;
        self.text(end.node)?;

        let mut out = String::new();
        for id in self.text_nodes_between(start.node, end.node) {
            let content = self.text(id)?;
            let from = if id == start.node { start.offset } else { 0 };
            let to = if id == end.node {
                end.offset
            } else {
                usize::MAX
            };
            out.extend(content.chars().skip(from).take(to.saturating_sub(from)));
        }
        Some(out)
    }
}
