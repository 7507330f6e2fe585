//! Feature tree model shown in the right-hand panel.
//!
//! Nodes live in an arena and refer to each other by index. A tree is never
//! patched: switching part, tree type or fold state builds a new one.

use std::collections::BTreeSet;

use serde::Serialize;
use shared::{Rgb, ShapeId};

/// Index of a node inside its [`FeatureTree`].
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Tree root labelled with the part name
    Part,
    Group,
    SubGroup,
    Feature,
    /// Sheet-metal unfolded parameter
    Parameter,
    /// Error or informational message replacing the whole tree
    Message,
}

impl NodeKind {
    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Part | NodeKind::Group | NodeKind::SubGroup)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub kind: NodeKind,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swatch: Option<Rgb>,
    /// Shapes realised by this node; only feature leaves carry them.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shape_ids: Vec<ShapeId>,
    pub open: bool,
    pub hidden: bool,
    pub highlighted: bool,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl TreeNode {
    pub fn new(kind: NodeKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            swatch: None,
            shape_ids: Vec::new(),
            open: false,
            hidden: false,
            highlighted: false,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_open(mut self, open: bool) -> Self {
        self.open = open;
        self
    }

    pub fn with_swatch(mut self, swatch: Option<Rgb>) -> Self {
        self.swatch = swatch;
        self
    }

    /// Tag the node with shape IDs. Duplicates are dropped, order is kept.
    pub fn with_shape_ids(mut self, ids: impl IntoIterator<Item = ShapeId>) -> Self {
        for id in ids {
            if !self.shape_ids.contains(&id) {
                self.shape_ids.push(id);
            }
        }
        self
    }

    pub fn is_tagged_with(&self, id: ShapeId) -> bool {
        self.shape_ids.contains(&id)
    }

    /// Space-separated tag as written into the `data-shape-id` attribute.
    pub fn shape_tag(&self) -> Option<String> {
        if self.shape_ids.is_empty() {
            return None;
        }
        let tokens: Vec<String> = self.shape_ids.iter().map(|id| id.to_string()).collect();
        Some(tokens.join(" "))
    }
}

/// Parse a `data-shape-id` tag back into a set of IDs. Bad tokens are skipped.
pub fn parse_shape_tag(tag: &str) -> BTreeSet<ShapeId> {
    tag.split_whitespace().filter_map(|t| t.parse().ok()).collect()
}

/// Where the tree panel should scroll to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollTarget {
    pub node: NodeId,
    /// Visible rows above the node, counted from the tree root.
    pub offset: usize,
    pub smooth: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureTree {
    nodes: Vec<TreeNode>,
}

impl FeatureTree {
    /// A tree with a single root node.
    pub fn new(root: TreeNode) -> Self {
        Self { nodes: vec![root] }
    }

    /// A tree that only shows a message instead of features.
    pub fn message(text: impl Into<String>) -> Self {
        Self::new(TreeNode::new(NodeKind::Message, text))
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn is_message(&self) -> bool {
        self.nodes[0].kind == NodeKind::Message
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    /// Append `node` as the last child of `parent`.
    pub fn push(&mut self, parent: NodeId, mut node: TreeNode) -> NodeId {
        let id = self.nodes.len();
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent].children.push(id);
        id
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// All node IDs in document order.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }
        out
    }

    /// Every node tagged with `id`, in document order.
    pub fn nodes_tagged_with(&self, id: ShapeId) -> Vec<NodeId> {
        self.preorder()
            .into_iter()
            .filter(|&n| self.nodes[n].is_tagged_with(id))
            .collect()
    }

    /// Direct children of the root that represent feature groups.
    pub fn groups(&self) -> Vec<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .filter(|&n| self.nodes[n].kind == NodeKind::Group)
            .collect()
    }

    pub fn highlighted(&self) -> Vec<NodeId> {
        self.preorder()
            .into_iter()
            .filter(|&n| self.nodes[n].highlighted)
            .collect()
    }

    pub fn clear_highlights(&mut self) {
        for node in &mut self.nodes {
            node.highlighted = false;
        }
    }

    pub fn highlight(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.highlighted = true;
        }
    }

    /// Open every collapsible ancestor of `id` up to the root.
    pub fn expand_ancestors(&mut self, id: NodeId) {
        let mut current = self.nodes.get(id).and_then(|n| n.parent);
        while let Some(p) = current {
            let node = &mut self.nodes[p];
            if !node.kind.is_container() {
                break;
            }
            node.open = true;
            current = node.parent;
        }
    }

    /// Hide every group except the one labelled `name`; `None` shows all.
    pub fn show_only_group(&mut self, name: Option<&str>) {
        for id in self.groups() {
            let node = &mut self.nodes[id];
            node.hidden = match name {
                Some(name) => node.label.trim() != name.trim(),
                None => false,
            };
        }
    }

    /// True if neither the node nor an ancestor is hidden and all ancestors are open.
    pub fn is_visible(&self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        if node.hidden {
            return false;
        }
        let mut current = node.parent;
        while let Some(p) = current {
            let parent = &self.nodes[p];
            if parent.hidden || !parent.open {
                return false;
            }
            current = parent.parent;
        }
        true
    }

    /// Number of visible rows above `id`, or `None` if `id` itself is not visible.
    pub fn row_offset(&self, id: NodeId) -> Option<usize> {
        if !self.is_visible(id) {
            return None;
        }
        let rows_before = self
            .preorder()
            .into_iter()
            .take_while(|&n| n != id)
            .filter(|&n| self.is_visible(n))
            .count();
        Some(rows_before)
    }

    pub fn scroll_target(&self, id: NodeId) -> Option<ScrollTarget> {
        self.row_offset(id).map(|offset| ScrollTarget {
            node: id,
            offset,
            smooth: true,
        })
    }
}
