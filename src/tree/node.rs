use crate::tree::selection::Selection;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier the tree widget assigns to each node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// UI expansion state of a single node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionState {
    #[default]
    Collapsed,
    Expanding,
    Expanded,
}

/// Events that move a node between expansion states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionEvent {
    /// An expand request was sent to the widget
    Requested,
    /// The widget finished expanding (children are readable)
    Settled,
    /// The widget rejected the expand request
    Rejected,
}

impl ExpansionState {
    /// Single transition function for node expansion.
    ///
    /// Models the widget side: a [`LiveTree`](crate::tree::LiveTree)
    /// implementation moves its nodes through it as requests arrive and settle.
    /// The expansion controller never writes states; it re-reads them from the
    /// widget and expands every node that has not reached `Expanded`.
    ///
    /// `Expanded` is absorbing: expansion never collapses a node.
    pub fn on(self, event: ExpansionEvent) -> Self {
        match (self, event) {
            (ExpansionState::Collapsed, ExpansionEvent::Requested) => ExpansionState::Expanding,
            (ExpansionState::Expanding, ExpansionEvent::Settled) => ExpansionState::Expanded,
            (ExpansionState::Expanding, ExpansionEvent::Rejected) => ExpansionState::Collapsed,
            (state, _) => state,
        }
    }

    pub fn is_expanded(self) -> bool {
        self == ExpansionState::Expanded
    }
}

/// Record attached to a leaf naming the legal corpus and identifier it cites
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(rename = "Source", default)]
    pub source: String,

    #[serde(rename = "ID", default)]
    pub id: String,
}

impl NodeData {
    pub fn new(source: impl Into<String>, id: impl Into<String>) -> Self {
        Self { source: source.into(), id: id.into() }
    }
}

/// A node of the tree widget as captured in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Widget key
    pub key: NodeKey,

    /// Display label
    #[serde(default)]
    pub title: String,

    /// Current expansion state
    #[serde(default)]
    pub state: ExpansionState,

    /// Children still have to be fetched by expanding this node
    #[serde(default)]
    pub lazy: bool,

    /// Citation record, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<NodeData>,

    /// Child nodes; `None` when absent or not yet loaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

/// Key of the synthetic container node that holds the top-level nodes
pub const ROOT_KEY: &str = "root_1";

impl TreeNode {
    /// Create a collapsed, childless node
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: NodeKey::new(key),
            title: title.into(),
            state: ExpansionState::Collapsed,
            lazy: false,
            data: None,
            children: None,
        }
    }

    /// Create the invisible container node holding `children` as top-level nodes
    pub fn root(children: Vec<TreeNode>) -> Self {
        Self {
            state: ExpansionState::Expanded,
            children: Some(children),
            ..Self::new(ROOT_KEY, "")
        }
    }

    /// Builder method: set children
    pub fn with_children(mut self, children: Vec<TreeNode>) -> Self {
        self.children = Some(children);
        self
    }

    /// Builder method: mark as lazy (children fetched on expansion)
    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    /// Builder method: attach a citation record
    pub fn with_data(mut self, source: impl Into<String>, id: impl Into<String>) -> Self {
        self.data = Some(NodeData::new(source, id));
        self
    }

    /// Builder method: set expansion state
    pub fn with_state(mut self, state: ExpansionState) -> Self {
        self.state = state;
        self
    }

    /// Child nodes as a slice (empty when absent)
    pub fn children(&self) -> &[TreeNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn has_children(&self) -> bool {
        !self.children().is_empty()
    }

    /// Leaf for flattening purposes: no children, regardless of `lazy`
    pub fn is_leaf(&self) -> bool {
        !self.has_children()
    }

    /// Number of levels on the longest path from this node down to a leaf (a leaf counts 1)
    pub fn max_leaf_depth(&self) -> usize {
        1 + self.children().iter().map(TreeNode::max_leaf_depth).max().unwrap_or(0)
    }

    /// Count this node and all of its descendants
    pub fn count_nodes(&self) -> usize {
        1 + self.children().iter().map(TreeNode::count_nodes).sum::<usize>()
    }

    /// Descendants whose trimmed title is selected, in pre-order.
    ///
    /// The node itself is never a candidate (it plays the role of the widget's
    /// invisible root), but a match nested under another match is reported too.
    pub fn matching<'a>(&'a self, selection: &Selection) -> Vec<&'a TreeNode> {
        let mut found = Vec::new();
        for child in self.children() {
            child.collect_matching(selection, &mut found);
        }
        found
    }

    fn collect_matching<'a>(&'a self, selection: &Selection, found: &mut Vec<&'a TreeNode>) {
        if selection.matches(&self.title) {
            found.push(self);
        }
        for child in self.children() {
            child.collect_matching(selection, found);
        }
    }

    /// Find a node by key in this subtree
    pub fn find(&self, key: &NodeKey) -> Option<&TreeNode> {
        if &self.key == key {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find(key))
    }

    /// Find a node by key in this subtree, mutably
    pub fn find_mut(&mut self, key: &NodeKey) -> Option<&mut TreeNode> {
        if &self.key == key {
            return Some(self);
        }
        self.children.as_mut()?.iter_mut().find_map(|c| c.find_mut(key))
    }

    /// Shallow view of this node
    pub fn view(&self) -> NodeView {
        NodeView {
            key: self.key.clone(),
            title: self.title.clone(),
            state: self.state,
            lazy: self.lazy,
            children: self
                .children
                .as_ref()
                .map(|children| children.iter().map(|c| c.key.clone()).collect()),
        }
    }
}

/// Shallow, freshly-read view of one live node: its state and its children's keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    pub key: NodeKey,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub state: ExpansionState,

    #[serde(default)]
    pub lazy: bool,

    #[serde(default)]
    pub children: Option<Vec<NodeKey>>,
}

impl NodeView {
    pub fn has_children(&self) -> bool {
        self.children.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// A node that is not yet expanded (collapsed, or still loading) is
    /// expanded when it has children or may lazily load some
    pub fn needs_expansion(&self) -> bool {
        !self.state.is_expanded() && (self.has_children() || self.lazy)
    }

    /// Child keys in declared order
    pub fn child_keys(&self) -> &[NodeKey] {
        self.children.as_deref().unwrap_or(&[])
    }
}
