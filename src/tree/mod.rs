//! Tree widget model and live handles
//!
//! This module provides the in-memory representation of the lazily-loaded tree
//! widget and the handle used to drive it:
//! - TreeNode / NodeView: snapshot and shallow per-node views
//! - Selection: the set of root titles to harvest
//! - LiveTree: async handle onto a tree that can be read and expanded
//! - ChromeTree: LiveTree backed by a Fancytree widget in a browser tab
//! - MemoryTree: LiveTree held in memory (tests and saved snapshots)

pub mod chrome;
pub mod memory;
pub mod node;
pub mod selection;

pub use chrome::ChromeTree;
pub use memory::MemoryTree;
pub use node::{ExpansionEvent, ExpansionState, NodeData, NodeKey, NodeView, TreeNode};
pub use selection::Selection;

use crate::error::Result;
use async_trait::async_trait;

/// Handle onto a live, externally mutable tree widget
#[async_trait]
pub trait LiveTree: Send + Sync {
    /// Read the whole tree, starting from the widget's invisible root node.
    ///
    /// Fails with `TreeUnavailable` when the widget cannot be obtained.
    async fn snapshot(&self) -> Result<TreeNode>;

    /// Read a fresh shallow view of one node
    async fn node(&self, key: &NodeKey) -> Result<NodeView>;

    /// Ask the widget to expand a node, resolving once it reports completion.
    ///
    /// May fail with `ExpandFailed` when the widget rejects the request.
    async fn set_expanded(&self, key: &NodeKey) -> Result<()>;
}

