use crate::error::{HarvestError, Result};
use crate::tree::{ExpansionEvent, LiveTree, NodeKey, NodeView, TreeNode};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Counters recorded by a [`MemoryTree`] while it is being expanded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpandStats {
    /// Total `set_expanded` calls received
    pub calls: usize,

    /// Calls that were rejected
    pub rejected: usize,

    /// Expansions currently between request and completion
    pub in_flight: usize,

    /// Highest `in_flight` value observed
    pub peak_in_flight: usize,
}

struct TreeState {
    root: TreeNode,
    /// Children handed out when a lazy node is expanded
    pending: HashMap<NodeKey, Vec<TreeNode>>,
    rejecting: HashSet<NodeKey>,
    stats: ExpandStats,
}

/// A [`LiveTree`] held in memory.
///
/// Used to replay snapshots saved from a browser run and to exercise the
/// expansion controller without Chrome. Expanding a lazy node yields once to
/// the scheduler before its children materialise, like a widget fetching them.
pub struct MemoryTree {
    state: Mutex<Option<TreeState>>,
}

impl MemoryTree {
    /// Wrap a tree whose root is the invisible container node
    pub fn new(root: TreeNode) -> Self {
        Self {
            state: Mutex::new(Some(TreeState {
                root,
                pending: HashMap::new(),
                rejecting: HashSet::new(),
                stats: ExpandStats::default(),
            })),
        }
    }

    /// A handle with no tree behind it; every operation reports `TreeUnavailable`
    pub fn detached() -> Self {
        Self { state: Mutex::new(None) }
    }

    /// Load a snapshot previously written as JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let root: TreeNode =
            serde_json::from_str(json).map_err(|e| HarvestError::TreeParseFailed(format!("Invalid snapshot: {}", e)))?;
        Ok(Self::new(root))
    }

    /// Builder method: children that appear once the lazy node `key` is expanded
    pub fn with_lazy_children(mut self, key: impl Into<NodeKey>, children: Vec<TreeNode>) -> Self {
        if let Some(state) = self.state_mut() {
            state.pending.insert(key.into(), children);
        }
        self
    }

    /// Builder method: make expand requests for `key` fail
    pub fn with_rejection(mut self, key: impl Into<NodeKey>) -> Self {
        if let Some(state) = self.state_mut() {
            state.rejecting.insert(key.into());
        }
        self
    }

    /// Counters recorded so far
    pub fn stats(&self) -> ExpandStats {
        self.lock().as_ref().map(|s| s.stats).unwrap_or_default()
    }

    fn state_mut(&mut self) -> Option<&mut TreeState> {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner).as_mut()
    }

    fn lock(&self) -> MutexGuard<'_, Option<TreeState>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn unavailable() -> HarvestError {
    HarvestError::TreeUnavailable("no tree loaded".to_string())
}

fn not_found(key: &NodeKey) -> HarvestError {
    HarvestError::NodeNotFound(key.to_string())
}

#[async_trait]
impl LiveTree for MemoryTree {
    async fn snapshot(&self) -> Result<TreeNode> {
        let guard = self.lock();
        let state = guard.as_ref().ok_or_else(unavailable)?;
        Ok(state.root.clone())
    }

    async fn node(&self, key: &NodeKey) -> Result<NodeView> {
        let guard = self.lock();
        let state = guard.as_ref().ok_or_else(unavailable)?;
        state.root.find(key).map(TreeNode::view).ok_or_else(|| not_found(key))
    }

    async fn set_expanded(&self, key: &NodeKey) -> Result<()> {
        {
            let mut guard = self.lock();
            let state = guard.as_mut().ok_or_else(unavailable)?;
            state.stats.calls += 1;

            let rejects = state.rejecting.contains(key);
            let node = state.root.find_mut(key).ok_or_else(|| not_found(key))?;
            if node.state.is_expanded() {
                return Ok(());
            }

            node.state = node.state.on(ExpansionEvent::Requested);
            if rejects {
                node.state = node.state.on(ExpansionEvent::Rejected);
                state.stats.rejected += 1;
                return Err(HarvestError::ExpandFailed {
                    key: key.to_string(),
                    reason: "rejected by widget".to_string(),
                });
            }

            state.stats.in_flight += 1;
            state.stats.peak_in_flight = state.stats.peak_in_flight.max(state.stats.in_flight);
        }

        tokio::task::yield_now().await;

        let mut guard = self.lock();
        let state = guard.as_mut().ok_or_else(unavailable)?;
        state.stats.in_flight = state.stats.in_flight.saturating_sub(1);

        let loaded = state.pending.remove(key);
        let node = state.root.find_mut(key).ok_or_else(|| not_found(key))?;
        if node.lazy {
            if node.children.is_none() {
                node.children = Some(loaded.unwrap_or_default());
            }
            node.lazy = false;
        }
        node.state = node.state.on(ExpansionEvent::Settled);

        Ok(())
    }
}
