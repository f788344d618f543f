//! Expansion of the selected subtrees of a live tree widget
//!
//! Every node on the way from a matched root down to its leaves is expanded,
//! lazily-loaded nodes included. Expansion is monotonic (nodes are never
//! collapsed), so an interrupted run leaves the widget in a consistent,
//! partially expanded state that a later run simply continues.
//!
//! Siblings can be expanded one at a time or in concurrent batches. The
//! batched strategy lets several expand requests run against the widget at
//! once; whether a widget can race between materialising a batch member's
//! children and another member's read of its own children is not something
//! this module can rule out, so batching should only be used against widgets
//! that tolerate concurrent expand calls.

use crate::error::{HarvestError, Result};
use crate::tree::{LiveTree, NodeKey, Selection};
use futures::future::{BoxFuture, try_join_all};
use std::time::Duration;

/// Default number of siblings expanded concurrently
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Default delay after an expand request before a node's children are read
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// How the children of a node are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandStrategy {
    /// One child at a time, in declared order
    Sequential,
    /// Fixed-size batches of siblings expanded concurrently; the next batch
    /// starts once the whole batch has settled
    Batched(usize),
}

impl ExpandStrategy {
    /// Build a strategy from a batch size, treating 0 and 1 as sequential
    pub fn from_batch_size(size: usize) -> Self {
        if size <= 1 { ExpandStrategy::Sequential } else { ExpandStrategy::Batched(size) }
    }
}

impl Default for ExpandStrategy {
    fn default() -> Self {
        ExpandStrategy::Batched(DEFAULT_BATCH_SIZE)
    }
}

/// Options for [`expand_selected`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Scheduling of sibling expansions
    pub strategy: ExpandStrategy,

    /// Wait after each expand request; zero disables the wait
    pub settle_delay: Duration,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self { strategy: ExpandStrategy::default(), settle_delay: DEFAULT_SETTLE_DELAY }
    }
}

impl ExpandOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set strategy
    pub fn strategy(mut self, strategy: ExpandStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Builder method: set settle delay
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }
}

/// Expand every subtree whose root title is selected.
///
/// Returns the number of matched roots; zero is a valid result when the tree
/// exists but nothing matched. A missing widget fails with `TreeUnavailable`.
/// Individual expand requests that the widget rejects are skipped over and the
/// walk continues into that node's children. Nodes (matched roots included)
/// that disappear from the widget mid-walk are skipped.
pub async fn expand_selected<T>(tree: &T, selection: &Selection, options: &ExpandOptions) -> Result<usize>
where
    T: LiveTree + ?Sized,
{
    log::info!("Expanding folders: {}...", selection.display());

    let snapshot = tree.snapshot().await?;
    let roots: Vec<NodeKey> = snapshot.matching(selection).into_iter().map(|node| node.key.clone()).collect();

    if roots.is_empty() {
        log::warn!("No tree nodes matched the selection ({})", selection.display());
        return Ok(0);
    }

    let expander = Expander { tree, options };
    for key in &roots {
        expander.expand_child(key.clone()).await?;
    }

    log::info!("Expanded {} root folder(s).", roots.len());
    Ok(roots.len())
}

struct Expander<'a, T: ?Sized> {
    tree: &'a T,
    options: &'a ExpandOptions,
}

impl<'a, T> Expander<'a, T>
where
    T: LiveTree + ?Sized,
{
    fn expand(&self, key: NodeKey) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut view = self.tree.node(&key).await?;

            if view.needs_expansion() {
                log::debug!("Expanding node {} ({})", key, view.title.trim());
                if let Err(e) = self.tree.set_expanded(&key).await {
                    if e.is_tree_unavailable() {
                        return Err(e);
                    }
                    log::debug!("Ignoring expand failure on {}: {}", key, e);
                }
                if !self.options.settle_delay.is_zero() {
                    tokio::time::sleep(self.options.settle_delay).await;
                }
                view = self.tree.node(&key).await?;
            }

            let children = view.children.unwrap_or_default();
            match self.options.strategy {
                ExpandStrategy::Sequential => {
                    for child in children {
                        self.expand_child(child).await?;
                    }
                }
                ExpandStrategy::Batched(size) => {
                    for batch in children.chunks(size.max(1)) {
                        try_join_all(batch.iter().cloned().map(|child| self.expand_child(child))).await?;
                    }
                }
            }

            Ok(())
        })
    }

    /// Expand a node, skipping it if it disappeared from the widget
    async fn expand_child(&self, key: NodeKey) -> Result<()> {
        match self.expand(key.clone()).await {
            Err(HarvestError::NodeNotFound(_)) => {
                log::debug!("Node {} vanished during expansion", key);
                Ok(())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{ExpansionState, MemoryTree, NodeView, TreeNode};
    use async_trait::async_trait;

    fn fast(strategy: ExpandStrategy) -> ExpandOptions {
        ExpandOptions::new().strategy(strategy).settle_delay(Duration::ZERO)
    }

    /// Title I is lazy two levels deep; Title II is already loaded but collapsed
    fn erisa_tree() -> MemoryTree {
        MemoryTree::new(TreeNode::root(vec![
            TreeNode::new("t1", "Title I").with_lazy(true),
            TreeNode::new("t2", "Title II").with_children(vec![TreeNode::new("s1001", "Sec. 1001")]),
            TreeNode::new("t4", "Title IV").with_lazy(true),
        ]))
        .with_lazy_children("t1", vec![TreeNode::new("p1", "Part 1").with_lazy(true), TreeNode::new("p2", "Part 2")])
        .with_lazy_children("p1", vec![TreeNode::new("s101", "Sec. 101"), TreeNode::new("s102", "Sec. 102")])
    }

    fn assert_fully_expanded(node: &TreeNode) {
        assert!(!node.lazy, "node {} still lazy", node.key);
        if node.has_children() {
            assert_eq!(node.state, ExpansionState::Expanded, "node {} not expanded", node.key);
        }
        node.children().iter().for_each(assert_fully_expanded);
    }

    #[test]
    fn test_strategy_from_batch_size() {
        assert_eq!(ExpandStrategy::from_batch_size(0), ExpandStrategy::Sequential);
        assert_eq!(ExpandStrategy::from_batch_size(1), ExpandStrategy::Sequential);
        assert_eq!(ExpandStrategy::from_batch_size(5), ExpandStrategy::Batched(5));
        assert_eq!(ExpandStrategy::default(), ExpandStrategy::Batched(DEFAULT_BATCH_SIZE));
    }

    #[test]
    fn test_default_options() {
        let options = ExpandOptions::default();
        assert_eq!(options.settle_delay, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_expands_matched_subtrees_only() {
        let tree = erisa_tree();
        let count = expand_selected(&tree, &Selection::from_iter(["Title I", "Title II"]), &fast(ExpandStrategy::Sequential))
            .await
            .unwrap();
        assert_eq!(count, 2);

        let snapshot = tree.snapshot().await.unwrap();
        assert_fully_expanded(snapshot.find(&"t1".into()).unwrap());
        assert_fully_expanded(snapshot.find(&"t2".into()).unwrap());

        let untouched = snapshot.find(&"t4".into()).unwrap();
        assert!(untouched.lazy);
        assert_eq!(untouched.state, ExpansionState::Collapsed);
    }

    #[tokio::test]
    async fn test_batched_expansion_reaches_every_node() {
        let tree = erisa_tree();
        let count = expand_selected(&tree, &Selection::from_iter(["Title I"]), &fast(ExpandStrategy::Batched(5)))
            .await
            .unwrap();
        assert_eq!(count, 1);

        let snapshot = tree.snapshot().await.unwrap();
        let title = snapshot.find(&"t1".into()).unwrap();
        assert_fully_expanded(title);
        assert_eq!(title.max_leaf_depth(), 3);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let tree = erisa_tree();
        let selection = Selection::from_iter(["Title I", "Title II"]);
        let options = fast(ExpandStrategy::Batched(5));

        let first = expand_selected(&tree, &selection, &options).await.unwrap();
        let calls = tree.stats().calls;
        let before = tree.snapshot().await.unwrap();

        let second = expand_selected(&tree, &selection, &options).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(tree.stats().calls, calls);
        assert_eq!(tree.snapshot().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_rejected_node_still_walks_children() {
        let tree = MemoryTree::new(TreeNode::root(vec![TreeNode::new("t1", "Title I").with_children(vec![
            TreeNode::new("p1", "Part 1").with_lazy(true),
        ])]))
        .with_lazy_children("p1", vec![TreeNode::new("s101", "Sec. 101")])
        .with_rejection("t1");

        let count = expand_selected(&tree, &Selection::from_iter(["Title I"]), &fast(ExpandStrategy::Sequential))
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(tree.stats().rejected, 1);

        let snapshot = tree.snapshot().await.unwrap();
        assert_eq!(snapshot.find(&"t1".into()).unwrap().state, ExpansionState::Collapsed);
        let part = snapshot.find(&"p1".into()).unwrap();
        assert_eq!(part.state, ExpansionState::Expanded);
        assert_eq!(part.children().len(), 1);
    }

    #[tokio::test]
    async fn test_no_match_is_not_an_error() {
        let tree = erisa_tree();
        let count = expand_selected(&tree, &Selection::from_iter(["Title IX"]), &fast(ExpandStrategy::default()))
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(tree.stats().calls, 0);
    }

    #[tokio::test]
    async fn test_missing_tree_is_unavailable() {
        let tree = MemoryTree::detached();
        let err = expand_selected(&tree, &Selection::from_iter(["Title I"]), &fast(ExpandStrategy::default()))
            .await
            .unwrap_err();
        assert!(err.is_tree_unavailable());
    }

    #[tokio::test]
    async fn test_loading_node_is_still_expanded() {
        let tree = MemoryTree::new(TreeNode::root(vec![TreeNode::new("t1", "Title I").with_children(vec![
            TreeNode::new("p1", "Part 1").with_lazy(true).with_state(ExpansionState::Expanding),
        ])]))
        .with_lazy_children("p1", vec![TreeNode::new("s101", "Sec. 101")]);

        expand_selected(&tree, &Selection::from_iter(["Title I"]), &fast(ExpandStrategy::Sequential))
            .await
            .unwrap();

        let snapshot = tree.snapshot().await.unwrap();
        let part = snapshot.find(&"p1".into()).unwrap();
        assert_fully_expanded(part);
        assert_eq!(part.children().len(), 1);
    }

    /// Lists every node in snapshots but no longer resolves `gone` by key
    struct Vanishing {
        inner: MemoryTree,
        gone: NodeKey,
    }

    #[async_trait]
    impl LiveTree for Vanishing {
        async fn snapshot(&self) -> Result<TreeNode> {
            self.inner.snapshot().await
        }

        async fn node(&self, key: &NodeKey) -> Result<NodeView> {
            if key == &self.gone {
                return Err(HarvestError::NodeNotFound(key.to_string()));
            }
            self.inner.node(key).await
        }

        async fn set_expanded(&self, key: &NodeKey) -> Result<()> {
            self.inner.set_expanded(key).await
        }
    }

    #[tokio::test]
    async fn test_vanished_root_is_skipped() {
        let tree = Vanishing { inner: erisa_tree(), gone: "t1".into() };

        let count = expand_selected(&tree, &Selection::from_iter(["Title I", "Title II"]), &fast(ExpandStrategy::default()))
            .await
            .unwrap();
        assert_eq!(count, 2);

        let snapshot = tree.snapshot().await.unwrap();
        assert_fully_expanded(snapshot.find(&"t2".into()).unwrap());
        assert!(snapshot.find(&"t1".into()).unwrap().lazy);
    }

    fn wide_tree(children: usize) -> MemoryTree {
        let sections = (0..children).map(|i| TreeNode::new(format!("s{}", i), format!("Sec. {}", i)).with_lazy(true)).collect();
        MemoryTree::new(TreeNode::root(vec![TreeNode::new("p", "Part").with_children(sections)]))
    }

    #[tokio::test]
    async fn test_batches_bound_concurrency() {
        let tree = wide_tree(12);
        expand_selected(&tree, &Selection::from_iter(["Part"]), &fast(ExpandStrategy::Batched(5)))
            .await
            .unwrap();

        let stats = tree.stats();
        assert_eq!(stats.calls, 13);
        assert!(stats.peak_in_flight > 1);
        assert!(stats.peak_in_flight <= 5);
    }

    #[tokio::test]
    async fn test_sequential_expands_one_at_a_time() {
        let tree = wide_tree(12);
        expand_selected(&tree, &Selection::from_iter(["Part"]), &fast(ExpandStrategy::Sequential))
            .await
            .unwrap();

        let stats = tree.stats();
        assert_eq!(stats.calls, 13);
        assert_eq!(stats.peak_in_flight, 1);
    }

    #[tokio::test]
    async fn test_settle_delay_is_awaited() {
        let tree = wide_tree(2);
        let options = ExpandOptions::new().strategy(ExpandStrategy::Sequential).settle_delay(Duration::from_millis(5));

        let started = std::time::Instant::now();
        expand_selected(&tree, &Selection::from_iter(["Part"]), &options).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(15));
    }
}
