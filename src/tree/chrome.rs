use crate::error::{HarvestError, Result};
use crate::tree::{LiveTree, NodeKey, NodeView, TreeNode};
use async_trait::async_trait;
use headless_chrome::Tab;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// CSS selector of the tree widget on the ERISApedia pages
pub const DEFAULT_TREE_SELECTOR: &str = "#tree";

const SNAPSHOT_JS: &str = include_str!("js/snapshot_tree.js");
const READ_NODE_JS: &str = include_str!("js/read_node.js");
const EXPAND_NODE_JS: &str = include_str!("js/expand_node.js");
const TREE_READY_JS: &str = include_str!("js/tree_ready.js");

/// Reply of the node-reading script
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum NodeReply {
    Ok { node: NodeView },
    NoTree,
    NoNode,
}

/// Reply of the node-expanding script
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum ExpandReply {
    Ok,
    Rejected { error: String },
    NoTree,
    NoNode,
}

/// [`LiveTree`] backed by a jQuery Fancytree widget in a browser tab.
///
/// Every operation evaluates a bundled script in the page on tokio's blocking
/// pool, since headless_chrome calls block on the DevTools connection.
#[derive(Clone)]
pub struct ChromeTree {
    tab: Arc<Tab>,
    selector: String,
}

impl ChromeTree {
    /// Attach to the widget matching `selector` in `tab`
    pub fn new(tab: Arc<Tab>, selector: impl Into<String>) -> Self {
        Self { tab, selector: selector.into() }
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    fn script(&self, template: &str, key: Option<&NodeKey>) -> String {
        render_script(template, &self.selector, key)
    }

    fn unavailable(&self) -> HarvestError {
        HarvestError::TreeUnavailable(format!("no Fancytree instance at '{}'", self.selector))
    }

    /// Evaluate a script that returns a JSON string (or null)
    async fn evaluate(&self, script: String, await_promise: bool) -> Result<Option<String>> {
        let tab = Arc::clone(&self.tab);
        let remote = tokio::task::spawn_blocking(move || tab.evaluate(&script, await_promise))
            .await
            .map_err(|e| HarvestError::EvaluationFailed(format!("Evaluation task failed: {}", e)))?
            .map_err(|e| HarvestError::EvaluationFailed(e.to_string()))?;

        Ok(remote.value.and_then(|value| value.as_str().map(str::to_string)))
    }

    async fn evaluate_json<T: DeserializeOwned>(&self, script: String, await_promise: bool) -> Result<T> {
        let json = self
            .evaluate(script, await_promise)
            .await?
            .ok_or_else(|| HarvestError::TreeParseFailed("No value returned from tree script".to_string()))?;

        serde_json::from_str(&json).map_err(|e| HarvestError::TreeParseFailed(format!("Failed to parse reply: {}", e)))
    }
}

#[async_trait]
impl LiveTree for ChromeTree {
    async fn snapshot(&self) -> Result<TreeNode> {
        let json = self
            .evaluate(self.script(SNAPSHOT_JS, None), false)
            .await?
            .ok_or_else(|| self.unavailable())?;

        serde_json::from_str(&json).map_err(|e| HarvestError::TreeParseFailed(format!("Failed to parse tree JSON: {}", e)))
    }

    async fn node(&self, key: &NodeKey) -> Result<NodeView> {
        match self.evaluate_json(self.script(READ_NODE_JS, Some(key)), false).await? {
            NodeReply::Ok { node } => Ok(node),
            NodeReply::NoTree => Err(self.unavailable()),
            NodeReply::NoNode => Err(HarvestError::NodeNotFound(key.to_string())),
        }
    }

    async fn set_expanded(&self, key: &NodeKey) -> Result<()> {
        match self.evaluate_json(self.script(EXPAND_NODE_JS, Some(key)), true).await? {
            ExpandReply::Ok => Ok(()),
            ExpandReply::Rejected { error } => Err(HarvestError::ExpandFailed { key: key.to_string(), reason: error }),
            ExpandReply::NoTree => Err(self.unavailable()),
            ExpandReply::NoNode => Err(HarvestError::NodeNotFound(key.to_string())),
        }
    }
}

/// Script returning `true` once jQuery and the Fancytree instance are ready
pub(crate) fn tree_ready_script(selector: &str) -> String {
    render_script(TREE_READY_JS, selector, None)
}

fn render_script(template: &str, selector: &str, key: Option<&NodeKey>) -> String {
    let script = template.replace("__TREE_SELECTOR__", &js_string(selector));
    match key {
        Some(key) => script.replace("__NODE_KEY__", &js_string(key.as_str())),
        None => script,
    }
}

/// Quote a value as a JavaScript string literal
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ExpansionState;

    #[test]
    fn test_js_string_escapes() {
        assert_eq!(js_string("#tree"), r##""#tree""##);
        assert_eq!(js_string(r#"a"b\c"#), r#""a\"b\\c""#);
    }

    #[test]
    fn test_render_script_substitutes_placeholders() {
        let script = render_script(READ_NODE_JS, "#tree", Some(&NodeKey::from("_42")));
        assert!(script.contains(r##"const selector = "#tree";"##));
        assert!(script.contains(r#"const key = "_42";"#));
        assert!(!script.contains("__TREE_SELECTOR__"));
        assert!(!script.contains("__NODE_KEY__"));
    }

    #[test]
    fn test_tree_ready_script() {
        let script = tree_ready_script("#toc");
        assert!(script.contains(r##""#toc""##));
    }

    #[test]
    fn test_node_reply_parsing() {
        let reply: NodeReply = serde_json::from_str(
            r#"{"status": "ok", "node": {"key": "_3", "title": "Part 2", "state": "collapsed", "lazy": true, "children": null}}"#,
        )
        .unwrap();
        match reply {
            NodeReply::Ok { node } => {
                assert_eq!(node.state, ExpansionState::Collapsed);
                assert!(node.needs_expansion());
            }
            other => panic!("Unexpected reply: {:?}", other),
        }

        let reply: NodeReply = serde_json::from_str(r#"{"status": "no_node"}"#).unwrap();
        assert!(matches!(reply, NodeReply::NoNode));
    }

    #[test]
    fn test_expand_reply_parsing() {
        let reply: ExpandReply = serde_json::from_str(r#"{"status": "rejected", "error": "load failed"}"#).unwrap();
        match reply {
            ExpandReply::Rejected { error } => assert_eq!(error, "load failed"),
            other => panic!("Unexpected reply: {:?}", other),
        }

        let reply: ExpandReply = serde_json::from_str(r#"{"status": "no_tree"}"#).unwrap();
        assert!(matches!(reply, ExpandReply::NoTree));
    }
}
