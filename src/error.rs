use std::time::Duration;
use thiserror::Error;

/// Errors produced while driving the browser, the tree widget, or the relay
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),

    #[error("JavaScript evaluation failed: {0}")]
    EvaluationFailed(String),

    /// The tree widget could not be obtained at all (not the same as "nothing matched")
    #[error("Tree not found: {0}")]
    TreeUnavailable(String),

    #[error("Tree node not found: {0}")]
    NodeNotFound(String),

    #[error("Failed to expand node '{key}': {reason}")]
    ExpandFailed { key: String, reason: String },

    #[error("Failed to parse tree data: {0}")]
    TreeParseFailed(String),

    #[error("Timed out after {0:?} waiting for login")]
    LoginTimeout(Duration),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Relay request failed: {0}")]
    RelayFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl HarvestError {
    /// Whether this error means the tree widget itself is missing
    pub fn is_tree_unavailable(&self) -> bool {
        matches!(self, HarvestError::TreeUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
