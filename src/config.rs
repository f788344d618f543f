use crate::error::{HarvestError, Result};
use crate::expand::{DEFAULT_BATCH_SIZE, DEFAULT_SETTLE_DELAY};
use crate::tree::Selection;
use crate::tree::chrome::DEFAULT_TREE_SELECTOR;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Settings read from `config.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HarvestConfig {
    /// Page that hosts the tree (redirects to the login form when signed out)
    pub login_url: String,

    /// Root titles harvested when no selection is given on the command line
    pub folders: Selection,

    /// Spreadsheet web app receiving the CSV; relay is skipped when absent
    pub google_sheet_web_app_url: Option<String>,

    /// CSS selector of the tree widget
    pub tree_selector: String,

    /// Delay after each expand request, in milliseconds
    pub settle_ms: u64,

    /// Siblings expanded concurrently; 0 or 1 expands sequentially
    pub batch_size: usize,

    /// Append the resolved citation URL column
    pub citations: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            login_url: String::new(),
            folders: Selection::new(),
            google_sheet_web_app_url: None,
            tree_selector: DEFAULT_TREE_SELECTOR.to_string(),
            settle_ms: DEFAULT_SETTLE_DELAY.as_millis() as u64,
            batch_size: DEFAULT_BATCH_SIZE,
            citations: true,
        }
    }
}

impl HarvestConfig {
    /// Load the configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| HarvestError::InvalidConfig(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&text).map_err(|e| match e {
            HarvestError::InvalidConfig(reason) => HarvestError::InvalidConfig(format!("{}: {}", path.display(), reason)),
            other => other,
        })
    }

    /// Load the configuration from a file if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| HarvestError::InvalidConfig(e.to_string()))
    }

    /// Relay endpoint, if one is configured
    pub fn relay_url(&self) -> Option<&str> {
        self.google_sheet_web_app_url.as_deref().map(str::trim).filter(|url| !url.is_empty())
    }
}
