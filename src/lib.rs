//! # erisa-tree
//!
//! Harvests the table of contents of the ERISApedia library into CSV by driving its
//! Fancytree widget through the Chrome DevTools Protocol (CDP).
//!
//! ## Features
//!
//! - **Browser Session Management**: Launch Chrome with a persistent profile (or attach to a running one) and wait for the user to log in
//! - **Tree Expansion**: Expand every selected subtree, lazily-loaded nodes included, sequentially or in concurrent batches
//! - **Flattening**: One CSV row per leaf, as many level columns as the deepest path
//! - **Citation Links**: Map ERISA / Code / regulation identifiers to reference URLs
//! - **Relay**: Optionally push the CSV to a spreadsheet web app
//!
//! ## CLI
//!
//! ```bash
//! # Harvest the folders listed in config.json
//! cargo run --bin erisa-tree
//!
//! # Harvest two folders into a given file, expanding siblings one at a time
//! cargo run --bin erisa-tree -- --folders "Title I,Title IV" --output toc.csv --sequential
//! ```
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use erisa_tree::{HarvestOptions, HarvestSession, LaunchOptions, Selection, WaitOptions, harvest};
//!
//! # async fn run() -> erisa_tree::Result<()> {
//! let session = HarvestSession::launch(LaunchOptions::default())?;
//! session.open("https://www.erisapedia.com/")?;
//! session.wait_for_login("#tree", &WaitOptions::default())?;
//! session.wait_for_tree_ready("#tree", &WaitOptions::default())?;
//!
//! let tree = session.tree("#tree");
//! let selection = Selection::parse_list("Title I, Title IV");
//! let report = harvest(&tree, &selection, &HarvestOptions::default()).await?;
//! println!("{} rows", report.table.row_count());
//! # Ok(())
//! # }
//! ```
//!
//! ### Without a browser
//!
//! The expansion and flattening steps work against any [`LiveTree`]; [`MemoryTree`]
//! holds one in memory:
//!
//! ```rust
//! use erisa_tree::{FlattenOptions, Selection, TreeNode, flatten};
//!
//! let root = TreeNode::root(vec![
//!     TreeNode::new("t1", "Title I").with_children(vec![
//!         TreeNode::new("s101", "Sec. 101").with_data("DOLStatutes", "101"),
//!     ]),
//! ]);
//!
//! let table = flatten(&root, &Selection::from_iter(["Title I"]), &FlattenOptions::default());
//! assert_eq!(
//!     table.to_csv(),
//!     "Level 1,Level 2,Source URL\nTitle I,Sec. 101,https://www.law.cornell.edu/uscode/text/29/1021"
//! );
//! ```
//!
//! ## Module Overview
//!
//! - [`browser`]: Browser session management, login wait
//! - [`tree`]: Tree model, selection, live tree handles (Chrome and in-memory)
//! - [`expand`]: Expansion of the selected subtrees
//! - [`flatten`]: Tree to table flattening and CSV output
//! - [`citation`]: Citation identifier to URL resolution
//! - [`harvest`]: Expansion followed by flattening
//! - [`relay`]: Spreadsheet web app upload (requires `relay` feature)
//! - [`config`]: `config.json` settings
//! - [`error`]: Error types and result aliases

pub mod browser;
pub mod citation;
pub mod config;
pub mod error;
pub mod expand;
pub mod flatten;
pub mod harvest;
pub mod tree;

#[cfg(feature = "relay")]
pub mod relay;

pub use browser::{ConnectionOptions, HarvestSession, LaunchOptions, WaitOptions};
pub use citation::resolve;
pub use config::HarvestConfig;
pub use error::{HarvestError, Result};
pub use expand::{ExpandOptions, ExpandStrategy, expand_selected};
pub use flatten::{FlattenOptions, Table, flatten};
pub use harvest::{HarvestOptions, HarvestReport, harvest};
pub use tree::{ChromeTree, LiveTree, MemoryTree, NodeKey, Selection, TreeNode};

#[cfg(feature = "relay")]
pub use relay::{RelayOutcome, SheetRelay};
