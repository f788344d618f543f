use crate::error::Result;
use crate::expand::{ExpandOptions, expand_selected};
use crate::flatten::{FlattenOptions, Table, flatten};
use crate::tree::{LiveTree, Selection, TreeNode};
use std::path::Path;

/// Options for a full harvest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestOptions {
    pub expand: ExpandOptions,
    pub flatten: FlattenOptions,
}

/// Result of expanding and flattening the selected subtrees
#[derive(Debug, Clone)]
pub struct HarvestReport {
    /// Number of matched root nodes
    pub matched_roots: usize,

    /// Snapshot of the tree taken after expansion
    pub snapshot: TreeNode,

    /// Flattened rows
    pub table: Table,
}

impl HarvestReport {
    pub fn csv(&self) -> String {
        self.table.to_csv()
    }

    /// Write the CSV to `path` (UTF-8, no trailing newline)
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.csv())?;
        Ok(())
    }

    /// Write the post-expansion snapshot as pretty JSON
    pub fn write_snapshot(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.snapshot)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Expand the selected subtrees, then flatten them.
///
/// Only a missing tree widget fails the harvest; an empty match yields a
/// header-only table.
pub async fn harvest<T>(tree: &T, selection: &Selection, options: &HarvestOptions) -> Result<HarvestReport>
where
    T: LiveTree + ?Sized,
{
    let matched_roots = expand_selected(tree, selection, &options.expand).await?;

    log::info!("Extracting tree data...");
    let snapshot = tree.snapshot().await?;
    let table = flatten(&snapshot, selection, &options.flatten);
    log::debug!(
        "Snapshot of {} node(s) flattened into {} row(s) across {} column(s)",
        snapshot.count_nodes(),
        table.row_count(),
        table.width()
    );

    Ok(HarvestReport { matched_roots, snapshot, table })
}
