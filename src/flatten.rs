//! Flattening of expanded subtrees into CSV rows
//!
//! Each leaf becomes one row holding the titles on its path from the matched
//! root. The number of path columns is the deepest leaf path found across all
//! matched subtrees, and shorter paths are padded on the right with empty
//! cells so that every row is as wide as the header.

use crate::citation;
use crate::tree::{Selection, TreeNode};
use std::borrow::Cow;

/// Header of the optional citation column
pub const SOURCE_URL_HEADER: &str = "Source URL";

/// Options for [`flatten`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlattenOptions {
    /// Append a column with the resolved citation URL of each leaf
    pub citations: bool,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self { citations: true }
    }
}

/// Header plus equally wide data rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Number of data rows (header excluded)
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.header.len()
    }

    /// Serialize as CSV: `,` between cells, `\n` between rows, no trailing newline
    pub fn to_csv(&self) -> String {
        std::iter::once(&self.header)
            .chain(&self.rows)
            .map(|row| row.iter().map(|cell| escape_cell(cell)).collect::<Vec<_>>().join(","))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Quote a cell if it contains a comma, a double quote or a newline
pub fn escape_cell(cell: &str) -> Cow<'_, str> {
    if cell.contains([',', '"', '\n']) {
        Cow::Owned(format!("\"{}\"", cell.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(cell)
    }
}

/// Flatten the selected subtrees of `root` into a table.
///
/// `root` is the widget's invisible container node. Matched roots appear in
/// the order they are first met in a pre-order walk; within a subtree, leaves
/// follow document order. With no leaves at all the table still has one
/// path column.
pub fn flatten(root: &TreeNode, selection: &Selection, options: &FlattenOptions) -> Table {
    let matched = root.matching(selection);
    let depth = matched.iter().map(|node| node.max_leaf_depth()).max().unwrap_or(0).max(1);

    let mut header: Vec<String> = (1..=depth).map(|level| format!("Level {}", level)).collect();
    if options.citations {
        header.push(SOURCE_URL_HEADER.to_string());
    }

    let mut rows = Vec::new();
    let mut path = Vec::with_capacity(depth);
    for node in matched {
        collect_rows(node, &mut path, depth, options, &mut rows);
    }

    Table { header, rows }
}

fn collect_rows<'a>(
    node: &'a TreeNode,
    path: &mut Vec<&'a str>,
    depth: usize,
    options: &FlattenOptions,
    rows: &mut Vec<Vec<String>>,
) {
    path.push(&node.title);

    if node.is_leaf() {
        let mut row: Vec<String> = (0..depth).map(|i| path.get(i).copied().unwrap_or_default().to_string()).collect();
        if options.citations {
            let url = node.data.as_ref().map(|data| citation::resolve(&data.source, &data.id)).unwrap_or_default();
            row.push(url);
        }
        rows.push(row);
    } else {
        for child in node.children() {
            collect_rows(child, path, depth, options, rows);
        }
    }

    path.pop();
}
