use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Set of root titles to harvest.
///
/// Entries are trimmed on insertion and blank entries dropped; node titles are
/// trimmed before comparison. Matching is exact string equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Selection {
    titles: IndexSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-separated list such as `"Title I, Title IV"`
    pub fn parse_list(list: &str) -> Self {
        list.split(',').collect()
    }

    pub fn insert(&mut self, title: impl AsRef<str>) -> bool {
        let title = title.as_ref().trim();
        if title.is_empty() {
            return false;
        }
        self.titles.insert(title.to_string())
    }

    /// Whether a node with this title is a matched root
    pub fn matches(&self, node_title: &str) -> bool {
        self.titles.contains(node_title.trim())
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.titles.iter().map(String::as_str)
    }

    /// Titles joined for log output
    pub fn display(&self) -> String {
        self.iter().collect::<Vec<_>>().join(", ")
    }
}

impl<S: AsRef<str>> FromIterator<S> for Selection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut selection = Selection::new();
        for title in iter {
            selection.insert(title);
        }
        selection
    }
}

impl From<Vec<String>> for Selection {
    fn from(titles: Vec<String>) -> Self {
        titles.into_iter().collect()
    }
}

impl From<Selection> for Vec<String> {
    fn from(selection: Selection) -> Self {
        selection.titles.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_trims_and_dedups() {
        let selection = Selection::parse_list(" Title I ,Title IV,, Title I");
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.display(), "Title I, Title IV");
    }

    #[test]
    fn test_matches_trimmed_title_exactly() {
        let selection = Selection::from_iter(["Reporting"]);
        assert!(selection.matches("  Reporting\n"));
        assert!(!selection.matches("Reporting and Disclosure"));
        assert!(!selection.matches("reporting"));
    }

    #[test]
    fn test_serde_as_list() {
        let selection: Selection = serde_json::from_str(r#"["A", " B", "A"]"#).unwrap();
        assert_eq!(selection.len(), 2);
        assert_eq!(serde_json::to_string(&selection).unwrap(), r#"["A","B"]"#);
    }

    #[test]
    fn test_empty() {
        assert!(Selection::parse_list(" , ").is_empty());
    }
}
