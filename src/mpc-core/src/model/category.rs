use super::identifiable::impl_identifiable;
use super::Node;
use serde::{Deserialize, Serialize};

/// A grouping of listings inside a market.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    /// Number of listings the server reports for this category.
    pub count: Option<u64>,
    /// Usually partial nodes (id and name only).
    pub nodes: Vec<Node>,
}

impl_identifiable!(Category);

/// A top-level market owning its categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub categories: Vec<Category>,
}

impl_identifiable!(Market);

impl Market {
    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|c| c.id.as_deref() == Some(id))
    }
}
