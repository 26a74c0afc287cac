use super::identifiable::impl_identifiable;
use super::Node;
use serde::{Deserialize, Serialize};

/// A named, user-owned collection of listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteList {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub owner: Option<String>,
    pub owner_profile_url: Option<String>,
    pub icon_url: Option<String>,
    pub nodes: Vec<Node>,
}

impl_identifiable!(FavoriteList);

impl FavoriteList {
    pub fn contains(&self, node: &Node) -> bool {
        self.nodes
            .iter()
            .any(|n| n.id.is_some() && n.id == node.id)
    }
}
