use super::identifiable::impl_identifiable;
use super::{Category, Identifiable, Ius};
use serde::{Deserialize, Serialize};

/// Marketplace-scoped listing identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
}

impl_identifiable!(Tag);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {
    pub items: Vec<Tag>,
}

impl Tags {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|tag| tag.name.as_deref())
    }
}

/// Operating systems a listing declares support for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platforms {
    pub items: Vec<String>,
}

impl Platforms {
    /// An empty platform list means "all platforms".
    pub fn supports(&self, platform: &str) -> bool {
        self.items.is_empty()
            || self
                .items
                .iter()
                .any(|p| p.eq_ignore_ascii_case(platform))
    }
}

/// A marketplace listing: an installable plugin or resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: Option<NodeId>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub node_type: Option<String>,
    pub owner: Option<String>,
    pub short_description: Option<String>,
    pub body: Option<String>,
    /// Unix seconds.
    pub created: Option<i64>,
    /// Unix seconds.
    pub changed: Option<i64>,
    pub foundation_member: Option<bool>,
    pub homepage_url: Option<String>,
    pub image: Option<String>,
    pub screenshot: Option<String>,
    pub version: Option<String>,
    pub license: Option<String>,
    pub company_name: Option<String>,
    pub status: Option<String>,
    pub eclipse_version: Option<String>,
    pub support_url: Option<String>,
    pub update_url: Option<String>,
    pub installs_total: Option<u64>,
    pub installs_recent: Option<u64>,
    pub favorited: Option<u64>,
    /// `None` when the favorite state for the current user is unknown.
    pub user_favorite: Option<bool>,
    pub categories: Vec<Category>,
    pub tags: Tags,
    pub ius: Ius,
    pub platforms: Platforms,
}

impl Node {
    /// A partial node carrying only its id, as found nested in categories and
    /// favorites lists.
    pub fn with_id(id: impl Into<NodeId>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Whether the listing can be installed from an update site.
    pub fn is_installable(&self) -> bool {
        self.update_url.as_deref().is_some_and(|u| !u.is_empty()) && !self.ius.is_empty()
    }
}

impl Identifiable for Node {
    fn id(&self) -> Option<&str> {
        self.id.as_ref().map(|id| id.0.as_str())
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

/// One page of listings returned from a search or a curated list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub match_count: u64,
    pub nodes: Vec<Node>,
}

impl SearchResult {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            match_count: nodes.len() as u64,
            nodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{equals_id, Iu};

    #[test]
    fn installable_requires_update_site_and_units() {
        let mut node = Node::with_id("42");
        assert!(!node.is_installable());
        node.update_url = Some("https://download.example.org/updates".into());
        assert!(!node.is_installable());
        node.ius = Ius::new(vec![Iu::required("org.example.feature.group")]);
        assert!(node.is_installable());
    }

    #[test]
    fn partial_nodes_share_identity() {
        let full = Node {
            id: Some(NodeId::new("42")),
            name: Some("Example".into()),
            ..Node::default()
        };
        assert!(equals_id(&full, &Node::with_id("42")));
    }

    #[test]
    fn empty_platforms_support_everything() {
        let platforms = Platforms::default();
        assert!(platforms.supports("linux"));
        let platforms = Platforms {
            items: vec!["Windows".into()],
        };
        assert!(platforms.supports("windows"));
        assert!(!platforms.supports("macosx"));
    }
}
