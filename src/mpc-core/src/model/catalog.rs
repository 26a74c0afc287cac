use super::identifiable::impl_identifiable;
use serde::{Deserialize, Serialize};

/// A marketplace server as described by the server itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Whether listings resolve all their dependencies from their own sites.
    pub self_contained: bool,
    pub dependencies_repository: Option<String>,
    pub branding: Option<CatalogBranding>,
    pub news: Option<News>,
}

impl_identifiable!(Catalog);

/// Wizard presentation hints published by a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogBranding {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub wizard_icon: Option<String>,
    pub wizard_title: Option<String>,
    pub search_tab: Option<String>,
    pub popular_tab: Option<String>,
    pub recent_tab: Option<String>,
    pub related_tab: Option<String>,
    pub featured_market_tab: Option<String>,
    pub favorites_tab: Option<String>,
    pub has_search_tab: bool,
    pub has_popular_tab: bool,
    pub has_recent_tab: bool,
    pub has_related_tab: bool,
    pub has_featured_market_tab: bool,
    pub has_favorites_tab: bool,
}

impl_identifiable!(CatalogBranding);

impl Default for CatalogBranding {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            url: None,
            wizard_icon: None,
            wizard_title: None,
            search_tab: None,
            popular_tab: None,
            recent_tab: None,
            related_tab: None,
            featured_market_tab: None,
            favorites_tab: None,
            has_search_tab: true,
            has_popular_tab: true,
            has_recent_tab: true,
            has_related_tab: false,
            has_featured_market_tab: false,
            has_favorites_tab: false,
        }
    }
}

impl CatalogBranding {
    /// Remote images referenced by this branding.
    pub fn resource_urls(&self) -> Vec<&str> {
        self.wizard_icon.iter().map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct News {
    pub id: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub short_title: Option<String>,
    /// Unix seconds.
    pub timestamp: Option<i64>,
}

impl_identifiable!(News);
