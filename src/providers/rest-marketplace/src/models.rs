//! Wire types of the marketplace REST API (`api/v1`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct PagedResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: Option<PaginationMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMetadata {
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub has_next: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "type", default)]
    pub listing_type: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub changed: Option<i64>,
    #[serde(default)]
    pub foundation_member: Option<bool>,
    #[serde(default)]
    pub homepage_url: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub screenshot: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub eclipse_version: Option<String>,
    #[serde(default)]
    pub support_url: Option<String>,
    #[serde(default)]
    pub update_url: Option<String>,
    #[serde(default)]
    pub installs_total: Option<u64>,
    #[serde(default)]
    pub installs_recent: Option<u64>,
    #[serde(default)]
    pub favorited: Option<u64>,
    #[serde(default)]
    pub user_favorite: Option<bool>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub ius: Vec<InstallableUnit>,
    #[serde(default)]
    pub platforms: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct InstallableUnit {
    pub id: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub selected: bool,
}

#[derive(Debug, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub listings: Vec<Listing>,
}

#[derive(Debug, Deserialize)]
pub struct Market {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub self_contained: bool,
    #[serde(default)]
    pub dependencies_repository: Option<String>,
    #[serde(default)]
    pub branding: Option<Branding>,
    #[serde(default)]
    pub news: Option<News>,
}

/// Tab visibility flags are optional on the wire; absent means the client
/// default.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branding {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub wizard_icon: Option<String>,
    #[serde(default)]
    pub wizard_title: Option<String>,
    #[serde(default)]
    pub search_tab: Option<String>,
    #[serde(default)]
    pub popular_tab: Option<String>,
    #[serde(default)]
    pub recent_tab: Option<String>,
    #[serde(default)]
    pub related_tab: Option<String>,
    #[serde(default)]
    pub featured_market_tab: Option<String>,
    #[serde(default)]
    pub favorites_tab: Option<String>,
    #[serde(default)]
    pub has_search_tab: Option<bool>,
    #[serde(default)]
    pub has_popular_tab: Option<bool>,
    #[serde(default)]
    pub has_recent_tab: Option<bool>,
    #[serde(default)]
    pub has_related_tab: Option<bool>,
    #[serde(default)]
    pub has_featured_market_tab: Option<bool>,
    #[serde(default)]
    pub has_favorites_tab: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct News {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub short_title: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteList {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub owner_profile_url: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub listings: Vec<Listing>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct ListingRef {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FavoritesUpdate {
    pub listings: Vec<ListingRef>,
}

#[derive(Debug, Serialize)]
pub struct InstallReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ius: Vec<String>,
}
