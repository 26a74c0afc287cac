use crate::models;
use mpc_core::model::{
    Catalog, CatalogBranding, Category, FavoriteList, Iu, Ius, Market, News, Node, NodeId,
    Platforms, SearchResult, Tag, Tags,
};
use mpc_core::service::InstallReport;

pub fn map_listing(listing: &models::Listing) -> Node {
    Node {
        id: listing.id.clone().map(NodeId::new),
        name: listing.name.clone(),
        url: listing.url.clone(),
        node_type: listing.listing_type.clone(),
        owner: listing.owner.clone(),
        short_description: listing.short_description.clone(),
        body: listing.body.clone(),
        created: listing.created,
        changed: listing.changed,
        foundation_member: listing.foundation_member,
        homepage_url: listing.homepage_url.clone(),
        image: listing.image.clone(),
        screenshot: listing.screenshot.clone(),
        version: listing.version.clone(),
        license: listing.license.clone(),
        company_name: listing.company_name.clone(),
        status: listing.status.clone(),
        eclipse_version: listing.eclipse_version.clone(),
        support_url: listing.support_url.clone(),
        update_url: listing.update_url.clone(),
        installs_total: listing.installs_total,
        installs_recent: listing.installs_recent,
        favorited: listing.favorited,
        user_favorite: listing.user_favorite,
        categories: listing.categories.iter().map(map_category).collect(),
        tags: map_tags(&listing.tags),
        ius: map_ius(&listing.ius),
        platforms: Platforms {
            items: listing.platforms.clone(),
        },
    }
}

pub fn map_listings(listings: &[models::Listing]) -> Vec<Node> {
    listings.iter().map(map_listing).collect()
}

pub fn map_search_result(page: &models::PagedResponse<models::Listing>) -> SearchResult {
    let nodes = map_listings(&page.data);
    let match_count = page
        .meta
        .as_ref()
        .and_then(|m| m.total_count)
        .unwrap_or(nodes.len() as u64);
    SearchResult { match_count, nodes }
}

/// Repeated unit ids on the wire are merged into one entry.
pub fn map_ius(ius: &[models::InstallableUnit]) -> Ius {
    ius.iter()
        .map(|iu| Iu {
            id: iu.id.clone(),
            optional: iu.optional,
            selected: iu.selected,
        })
        .fold(Ius::default(), |acc, iu| acc.join(&Ius::new(vec![iu])))
}

pub fn map_tags(tags: &[models::Tag]) -> Tags {
    Tags {
        items: tags
            .iter()
            .map(|t| Tag {
                id: t.id.clone(),
                name: t.name.clone(),
                url: t.url.clone(),
            })
            .collect(),
    }
}

pub fn map_category(category: &models::Category) -> Category {
    Category {
        id: category.id.clone(),
        name: category.name.clone(),
        url: category.url.clone(),
        count: category.count,
        nodes: map_listings(&category.listings),
    }
}

pub fn map_market(market: &models::Market) -> Market {
    Market {
        id: market.id.clone(),
        name: market.name.clone(),
        url: market.url.clone(),
        categories: market.categories.iter().map(map_category).collect(),
    }
}

pub fn map_branding(branding: &models::Branding) -> CatalogBranding {
    let defaults = CatalogBranding::default();
    CatalogBranding {
        id: branding.id.clone(),
        name: branding.name.clone(),
        url: branding.url.clone(),
        wizard_icon: branding.wizard_icon.clone(),
        wizard_title: branding.wizard_title.clone(),
        search_tab: branding.search_tab.clone(),
        popular_tab: branding.popular_tab.clone(),
        recent_tab: branding.recent_tab.clone(),
        related_tab: branding.related_tab.clone(),
        featured_market_tab: branding.featured_market_tab.clone(),
        favorites_tab: branding.favorites_tab.clone(),
        has_search_tab: branding.has_search_tab.unwrap_or(defaults.has_search_tab),
        has_popular_tab: branding.has_popular_tab.unwrap_or(defaults.has_popular_tab),
        has_recent_tab: branding.has_recent_tab.unwrap_or(defaults.has_recent_tab),
        has_related_tab: branding.has_related_tab.unwrap_or(defaults.has_related_tab),
        has_featured_market_tab: branding
            .has_featured_market_tab
            .unwrap_or(defaults.has_featured_market_tab),
        has_favorites_tab: branding
            .has_favorites_tab
            .unwrap_or(defaults.has_favorites_tab),
    }
}

pub fn map_news(news: &models::News) -> News {
    News {
        id: news.id.clone(),
        name: news.name.clone(),
        url: news.url.clone(),
        short_title: news.short_title.clone(),
        timestamp: news.timestamp,
    }
}

pub fn map_catalog(catalog: &models::Catalog) -> Catalog {
    Catalog {
        id: catalog.id.clone(),
        name: catalog.name.clone(),
        url: catalog.url.clone(),
        description: catalog.description.clone(),
        image_url: catalog.image_url.clone(),
        self_contained: catalog.self_contained,
        dependencies_repository: catalog.dependencies_repository.clone(),
        branding: catalog.branding.as_ref().map(map_branding),
        news: catalog.news.as_ref().map(map_news),
    }
}

pub fn map_favorite_list(list: &models::FavoriteList) -> FavoriteList {
    FavoriteList {
        id: list.id.clone(),
        name: list.name.clone(),
        url: list.url.clone(),
        owner: list.owner.clone(),
        owner_profile_url: list.owner_profile_url.clone(),
        icon_url: list.icon_url.clone(),
        nodes: map_listings(&list.listings),
    }
}

/// Listing references for a favorites update. Nodes without an id cannot
/// be referenced and are dropped.
pub fn listing_refs(nodes: &[Node]) -> Vec<models::ListingRef> {
    nodes
        .iter()
        .filter_map(|node| {
            let id = node.id.as_ref()?;
            Some(models::ListingRef {
                id: id.0.clone(),
                url: node.url.clone(),
            })
        })
        .collect()
}

pub fn install_report(report: &InstallReport) -> models::InstallReport {
    match report {
        InstallReport::Success => models::InstallReport {
            success: true,
            ius: Vec::new(),
        },
        InstallReport::Failure { ius } => models::InstallReport {
            success: false,
            ius: ius.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing_json() -> &'static str {
        r#"{
            "id": "1234",
            "name": "Example Tools",
            "url": "https://marketplace.example.org/content/example-tools",
            "type": "resource",
            "shortDescription": "Tools",
            "updateUrl": "https://download.example.org/tools/",
            "installsTotal": 42,
            "categories": [
                {"id": "7", "name": "Editor", "listings": [{"id": "99"}]}
            ],
            "tags": [{"id": "t1", "name": "rust"}, {"name": "lsp"}],
            "ius": [
                {"id": "org.example.tools.feature.group"},
                {"id": "org.example.extras", "optional": true},
                {"id": "org.example.extras", "optional": true, "selected": true}
            ],
            "platforms": ["linux", "win32"]
        }"#
    }

    #[test]
    fn listing_keeps_nested_structure() {
        let listing: models::Listing = serde_json::from_str(listing_json()).expect("json");
        let node = map_listing(&listing);

        assert_eq!(node.id, Some(NodeId::new("1234")));
        assert_eq!(node.node_type.as_deref(), Some("resource"));
        assert_eq!(node.installs_total, Some(42));
        assert_eq!(node.categories.len(), 1);
        assert_eq!(node.categories[0].nodes[0].id, Some(NodeId::new("99")));
        assert_eq!(node.tags.names().collect::<Vec<_>>(), vec!["rust", "lsp"]);
        assert!(node.platforms.supports("win32"));
        assert!(node.is_installable());
    }

    #[test]
    fn duplicate_units_are_joined() {
        let listing: models::Listing = serde_json::from_str(listing_json()).expect("json");
        let ius = map_ius(&listing.ius);
        assert_eq!(ius.len(), 2);
        let extras = ius.get("org.example.extras").expect("extras");
        assert!(extras.optional);
        assert!(extras.is_selected());
        assert!(ius
            .get("org.example.tools.feature.group")
            .expect("required")
            .is_selected());
    }

    #[test]
    fn branding_defaults_fill_missing_flags() {
        let branding: models::Branding =
            serde_json::from_str(r#"{"wizardTitle": "Example", "hasFavoritesTab": true}"#)
                .expect("json");
        let mapped = map_branding(&branding);
        assert_eq!(mapped.wizard_title.as_deref(), Some("Example"));
        assert!(mapped.has_search_tab);
        assert!(mapped.has_favorites_tab);
        assert!(!mapped.has_related_tab);
    }

    #[test]
    fn search_count_prefers_server_total() {
        let page: models::PagedResponse<models::Listing> = serde_json::from_str(
            r#"{"data": [{"id": "1"}, {"id": "2"}], "meta": {"totalCount": 40}}"#,
        )
        .expect("json");
        let result = map_search_result(&page);
        assert_eq!(result.match_count, 40);
        assert_eq!(result.nodes.len(), 2);

        let page: models::PagedResponse<models::Listing> =
            serde_json::from_str(r#"{"data": [{"id": "1"}]}"#).expect("json");
        assert_eq!(map_search_result(&page).match_count, 1);
    }

    #[test]
    fn listing_refs_skip_nodes_without_id() {
        let mut named = Node::with_id("5");
        named.url = Some("https://marketplace.example.org/content/five".into());
        let refs = listing_refs(&[named, Node::default()]);
        assert_eq!(
            refs,
            vec![models::ListingRef {
                id: "5".into(),
                url: Some("https://marketplace.example.org/content/five".into()),
            }]
        );
    }
}
