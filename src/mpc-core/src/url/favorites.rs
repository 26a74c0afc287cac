use super::registry::{Registry, SharedStrategy, UrlHandlerStrategy};
use super::{is_http, MpcUri, ACTION_FAVORITES};
use crate::catalog::{CatalogDescriptor, CatalogRegistry};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use url::Url;

/// Path shapes of shareable favorites lists: the marketplace-wide favorites
/// page and per-user favorites pages.
static FAVORITES_URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|/)(?:marketplace/favorites|user/[^/?#]+/favorites)(?:[/?#]|$)").unwrap()
});

/// A favorites list to import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoritesDescriptor {
    /// HTTP location of the list.
    pub favorites_url: String,
    pub catalog: Option<CatalogDescriptor>,
}

/// HTTP URLs whose path matches a favorites page.
#[derive(Debug, Default)]
pub struct HttpFavoritesStrategy;

impl HttpFavoritesStrategy {
    fn favorites_url(url: &str) -> Option<Url> {
        let parsed = Url::parse(url).ok()?;
        if !is_http(&parsed) {
            return None;
        }
        FAVORITES_URL_PATTERN
            .is_match(parsed.path())
            .then_some(parsed)
    }
}

impl UrlHandlerStrategy for HttpFavoritesStrategy {
    type Output = FavoritesDescriptor;

    fn name(&self) -> &'static str {
        "http-favorites"
    }

    fn handles(&self, url: &str) -> bool {
        Self::favorites_url(url).is_some()
    }

    fn parse(&self, url: &str, catalogs: &CatalogRegistry) -> Option<Self::Output> {
        let parsed = Self::favorites_url(url)?;
        Some(FavoritesDescriptor {
            favorites_url: parsed.to_string(),
            catalog: catalogs.find_by_url(url),
        })
    }
}

/// `eclipse+mpc://<host>/favorites/<path...>` links. The remaining segments
/// form the list's path on `https://<host>/`.
#[derive(Debug, Default)]
pub struct MpcSchemeFavoritesStrategy;

impl UrlHandlerStrategy for MpcSchemeFavoritesStrategy {
    type Output = FavoritesDescriptor;

    fn name(&self) -> &'static str {
        "mpc-favorites"
    }

    fn handles(&self, url: &str) -> bool {
        MpcUri::is_mpc_scheme(url)
    }

    fn parse(&self, url: &str, catalogs: &CatalogRegistry) -> Option<Self::Output> {
        let uri = MpcUri::parse(url)?;
        if uri.action != ACTION_FAVORITES || uri.params.is_empty() {
            return None;
        }
        let base = uri.marketplace_base()?;
        // params are decoded; pushing re-encodes them so they stay on `base`
        let mut location = Url::parse(&base).ok()?;
        location
            .path_segments_mut()
            .ok()?
            .pop_if_empty()
            .extend(&uri.params);
        let favorites_url = location.to_string();
        Some(FavoritesDescriptor {
            catalog: catalogs.find_by_url(&base),
            favorites_url,
        })
    }
}

/// Favorites-link registry: HTTP form first, custom scheme as fallback.
pub fn favorites_registry() -> Registry<FavoritesDescriptor> {
    Registry::new(vec![
        Arc::new(HttpFavoritesStrategy) as SharedStrategy<FavoritesDescriptor>,
        Arc::new(MpcSchemeFavoritesStrategy),
    ])
}
