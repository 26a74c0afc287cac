//! Recognition of one-click install and favorites-import links.
//!
//! Links arrive in two encodings: ordinary marketplace HTTP URLs carrying
//! `mpc_install` / `mpc_state` query parameters, and the custom
//! `eclipse+mpc:` scheme where the first path segment names the action.

mod favorites;
mod install;
mod registry;

pub use favorites::{
    favorites_registry, FavoritesDescriptor, HttpFavoritesStrategy, MpcSchemeFavoritesStrategy,
};
pub use install::{
    solution_registry, HttpInstallStrategy, MpcSchemeInstallStrategy, SolutionInstallationInfo,
};
pub use registry::{Registry, SharedStrategy, UrlHandlerStrategy};

use crate::catalog::CatalogRegistry;
use url::Url;

pub const MPC_SCHEME: &str = "eclipse+mpc";
pub const MPC_INSTALL_PARAM: &str = "mpc_install";
pub const MPC_STATE_PARAM: &str = "mpc_state";
pub const ACTION_INSTALL: &str = "install";
pub const ACTION_FAVORITES: &str = "favorites";

/// A parsed `eclipse+mpc:` link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpcUri {
    pub host: Option<String>,
    pub action: String,
    pub params: Vec<String>,
    pub state: Option<String>,
    pub install_id: Option<String>,
}

impl MpcUri {
    pub fn is_mpc_scheme(url: &str) -> bool {
        url.get(..MPC_SCHEME.len())
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case(MPC_SCHEME))
            && url[MPC_SCHEME.len()..].starts_with(':')
    }

    /// Splits a custom-scheme link into action, parameters and query state.
    /// Returns `None` for other schemes or when no action is present.
    pub fn parse(url: &str) -> Option<Self> {
        if !Self::is_mpc_scheme(url) {
            return None;
        }
        let parsed = Url::parse(url).ok()?;
        // decoded like query values, so both link forms agree on ids
        let mut segments = parsed
            .path()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::decode(segment).map(|s| s.into_owned()).ok())
            .collect::<Option<Vec<_>>>()?
            .into_iter();
        let action = segments.next()?;
        Some(Self {
            host: parsed.host_str().map(str::to_string),
            action,
            params: segments.collect(),
            state: query_param(&parsed, MPC_STATE_PARAM),
            install_id: query_param(&parsed, MPC_INSTALL_PARAM),
        })
    }

    /// The HTTPS base URL of the marketplace this link points at.
    pub fn marketplace_base(&self) -> Option<String> {
        self.host.as_ref().map(|host| format!("https://{host}/"))
    }
}

/// First non-empty value of query parameter `key`.
pub(crate) fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v.into_owned())
}

pub(crate) fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Ids end up as a single path segment of a REST endpoint; anything that
/// could address another resource is refused.
pub(crate) fn is_single_segment_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\', '?', '#'])
}

/// A link the client knows how to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketplaceLink {
    Install(SolutionInstallationInfo),
    ImportFavorites(FavoritesDescriptor),
}

/// Routes links to the install or favorites registry.
#[derive(Debug)]
pub struct LinkDispatcher {
    solutions: Registry<SolutionInstallationInfo>,
    favorites: Registry<FavoritesDescriptor>,
}

impl Default for LinkDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkDispatcher {
    pub fn new() -> Self {
        Self {
            solutions: solution_registry(),
            favorites: favorites_registry(),
        }
    }

    pub fn solutions(&self) -> &Registry<SolutionInstallationInfo> {
        &self.solutions
    }

    pub fn favorites(&self) -> &Registry<FavoritesDescriptor> {
        &self.favorites
    }

    /// Install links take precedence over favorites links.
    pub fn dispatch(&self, url: &str, catalogs: &CatalogRegistry) -> Option<MarketplaceLink> {
        if let Some(info) = self.solutions.parse(url, catalogs) {
            tracing::debug!(install_id = %info.install_id, "install link recognised");
            return Some(MarketplaceLink::Install(info));
        }
        if let Some(favorites) = self.favorites.parse(url, catalogs) {
            tracing::debug!(url = %favorites.favorites_url, "favorites link recognised");
            return Some(MarketplaceLink::ImportFavorites(favorites));
        }
        None
    }
}

/// Whether `url` looks like a one-click install link in either encoding.
pub fn is_potential_solution(url: &str) -> bool {
    solution_registry()
        .parse(url, &CatalogRegistry::default())
        .is_some()
}

/// Whether `url` looks like a favorites list in either encoding.
pub fn is_potential_favorites_list(url: &str) -> bool {
    favorites_registry()
        .parse(url, &CatalogRegistry::default())
        .is_some()
}
