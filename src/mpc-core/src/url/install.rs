use super::registry::{Registry, SharedStrategy, UrlHandlerStrategy};
use super::{
    is_http, is_single_segment_id, query_param, MpcUri, ACTION_INSTALL, MPC_INSTALL_PARAM,
    MPC_STATE_PARAM,
};
use crate::catalog::{CatalogDescriptor, CatalogRegistry};
use crate::model::NodeId;
use std::sync::Arc;
use url::Url;

/// Everything needed to start installing a listing from a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionInstallationInfo {
    pub install_id: NodeId,
    /// Opaque selection state forwarded to the install wizard.
    pub state: Option<String>,
    pub requested_url: String,
    pub catalog: Option<CatalogDescriptor>,
}

impl SolutionInstallationInfo {
    /// Canonical `eclipse+mpc:` form of this install request.
    pub fn install_url(&self) -> Option<String> {
        let host = match &self.catalog {
            Some(catalog) => catalog.url.host_str().map(str::to_string),
            None => Url::parse(&self.requested_url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string)),
        }?;
        let mut url = Url::parse(&format!("{}://{host}/", super::MPC_SCHEME)).ok()?;
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .push(ACTION_INSTALL)
            .push(&self.install_id.0);
        if let Some(state) = &self.state {
            url.query_pairs_mut().append_pair(MPC_STATE_PARAM, state);
        }
        Some(url.to_string())
    }
}

/// Marketplace HTTP URLs carrying an `mpc_install` query parameter.
#[derive(Debug, Default)]
pub struct HttpInstallStrategy;

impl UrlHandlerStrategy for HttpInstallStrategy {
    type Output = SolutionInstallationInfo;

    fn name(&self) -> &'static str {
        "http-install"
    }

    fn handles(&self, url: &str) -> bool {
        Url::parse(url)
            .map(|u| is_http(&u) && query_param(&u, MPC_INSTALL_PARAM).is_some())
            .unwrap_or(false)
    }

    fn parse(&self, url: &str, catalogs: &CatalogRegistry) -> Option<Self::Output> {
        let parsed = Url::parse(url).ok()?;
        if !is_http(&parsed) {
            return None;
        }
        let install_id = query_param(&parsed, MPC_INSTALL_PARAM)
            .filter(|id| is_single_segment_id(id))?;
        Some(SolutionInstallationInfo {
            install_id: NodeId::new(install_id),
            state: query_param(&parsed, MPC_STATE_PARAM),
            requested_url: url.to_string(),
            catalog: catalogs.find_by_url(url),
        })
    }
}

/// `eclipse+mpc://<host>/install/<id>?mpc_state=<state>` links.
#[derive(Debug, Default)]
pub struct MpcSchemeInstallStrategy;

impl UrlHandlerStrategy for MpcSchemeInstallStrategy {
    type Output = SolutionInstallationInfo;

    fn name(&self) -> &'static str {
        "mpc-install"
    }

    fn handles(&self, url: &str) -> bool {
        MpcUri::is_mpc_scheme(url)
    }

    fn parse(&self, url: &str, catalogs: &CatalogRegistry) -> Option<Self::Output> {
        let uri = MpcUri::parse(url)?;
        if uri.action != ACTION_INSTALL {
            return None;
        }
        let install_id = uri
            .params
            .first()
            .cloned()
            .or_else(|| uri.install_id.clone())
            .filter(|id| is_single_segment_id(id))?;
        let catalog = uri
            .marketplace_base()
            .and_then(|base| catalogs.find_by_url(&base));
        Some(SolutionInstallationInfo {
            install_id: NodeId::new(install_id),
            state: uri.state,
            requested_url: url.to_string(),
            catalog,
        })
    }
}

/// Install-link registry: HTTP form first, custom scheme as fallback.
pub fn solution_registry() -> Registry<SolutionInstallationInfo> {
    Registry::new(vec![
        Arc::new(HttpInstallStrategy) as SharedStrategy<SolutionInstallationInfo>,
        Arc::new(MpcSchemeInstallStrategy),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalogs() -> CatalogRegistry {
        CatalogRegistry::new(vec![
            CatalogDescriptor::new("https://example.org/", "Example").expect("url")
        ])
    }

    #[test]
    fn parses_custom_scheme_install() {
        let info = solution_registry()
            .parse(
                "eclipse+mpc://example.org/install/12345?mpc_state=abc",
                &catalogs(),
            )
            .expect("install link");
        assert_eq!(info.install_id, NodeId::new("12345"));
        assert_eq!(info.state.as_deref(), Some("abc"));
        assert_eq!(info.catalog.expect("catalog").label, "Example");
    }

    #[test]
    fn install_id_may_come_from_query() {
        let info = MpcSchemeInstallStrategy
            .parse(
                "eclipse+mpc://example.org/install?mpc_install=99",
                &CatalogRegistry::default(),
            )
            .expect("install link");
        assert_eq!(info.install_id.0, "99");
        assert!(info.catalog.is_none());
    }

    #[test]
    fn other_actions_are_not_install_links() {
        let strategy = MpcSchemeInstallStrategy;
        let url = "eclipse+mpc://example.org/favorites/user/alice/favorites";
        assert!(strategy.handles(url));
        assert!(strategy.parse(url, &catalogs()).is_none());
    }

    #[test]
    fn http_links_need_install_parameter() {
        let strategy = HttpInstallStrategy;
        assert!(strategy.handles("https://example.org/content/x?mpc_install=5"));
        assert!(!strategy.handles("https://example.org/content/x?mpc_install="));
        assert!(!strategy.handles("https://example.org/content/x"));
        assert!(!strategy.handles("eclipse+mpc://example.org/install/5"));

        let info = strategy
            .parse("https://example.org/content/x?mpc_install=5", &catalogs())
            .expect("install link");
        assert_eq!(info.install_id.0, "5");
        assert_eq!(info.state, None);
    }

    #[test]
    fn path_like_install_ids_are_rejected() {
        let registry = solution_registry();
        assert!(registry
            .parse(
                "https://example.org/content/x?mpc_install=..%2Fuser%2Ffavorites",
                &catalogs(),
            )
            .is_none());
        assert!(registry
            .parse("eclipse+mpc://example.org/install/..%2Fuser", &catalogs())
            .is_none());
        assert!(registry
            .parse(
                "eclipse+mpc://example.org/install?mpc_install=a%3Fb%3Dc",
                &catalogs(),
            )
            .is_none());
    }

    #[test]
    fn both_link_forms_decode_ids_alike() {
        let registry = solution_registry();
        let from_path = registry
            .parse("eclipse+mpc://example.org/install/a%20b", &catalogs())
            .expect("scheme link");
        let from_query = registry
            .parse("https://example.org/content/x?mpc_install=a%20b", &catalogs())
            .expect("http link");
        assert_eq!(from_path.install_id, from_query.install_id);
        assert_eq!(from_path.install_id.0, "a b");
    }

    #[test]
    fn renders_canonical_install_url() {
        let info = SolutionInstallationInfo {
            install_id: NodeId::new("12345"),
            state: Some("abc".into()),
            requested_url: "https://example.org/content/x?mpc_install=12345".into(),
            catalog: None,
        };
        assert_eq!(
            info.install_url().as_deref(),
            Some("eclipse+mpc://example.org/install/12345?mpc_state=abc")
        );
    }
}
