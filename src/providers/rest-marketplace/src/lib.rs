mod mapping;
pub mod models;

use async_trait::async_trait;
use mapping::{
    install_report, listing_refs, map_catalog, map_category, map_favorite_list, map_listing,
    map_market, map_news, map_search_result,
};
use mpc_core::catalog::{parse_base_url, CatalogDescriptor, CatalogError};
use mpc_core::config::MarketplaceConfig;
use mpc_core::model::{Catalog, Category, FavoriteList, Market, News, Node, NodeId, SearchResult};
use mpc_core::redact::redact_secrets;
use mpc_core::resources::{ResourceError, ResourceRetriever};
use mpc_core::service::{
    InstallReport, MarketplaceService, NetworkErrorKind, SearchQuery, ServiceError, ServiceResult,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

const API_PREFIX: [&str; 2] = ["api", "v1"];

#[derive(Debug, Clone)]
pub struct RestMarketplaceConfig {
    pub base_url: String,
    pub access_token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl RestMarketplaceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(20),
        }
    }

    /// Settings for `catalog`, taking timeouts from the `[marketplace]`
    /// config section. The token is resolved by the caller.
    pub fn for_catalog(
        catalog: &CatalogDescriptor,
        marketplace: &MarketplaceConfig,
        access_token: Option<String>,
    ) -> Self {
        Self {
            base_url: catalog.url.to_string(),
            access_token,
            connect_timeout: marketplace.connect_timeout(),
            request_timeout: marketplace.request_timeout(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RestSetupError {
    #[error(transparent)]
    InvalidBaseUrl(#[from] CatalogError),
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// [`MarketplaceService`] backed by the marketplace REST API.
#[derive(Clone)]
pub struct RestMarketplaceService {
    client: Client,
    base_url: Url,
    base_url_text: String,
    access_token: Option<String>,
}

impl RestMarketplaceService {
    pub fn new(config: RestMarketplaceConfig) -> Result<Self, RestSetupError> {
        let base_url = parse_base_url(&config.base_url)?;
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(concat!("mpc/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url_text: base_url.to_string(),
            base_url,
            access_token: config.access_token,
        })
    }

    /// `<base>/api/v1/<segments...>`. Each segment is percent-encoded, so an
    /// id can never reach a different resource.
    fn endpoint(&self, segments: &[&str]) -> ServiceResult<Url> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            return Err(ServiceError::Other {
                message: format!("invalid path segment {bad:?}"),
            });
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ServiceError::Other {
                message: format!("{} cannot be a base url", self.base_url),
            })?
            .pop_if_empty()
            .extend(API_PREFIX)
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(
        &self,
        request: RequestBuilder,
        url: &Url,
        entity: &str,
    ) -> ServiceResult<Response> {
        tracing::debug!(url = %redact_secrets(url.as_str()), "marketplace request");
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(network_error)?;
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ServiceError::Authentication {
                message: format!("{} for {entity}", response.status()),
            }),
            StatusCode::NOT_FOUND => Err(ServiceError::NotFound {
                entity: entity.to_string(),
            }),
            status if !status.is_success() => Err(ServiceError::Http {
                status: status.as_u16(),
                url: redact_secrets(url.as_str()).into_owned(),
            }),
            _ => Ok(response),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &[&str],
        query: &[(&str, String)],
        entity: &str,
    ) -> ServiceResult<T> {
        let url = self.endpoint(path)?;
        let request = self.client.get(url.clone()).query(query);
        let response = self.send(request, &url, entity).await?;
        response.json::<T>().await.map_err(|e| ServiceError::Decode {
            url: redact_secrets(url.as_str()).into_owned(),
            message: e.to_string(),
        })
    }

    async fn listing_page(
        &self,
        path: &[&str],
        query: &[(&str, String)],
        entity: &str,
    ) -> ServiceResult<SearchResult> {
        let page: models::PagedResponse<models::Listing> =
            self.get_json(path, query, entity).await?;
        Ok(map_search_result(&page))
    }

    /// Replaces the authenticated user's favorites with `nodes`.
    pub async fn update_user_favorites(&self, nodes: &[Node]) -> ServiceResult<()> {
        if self.access_token.is_none() {
            return Err(ServiceError::Authentication {
                message: "updating favorites requires an access token".into(),
            });
        }
        let url = self.endpoint(&["user", "favorites"])?;
        let body = models::FavoritesUpdate {
            listings: listing_refs(nodes),
        };
        let request = self.client.put(url.clone()).json(&body);
        self.send(request, &url, "user favorites").await?;
        Ok(())
    }
}

fn network_error(error: reqwest::Error) -> ServiceError {
    let message = error_chain(&error);
    let kind = if error.is_timeout() {
        NetworkErrorKind::Timeout
    } else {
        match NetworkErrorKind::classify(&message) {
            NetworkErrorKind::Other if error.is_connect() => NetworkErrorKind::Connect,
            kind => kind,
        }
    };
    ServiceError::Network {
        kind,
        message: redact_secrets(&message).into_owned(),
    }
}

/// reqwest keeps the os-level cause in the source chain, not in Display.
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut current = error.source();
    while let Some(source) = current {
        message.push_str(": ");
        message.push_str(&source.to_string());
        current = source.source();
    }
    message
}

fn search_params(query: &SearchQuery) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(text) = query.text.as_deref().filter(|t| !t.trim().is_empty()) {
        params.push(("q", text.trim().to_string()));
    }
    if let Some(market) = &query.market_id {
        params.push(("marketId", market.clone()));
    }
    if let Some(category) = &query.category_id {
        params.push(("categoryId", category.clone()));
    }
    params.push(("page", query.page.to_string()));
    if query.page_size > 0 {
        params.push(("pageSize", query.page_size.to_string()));
    }
    params
}

#[async_trait]
impl MarketplaceService for RestMarketplaceService {
    fn base_url(&self) -> &str {
        &self.base_url_text
    }

    async fn markets(&self) -> ServiceResult<Vec<Market>> {
        let page: models::PagedResponse<models::Market> =
            self.get_json(&["markets"], &[], "markets").await?;
        Ok(page.data.iter().map(map_market).collect())
    }

    async fn category(&self, id: &str) -> ServiceResult<Category> {
        let category: models::Category = self
            .get_json(&["categories", id], &[], &format!("category {id}"))
            .await?;
        Ok(map_category(&category))
    }

    async fn node(&self, id: &NodeId) -> ServiceResult<Node> {
        let listing: models::Listing = self
            .get_json(&["listings", id.0.as_str()], &[], &format!("listing {id}"))
            .await?;
        Ok(map_listing(&listing))
    }

    async fn search(&self, query: &SearchQuery) -> ServiceResult<SearchResult> {
        self.listing_page(&["listings"], &search_params(query), "search")
            .await
    }

    async fn featured(&self, market_id: Option<&str>) -> ServiceResult<SearchResult> {
        let params: Vec<(&str, String)> = market_id
            .map(|m| vec![("marketId", m.to_string())])
            .unwrap_or_default();
        self.listing_page(&["listings", "featured"], &params, "featured listings")
            .await
    }

    async fn recent(&self) -> ServiceResult<SearchResult> {
        self.listing_page(&["listings", "recent"], &[], "recent listings")
            .await
    }

    async fn popular(&self) -> ServiceResult<SearchResult> {
        self.listing_page(&["listings", "popular"], &[], "popular listings")
            .await
    }

    async fn related(&self, basis: &[NodeId]) -> ServiceResult<SearchResult> {
        if basis.is_empty() {
            return Ok(SearchResult::default());
        }
        let ids = basis
            .iter()
            .map(|id| id.0.as_str())
            .collect::<Vec<_>>()
            .join(",");
        self.listing_page(&["listings", "related"], &[("ids", ids)], "related listings")
            .await
    }

    async fn favorite_list(&self, url: &str) -> ServiceResult<FavoriteList> {
        let list: models::FavoriteList = self
            .get_json(
                &["favorites"],
                &[("url", url.to_string())],
                &format!("favorites {url}"),
            )
            .await?;
        Ok(map_favorite_list(&list))
    }

    async fn user_favorites(&self) -> ServiceResult<SearchResult> {
        if self.access_token.is_none() {
            return Err(ServiceError::Authentication {
                message: "user favorites require an access token".into(),
            });
        }
        self.listing_page(&["user", "favorites"], &[], "user favorites")
            .await
    }

    async fn catalogs(&self) -> ServiceResult<Vec<Catalog>> {
        let page: models::PagedResponse<models::Catalog> =
            self.get_json(&["catalogs"], &[], "catalogs").await?;
        Ok(page.data.iter().map(map_catalog).collect())
    }

    async fn news(&self) -> ServiceResult<Option<News>> {
        match self.get_json::<models::News>(&["news"], &[], "news").await {
            Ok(news) => Ok(Some(map_news(&news))),
            Err(ServiceError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn report_install(&self, node: &NodeId, report: &InstallReport) -> ServiceResult<()> {
        let url = self.endpoint(&["listings", node.0.as_str(), "installs"])?;
        let request = self.client.post(url.clone()).json(&install_report(report));
        self.send(request, &url, &format!("listing {node}")).await?;
        let success = matches!(report, InstallReport::Success);
        tracing::info!(listing = %node, success, "install reported");
        Ok(())
    }
}

/// Blocking downloader for catalog icons and listing images. Runs on task
/// manager worker threads, never inside an async runtime.
pub struct HttpResourceRetriever {
    client: reqwest::blocking::Client,
}

impl HttpResourceRetriever {
    pub fn new(request_timeout: Duration) -> Result<Self, RestSetupError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("mpc/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl ResourceRetriever for HttpResourceRetriever {
    fn retrieve(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
        let download_error = |message: String| ResourceError::Download {
            url: redact_secrets(url).into_owned(),
            message,
        };
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| download_error(error_chain(&e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(download_error(format!("server returned {status}")));
        }
        let bytes = response.bytes().map_err(|e| download_error(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_params_skip_empty_filters() {
        let params = search_params(&SearchQuery::text("  rust  ").in_category("7"));
        assert_eq!(
            params,
            vec![
                ("q", "rust".to_string()),
                ("categoryId", "7".to_string()),
                ("page", "0".to_string()),
                ("pageSize", "20".to_string()),
            ]
        );
        let params = search_params(&SearchQuery::default());
        assert_eq!(params, vec![("page", "0".to_string())]);
    }

    #[test]
    fn base_url_is_normalised() {
        let service =
            RestMarketplaceService::new(RestMarketplaceConfig::new("https://m.example.org/api"))
                .expect("service");
        assert_eq!(service.base_url(), "https://m.example.org/api/");
        assert!(matches!(
            RestMarketplaceService::new(RestMarketplaceConfig::new("nope")),
            Err(RestSetupError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn ids_stay_inside_their_path_segment() {
        let service =
            RestMarketplaceService::new(RestMarketplaceConfig::new("https://m.example.org/mp"))
                .expect("service");
        let url = service
            .endpoint(&["listings", "../user/favorites"])
            .expect("endpoint");
        assert_eq!(
            url.as_str(),
            "https://m.example.org/mp/api/v1/listings/..%2Fuser%2Ffavorites"
        );
        for bad in ["", ".", ".."] {
            assert!(service.endpoint(&["listings", bad]).is_err(), "{bad:?}");
        }
    }
}
