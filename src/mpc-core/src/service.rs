use crate::model::{
    Catalog, Category, FavoriteList, Market, News, Node, NodeId, SearchResult,
};
use crate::status::Status;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Coarse classification of transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkErrorKind {
    UnknownHost,
    Connect,
    NoRoute,
    Timeout,
    Other,
}

impl NetworkErrorKind {
    /// Failures that usually mean the machine is offline or behind a proxy.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            NetworkErrorKind::UnknownHost | NetworkErrorKind::Connect | NetworkErrorKind::NoRoute
        )
    }

    /// Best-effort classification from an error message chain.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("dns error")
            || lower.contains("failed to lookup address")
            || lower.contains("name or service not known")
            || lower.contains("no such host")
        {
            NetworkErrorKind::UnknownHost
        } else if lower.contains("no route to host") || lower.contains("network is unreachable") {
            NetworkErrorKind::NoRoute
        } else if lower.contains("timed out") || lower.contains("timeout") {
            NetworkErrorKind::Timeout
        } else if lower.contains("connection refused")
            || lower.contains("error trying to connect")
            || lower.contains("connect error")
        {
            NetworkErrorKind::Connect
        } else {
            NetworkErrorKind::Other
        }
    }
}

/// Failures surfaced by a marketplace service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("network error: {message}")]
    Network {
        kind: NetworkErrorKind,
        message: String,
    },
    #[error("authentication error: {message}")]
    Authentication { message: String },
    #[error("not found: {entity}")]
    NotFound { entity: String },
    #[error("operation not supported: {operation}")]
    NotSupported { operation: String },
    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("server returned {status} for {url}")]
    Http { status: u16, url: String },
    #[error("{message}")]
    Other { message: String },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn not_supported(operation: &str) -> Self {
        ServiceError::NotSupported {
            operation: operation.to_string(),
        }
    }
}

pub const CONNECTION_HINT: &str =
    "Cannot reach the marketplace. Please check your internet connection and proxy settings and retry.";

/// Turns a failure to load or install from a catalog into a user-facing
/// status. Connectivity problems get a hint; anything else is reported with
/// its innermost message.
pub fn describe_install_failure(catalog_label: &str, error: &ServiceError) -> Status {
    let message = match error {
        ServiceError::Network { kind, message } if kind.is_connectivity() => {
            tracing::debug!(catalog = catalog_label, %message, "connectivity failure");
            format!("{catalog_label}: {CONNECTION_HINT}")
        }
        ServiceError::Network { message, .. } => format!("{catalog_label}: {message}"),
        other => format!("{catalog_label}: {}", innermost_message(other)),
    };
    Status::error(message)
}

fn innermost_message(error: &(dyn std::error::Error + 'static)) -> String {
    let mut current = error;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}

/// Search filters. Empty fields mean "any".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: Option<String>,
    pub market_id: Option<String>,
    pub category_id: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl SearchQuery {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            page_size: 20,
            ..Self::default()
        }
    }

    pub fn in_market(mut self, market_id: impl Into<String>) -> Self {
        self.market_id = Some(market_id.into());
        self
    }

    pub fn in_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }
}

/// Outcome reported back to the marketplace after an install attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallReport {
    Success,
    Failure { ius: Vec<String> },
}

/// Read and report operations against one marketplace.
///
/// Operations a backend has no endpoint for keep the default implementation
/// and fail with [`ServiceError::NotSupported`].
#[async_trait]
pub trait MarketplaceService: Send + Sync {
    /// Base URL of the marketplace this service talks to.
    fn base_url(&self) -> &str;

    async fn markets(&self) -> ServiceResult<Vec<Market>>;

    async fn category(&self, id: &str) -> ServiceResult<Category>;

    async fn node(&self, id: &NodeId) -> ServiceResult<Node>;

    /// Listings for `ids`, in the same order. Missing ids are skipped.
    async fn nodes(&self, ids: &[NodeId]) -> ServiceResult<Vec<Node>> {
        let mut nodes = Vec::with_capacity(ids.len());
        for id in ids {
            match self.node(id).await {
                Ok(node) => nodes.push(node),
                Err(ServiceError::NotFound { entity }) => {
                    tracing::debug!(%entity, "skipping missing listing");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(nodes)
    }

    async fn search(&self, query: &SearchQuery) -> ServiceResult<SearchResult>;

    async fn featured(&self, _market_id: Option<&str>) -> ServiceResult<SearchResult> {
        Err(ServiceError::not_supported("featured"))
    }

    async fn recent(&self) -> ServiceResult<SearchResult> {
        Err(ServiceError::not_supported("recent"))
    }

    async fn popular(&self) -> ServiceResult<SearchResult> {
        Err(ServiceError::not_supported("popular"))
    }

    async fn related(&self, _basis: &[NodeId]) -> ServiceResult<SearchResult> {
        Err(ServiceError::not_supported("related"))
    }

    /// Resolves a favorites list from its HTTP location.
    async fn favorite_list(&self, _url: &str) -> ServiceResult<FavoriteList> {
        Err(ServiceError::not_supported("favorite_list"))
    }

    /// Favorites of the authenticated user.
    async fn user_favorites(&self) -> ServiceResult<SearchResult> {
        Err(ServiceError::not_supported("user_favorites"))
    }

    async fn catalogs(&self) -> ServiceResult<Vec<Catalog>>;

    async fn news(&self) -> ServiceResult<Option<News>> {
        Ok(None)
    }

    async fn report_install(&self, _node: &NodeId, _report: &InstallReport) -> ServiceResult<()> {
        Ok(())
    }
}

pub type SharedService = Arc<dyn MarketplaceService>;
