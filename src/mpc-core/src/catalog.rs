//! Known marketplace endpoints.
//!
//! The registry is an ordinary value handed to whoever needs it; link
//! resolution and service construction look catalogs up here by URL.

use crate::model::{Catalog, CatalogBranding};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid catalog url {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
}

/// Describes a marketplace server the client can talk to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDescriptor {
    pub url: Url,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub dependencies_repository: Option<String>,
    #[serde(default)]
    pub branding: Option<CatalogBranding>,
}

impl CatalogDescriptor {
    pub fn new(url: &str, label: impl Into<String>) -> Result<Self, CatalogError> {
        let url = parse_base_url(url)?;
        Ok(Self {
            url,
            label: label.into(),
            description: None,
            icon_url: None,
            dependencies_repository: None,
            branding: None,
        })
    }

    /// Builds a descriptor from a catalog advertised by a server.
    pub fn from_catalog(catalog: &Catalog) -> Result<Self, CatalogError> {
        let url = catalog.url.as_deref().unwrap_or_default();
        let label = catalog
            .name
            .clone()
            .unwrap_or_else(|| url.to_string());
        let mut descriptor = Self::new(url, label)?;
        descriptor.description = catalog.description.clone();
        descriptor.icon_url = catalog.image_url.clone();
        descriptor.dependencies_repository = catalog.dependencies_repository.clone();
        descriptor.branding = catalog.branding.clone();
        Ok(descriptor)
    }

    /// Whether `candidate` points somewhere below this catalog's base URL.
    /// `http` and `https` are treated as the same endpoint.
    pub fn matches(&self, candidate: &Url) -> bool {
        let same_host = matches!(
            (self.url.host_str(), candidate.host_str()),
            (Some(a), Some(b)) if a.eq_ignore_ascii_case(b)
        );
        let same_endpoint = if is_http_pair(&self.url, candidate) {
            self.url.port() == candidate.port()
        } else {
            self.url.scheme() == candidate.scheme()
                && self.url.port_or_known_default() == candidate.port_or_known_default()
        };
        same_host && same_endpoint && candidate.path().starts_with(self.url.path())
    }
}

fn is_http_pair(a: &Url, b: &Url) -> bool {
    matches!(a.scheme(), "http" | "https") && matches!(b.scheme(), "http" | "https")
}

/// Parses a catalog base URL, normalising the path to end with `/` so that
/// relative joins stay below it.
pub fn parse_base_url(url: &str) -> Result<Url, CatalogError> {
    let mut parsed = Url::parse(url).map_err(|source| CatalogError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;
    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }
    parsed.set_query(None);
    parsed.set_fragment(None);
    Ok(parsed)
}

/// Ordered set of known catalogs.
#[derive(Debug, Default)]
pub struct CatalogRegistry {
    descriptors: RwLock<Vec<CatalogDescriptor>>,
}

impl CatalogRegistry {
    pub fn new(descriptors: Vec<CatalogDescriptor>) -> Self {
        Self {
            descriptors: RwLock::new(descriptors),
        }
    }

    /// Adds `descriptor`, replacing any entry with the same base URL.
    pub fn register(&self, descriptor: CatalogDescriptor) {
        if let Ok(mut descriptors) = self.descriptors.write() {
            descriptors.retain(|d| d.url != descriptor.url);
            tracing::debug!(url = %descriptor.url, label = %descriptor.label, "catalog registered");
            descriptors.push(descriptor);
        }
    }

    pub fn unregister(&self, url: &Url) -> Option<CatalogDescriptor> {
        let mut descriptors = self.descriptors.write().ok()?;
        let index = descriptors.iter().position(|d| &d.url == url)?;
        Some(descriptors.remove(index))
    }

    pub fn descriptors(&self) -> Vec<CatalogDescriptor> {
        self.descriptors
            .read()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.descriptors.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The catalog whose base URL is the longest prefix of `url`.
    pub fn find_by_url(&self, url: &str) -> Option<CatalogDescriptor> {
        let candidate = Url::parse(url).ok()?;
        let descriptors = self.descriptors.read().ok()?;
        descriptors
            .iter()
            .filter(|d| d.matches(&candidate))
            .max_by_key(|d| d.url.path().len())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> CatalogRegistry {
        CatalogRegistry::new(vec![
            CatalogDescriptor::new("https://marketplace.example.org", "Example").expect("url"),
            CatalogDescriptor::new("https://marketplace.example.org/labs/", "Labs").expect("url"),
            CatalogDescriptor::new("https://other.example.com/", "Other").expect("url"),
        ])
    }

    #[test]
    fn base_urls_are_normalised() {
        let url = parse_base_url("https://m.example.org/api?x=1").expect("url");
        assert_eq!(url.as_str(), "https://m.example.org/api/");
    }

    #[test]
    fn longest_prefix_wins() {
        let registry = registry();
        let found = registry
            .find_by_url("https://marketplace.example.org/labs/content/foo")
            .expect("labs");
        assert_eq!(found.label, "Labs");
        let found = registry
            .find_by_url("http://MARKETPLACE.example.org/content/foo")
            .expect("root");
        assert_eq!(found.label, "Example");
        assert!(registry.find_by_url("https://unknown.example.net/").is_none());
    }

    #[test]
    fn register_replaces_same_url() {
        let registry = registry();
        let replacement =
            CatalogDescriptor::new("https://other.example.com/", "Renamed").expect("url");
        registry.register(replacement.clone());
        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry
                .find_by_url("https://other.example.com/x")
                .expect("other")
                .label,
            "Renamed"
        );
        assert_eq!(registry.unregister(&replacement.url), Some(replacement));
        assert_eq!(registry.len(), 2);
    }
}
