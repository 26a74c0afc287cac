//! Marketplace access tokens in the OS keyring.
//!
//! Entries live under the service name `mpc`, one per catalog host, so a
//! token issued by one marketplace is never sent to another.

use thiserror::Error;
use url::Url;

const SERVICE_NAME: &str = "mpc";

#[derive(Debug, Error)]
pub enum SecretsError {
    #[error("no credential stored for {key}")]
    NotFound { key: String },
    #[error("catalog url {0} has no host")]
    MissingHost(String),
    #[error("keyring access denied: {0}")]
    AccessDenied(String),
    #[error("keyring unavailable: {0}")]
    Unavailable(String),
    #[error("keyring error: {0}")]
    Other(String),
}

impl From<keyring::Error> for SecretsError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::NoEntry => SecretsError::NotFound {
                key: "unknown".into(),
            },
            keyring::Error::NoStorageAccess(e) => SecretsError::AccessDenied(e.to_string()),
            keyring::Error::PlatformFailure(e) => SecretsError::Unavailable(e.to_string()),
            other => SecretsError::Other(other.to_string()),
        }
    }
}

pub type SecretsResult<T> = Result<T, SecretsError>;

#[derive(Debug, Clone)]
pub struct CredentialStore {
    service: String,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.into(),
        }
    }

    fn token_key(catalog: &Url) -> SecretsResult<String> {
        let host = catalog
            .host_str()
            .ok_or_else(|| SecretsError::MissingHost(catalog.to_string()))?;
        Ok(format!("{}/access_token", host.to_ascii_lowercase()))
    }

    pub fn store_access_token(&self, catalog: &Url, token: &str) -> SecretsResult<()> {
        let key = Self::token_key(catalog)?;
        keyring::Entry::new(&self.service, &key)?.set_password(token)?;
        tracing::debug!(%key, "stored marketplace token");
        Ok(())
    }

    pub fn access_token(&self, catalog: &Url) -> SecretsResult<String> {
        let key = Self::token_key(catalog)?;
        match keyring::Entry::new(&self.service, &key)?.get_password() {
            Ok(token) => Ok(token),
            Err(keyring::Error::NoEntry) => Err(SecretsError::NotFound { key }),
            Err(e) => Err(e.into()),
        }
    }

    /// Succeeds when no token was stored.
    pub fn delete_access_token(&self, catalog: &Url) -> SecretsResult<()> {
        let key = Self::token_key(catalog)?;
        match keyring::Entry::new(&self.service, &key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Keyring token for `catalog`, falling back to `configured` when the
    /// keyring has none or cannot be reached. The configured token belongs
    /// to `configured_for` and is only handed out for that origin.
    pub fn resolve_access_token(
        &self,
        catalog: &Url,
        configured: Option<&str>,
        configured_for: &Url,
    ) -> Option<String> {
        let fallback = || scoped_token(catalog, configured, configured_for).map(str::to_string);
        match self.access_token(catalog) {
            Ok(token) => Some(token),
            Err(SecretsError::NotFound { .. }) => fallback(),
            Err(e) => {
                tracing::warn!(error = %e, "keyring lookup failed, using configured token");
                fallback()
            }
        }
    }
}

/// `token` when `catalog` shares scheme, host and port with `issuer`.
fn scoped_token<'a>(catalog: &Url, token: Option<&'a str>, issuer: &Url) -> Option<&'a str> {
    let token = token?;
    if catalog.origin() == issuer.origin() {
        Some(token)
    } else {
        tracing::debug!(catalog = %catalog, "configured token withheld from foreign catalog");
        None
    }
}
