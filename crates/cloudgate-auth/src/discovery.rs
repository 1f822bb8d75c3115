//! OIDC tenant discovery.
//!
//! A tenant is resolved from its issuer URL in two fetches: the provider
//! metadata document at `/.well-known/openid-configuration`, then the key
//! set at the advertised `jwks_uri`. The [`TenantDiscovery`] trait is the
//! seam between the tenant cache and the transport, so tests can inject
//! counting or failing fakes without a network.
//!
//! The bundled [`OidcDiscovery`] client enforces HTTPS (loopback hosts
//! exempt, for local development), bounds response sizes, and cross-checks
//! the issuer reported by the document against the issuer that was asked
//! for. Request timeouts come from the injected `reqwest::Client`.

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// Discovery failures. Wrapped opaquely into
/// [`AuthError::Unverifiable`](crate::AuthError::Unverifiable) by the
/// tenant cache; the distinction matters for logs, not for callers.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Discovery endpoint is not HTTPS (and not loopback).
    #[error("discovery endpoint must use HTTPS: {0}")]
    InsecureEndpoint(String),

    /// Transport-level failure (connect, timeout, non-success status).
    #[error("discovery request failed: {0}")]
    Http(String),

    /// Response body exceeded the configured size bound.
    #[error("discovery response exceeded {limit} bytes")]
    ResponseTooLarge {
        /// The configured bound.
        limit: usize,
    },

    /// Response was not a parsable metadata or JWKS document.
    #[error("invalid discovery document: {0}")]
    InvalidDocument(String),

    /// The document's issuer does not belong to the issuer that was queried.
    #[error("provider metadata issuer {document} does not match requested issuer {requested}")]
    IssuerMismatch {
        /// Issuer from the metadata document.
        document: String,
        /// Issuer the discovery call was made for.
        requested: String,
    },
}

/// OIDC provider metadata, reduced to the fields this crate consumes.
/// Unknown fields in the document are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderMetadata {
    /// The provider's canonical issuer identifier.
    pub issuer: String,

    /// URL of the provider's JWK Set document.
    pub jwks_uri: String,

    /// URL of the authorization endpoint, when advertised.
    #[serde(default)]
    pub authorization_endpoint: Option<String>,

    /// URL of the token endpoint, when advertised.
    #[serde(default)]
    pub token_endpoint: Option<String>,
}

/// The discovery result cached per issuer: provider metadata plus the
/// published key set. Immutable once constructed; key rotation happens by
/// cache expiry and re-discovery, never by mutating a live record.
#[derive(Debug, Clone)]
pub struct TenantRecord {
    /// Provider metadata as fetched.
    pub metadata: ProviderMetadata,
    /// Public signing keys published by the tenant.
    pub keys: JwkSet,
}

impl TenantRecord {
    /// The canonical issuer as reported by the provider itself.
    pub fn issuer(&self) -> &str {
        &self.metadata.issuer
    }
}

/// Resolves an issuer URL to a [`TenantRecord`].
#[async_trait]
pub trait TenantDiscovery: Send + Sync {
    /// Fetch provider metadata and key set for `issuer`.
    ///
    /// # Errors
    ///
    /// Any transport, parsing, or consistency failure. Callers must treat
    /// the error as transient: discovery failures are never cached.
    async fn discover(&self, issuer: &Url) -> Result<TenantRecord, DiscoveryError>;
}

/// Default discovery client over `reqwest`.
#[derive(Debug, Clone)]
pub struct OidcDiscovery {
    client: reqwest::Client,
    max_response_size: usize,
}

impl OidcDiscovery {
    /// Default response size bound, generous enough for large key sets.
    pub const DEFAULT_MAX_RESPONSE_SIZE: usize = 64 * 1024;

    /// Create a discovery client over the given transport. The transport's
    /// timeout bounds each discovery fetch.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            max_response_size: Self::DEFAULT_MAX_RESPONSE_SIZE,
        }
    }

    /// Override the response size bound.
    #[must_use]
    pub fn with_max_response_size(mut self, limit: usize) -> Self {
        self.max_response_size = limit;
        self
    }

    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, DiscoveryError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DiscoveryError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::Http(format!(
                "{url} returned status {status}"
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DiscoveryError::Http(e.to_string()))?;
        if body.len() > self.max_response_size {
            return Err(DiscoveryError::ResponseTooLarge {
                limit: self.max_response_size,
            });
        }

        serde_json::from_slice(&body).map_err(|e| DiscoveryError::InvalidDocument(e.to_string()))
    }
}

#[async_trait]
impl TenantDiscovery for OidcDiscovery {
    async fn discover(&self, issuer: &Url) -> Result<TenantRecord, DiscoveryError> {
        require_secure_endpoint(issuer)?;

        let metadata_url = well_known_url(issuer);
        info!(issuer = %issuer, metadata_url = %metadata_url, "fetching provider metadata");
        let metadata: ProviderMetadata = self.fetch_json(&metadata_url).await?;

        check_issuer_consistency(issuer, &metadata.issuer)?;

        let jwks_url = Url::parse(&metadata.jwks_uri)
            .map_err(|e| DiscoveryError::InvalidDocument(format!("bad jwks_uri: {e}")))?;
        require_secure_endpoint(&jwks_url)?;

        debug!(issuer = %issuer, jwks_uri = %metadata.jwks_uri, "fetching key set");
        let keys: JwkSet = self.fetch_json(&metadata.jwks_uri).await?;

        if keys.keys.is_empty() {
            warn!(issuer = %issuer, "tenant published an empty key set");
        }
        info!(
            issuer = %metadata.issuer,
            key_count = keys.keys.len(),
            "tenant discovery complete"
        );

        Ok(TenantRecord { metadata, keys })
    }
}

/// HTTPS required everywhere except loopback, which keeps local test
/// providers reachable.
fn require_secure_endpoint(url: &Url) -> Result<(), DiscoveryError> {
    if url.scheme() == "https" {
        return Ok(());
    }
    let loopback = matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));
    if url.scheme() == "http" && loopback {
        return Ok(());
    }
    Err(DiscoveryError::InsecureEndpoint(url.to_string()))
}

fn well_known_url(issuer: &Url) -> String {
    format!(
        "{}/.well-known/openid-configuration",
        issuer.as_str().trim_end_matches('/')
    )
}

/// The metadata document names its own issuer; it must stay on the host
/// that was asked for, otherwise a compromised document could graft a
/// foreign issuer into the cache.
fn check_issuer_consistency(requested: &Url, document: &str) -> Result<(), DiscoveryError> {
    let mismatch = || DiscoveryError::IssuerMismatch {
        document: document.to_string(),
        requested: requested.to_string(),
    };

    let document_url = Url::parse(document).map_err(|_| mismatch())?;
    if document_url.scheme() != requested.scheme() || document_url.host_str() != requested.host_str()
    {
        return Err(mismatch());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_endpoint_allowed() {
        let url = Url::parse("https://accounts.example.com").unwrap();
        assert!(require_secure_endpoint(&url).is_ok());
    }

    #[test]
    fn test_http_loopback_allowed() {
        for raw in ["http://localhost:8080", "http://127.0.0.1:39000"] {
            let url = Url::parse(raw).unwrap();
            assert!(require_secure_endpoint(&url).is_ok(), "{raw}");
        }
    }

    #[test]
    fn test_plain_http_rejected() {
        let url = Url::parse("http://accounts.example.com").unwrap();
        assert!(matches!(
            require_secure_endpoint(&url),
            Err(DiscoveryError::InsecureEndpoint(_))
        ));
    }

    #[test]
    fn test_well_known_url_strips_trailing_slash() {
        let issuer = Url::parse("https://tenant.accounts.example.com/").unwrap();
        assert_eq!(
            well_known_url(&issuer),
            "https://tenant.accounts.example.com/.well-known/openid-configuration"
        );
    }

    #[test]
    fn test_well_known_url_keeps_path() {
        let issuer = Url::parse("https://accounts.example.com/oauth2").unwrap();
        assert_eq!(
            well_known_url(&issuer),
            "https://accounts.example.com/oauth2/.well-known/openid-configuration"
        );
    }

    #[test]
    fn test_issuer_consistency_accepts_formatting_differences() {
        let requested = Url::parse("https://tenant.accounts.example.com/").unwrap();
        assert!(check_issuer_consistency(&requested, "https://tenant.accounts.example.com").is_ok());
    }

    #[test]
    fn test_issuer_consistency_rejects_foreign_host() {
        let requested = Url::parse("https://tenant.accounts.example.com").unwrap();
        let err =
            check_issuer_consistency(&requested, "https://attacker.net").unwrap_err();
        assert!(matches!(err, DiscoveryError::IssuerMismatch { .. }));
    }

    #[test]
    fn test_issuer_consistency_rejects_scheme_downgrade() {
        let requested = Url::parse("https://tenant.accounts.example.com").unwrap();
        let err = check_issuer_consistency(&requested, "http://tenant.accounts.example.com")
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::IssuerMismatch { .. }));
    }

    #[test]
    fn test_provider_metadata_ignores_unknown_fields() {
        let metadata: ProviderMetadata = serde_json::from_value(serde_json::json!({
            "issuer": "https://tenant.accounts.example.com",
            "jwks_uri": "https://tenant.accounts.example.com/jwks",
            "response_types_supported": ["code"],
            "subject_types_supported": ["public"],
        }))
        .unwrap();
        assert_eq!(metadata.issuer, "https://tenant.accounts.example.com");
        assert!(metadata.authorization_endpoint.is_none());
    }
}
