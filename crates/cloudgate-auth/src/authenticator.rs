//! The per-request validation pipeline.
//!
//! `parse → issuer-verify → tenant-resolve → signature-verify →
//! claims-validate`, synchronous and single-pass. Any stage failure
//! short-circuits the rest; nothing is retried (the single-flight join in
//! the cache is a wait-and-share, not a retry).

use std::sync::Arc;
use std::time::SystemTime;

use tracing::debug;

use crate::cache::TenantCache;
use crate::claims::validate_claims;
use crate::config::AuthConfig;
use crate::discovery::{OidcDiscovery, TenantDiscovery, TenantRecord};
use crate::error::AuthError;
use crate::issuer::verify_issuer;
use crate::token::Token;
use crate::verify::verify_signature;

/// Validates bearer tokens against dynamically discovered tenants.
///
/// Owns the tenant cache (created at construction, dropped with the
/// process) and the discovery client. Cheap to share behind an `Arc`; the
/// Tower layer does exactly that.
pub struct Authenticator {
    config: AuthConfig,
    cache: TenantCache,
    discovery: Arc<dyn TenantDiscovery>,
}

impl Authenticator {
    /// Create an authenticator using the bundled OIDC discovery client
    /// over the configured HTTP transport.
    pub fn new(config: AuthConfig) -> Self {
        let discovery = Arc::new(OidcDiscovery::new(config.http_client.clone()));
        Self::with_discovery(config, discovery)
    }

    /// Create an authenticator with a custom discovery implementation.
    pub fn with_discovery(config: AuthConfig, discovery: Arc<dyn TenantDiscovery>) -> Self {
        let cache = TenantCache::new(config.cache_ttl);
        Self {
            config,
            cache,
            discovery,
        }
    }

    /// The configuration this authenticator was built with.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Pre-populate the tenant cache, keyed by the record's canonical
    /// issuer. Useful for statically known tenants and for tests.
    pub async fn seed_tenant(&self, record: TenantRecord) {
        self.cache.seed(record).await;
    }

    /// Run the full validation pipeline over a raw compact JWT.
    ///
    /// # Errors
    ///
    /// The first failing stage's [`AuthError`]; see the crate-level error
    /// taxonomy.
    pub async fn authenticate(&self, raw: &str) -> Result<Token, AuthError> {
        let token = Token::parse(raw)?;

        let issuer = token
            .issuer()
            .ok_or_else(|| AuthError::Unverifiable("token has no iss claim".to_string()))?
            .to_string();

        // Trust check before any cache or network interaction keyed by the
        // attacker-controlled issuer string.
        let issuer_url = verify_issuer(&issuer, &self.config.domain)?;

        let tenant = self
            .cache
            .resolve(&issuer, &issuer_url, Arc::clone(&self.discovery))
            .await?;

        verify_signature(&token, &tenant, self.config.accept_single_key_without_kid)?;

        validate_claims(
            &token,
            &tenant,
            &self.config.client_id,
            self.config.leeway,
            SystemTime::now(),
        )?;

        debug!(
            issuer = %issuer,
            subject = ?token.subject(),
            "token authenticated"
        );
        Ok(token)
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
