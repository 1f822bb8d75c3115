//! Middleware configuration.
//!
//! Supplied once at construction and immutable afterward. The embedded
//! `reqwest::Client` is the discovery transport; its timeout bounds every
//! discovery call, so a hung provider surfaces as a discovery failure
//! rather than a stuck request.

use std::time::Duration;

/// Configuration for the authentication middleware.
///
/// # Example
///
/// ```rust
/// use cloudgate_auth::AuthConfig;
/// use std::time::Duration;
///
/// let config = AuthConfig::new("my-client-id", "accounts.example.com")
///     .with_cache_ttl(Duration::from_secs(300));
/// ```
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// OAuth client identifier; tokens must carry it in their audience.
    pub client_id: String,
    /// Trusted issuer host suffix (e.g. `accounts.example.com`).
    pub domain: String,
    /// HTTP client used for OIDC discovery. Its timeout is the discovery
    /// timeout.
    pub http_client: reqwest::Client,
    /// How long a discovered tenant record stays cached. Re-discovery after
    /// expiry is the only key-rotation mechanism.
    pub cache_ttl: Duration,
    /// Clock-skew tolerance applied to `exp` and `iat` checks.
    pub leeway: Duration,
    /// Accept a token without a `kid` header when the tenant publishes
    /// exactly one key. Matches common single-key providers; disable to
    /// require an explicit `kid` on every token.
    pub accept_single_key_without_kid: bool,
}

impl AuthConfig {
    /// Create a configuration with default cache TTL (10 minutes), leeway
    /// (60 seconds), and a discovery client with a 10 second timeout.
    pub fn new(client_id: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            domain: domain.into(),
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("failed to create HTTP client"),
            cache_ttl: Duration::from_secs(600),
            leeway: Duration::from_secs(60),
            accept_single_key_without_kid: true,
        }
    }

    /// Use a caller-supplied discovery transport.
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = client;
        self
    }

    /// Set the tenant cache TTL.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the clock-skew leeway used by both the expiry and claims checks.
    #[must_use]
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Require every token to carry a `kid` header, even against
    /// single-key tenants.
    #[must_use]
    pub fn require_kid(mut self) -> Self {
        self.accept_single_key_without_kid = false;
        self
    }
}
