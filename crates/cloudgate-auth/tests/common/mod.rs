//! Shared integration-test fixtures: a wiremock-backed OIDC provider
//! serving the well-known metadata document and a JWKS built from the
//! deterministic test key.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cloudgate_auth::testutil::test_jwk;

pub const CLIENT_ID: &str = "client-abc";

/// A mock OIDC provider. Its issuer is the mock server's loopback URI, so
/// tests configure the trusted domain as `127.0.0.1`.
pub struct MockOidcProvider {
    pub server: MockServer,
}

impl MockOidcProvider {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// The issuer string tokens should carry, e.g. `http://127.0.0.1:39041`.
    pub fn issuer(&self) -> String {
        self.server.uri()
    }

    fn metadata_document(&self) -> serde_json::Value {
        json!({
            "issuer": self.issuer(),
            "jwks_uri": format!("{}/jwks", self.issuer()),
            "authorization_endpoint": format!("{}/authorize", self.issuer()),
            "token_endpoint": format!("{}/token", self.issuer()),
        })
    }

    fn jwks_document(kids: &[&str]) -> serde_json::Value {
        json!({ "keys": kids.iter().map(|kid| test_jwk(kid)).collect::<Vec<_>>() })
    }

    /// Serve metadata and JWKS without call-count expectations.
    pub async fn mount(&self, kids: &[&str]) {
        self.mount_expecting(kids, None, Duration::ZERO).await;
    }

    /// Serve metadata and JWKS, asserting each endpoint is fetched exactly
    /// `expected_fetches` times over the provider's lifetime. An optional
    /// response delay widens the window for concurrency tests.
    pub async fn mount_expecting(
        &self,
        kids: &[&str],
        expected_fetches: Option<u64>,
        delay: Duration,
    ) {
        let mut metadata = Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(delay)
                    .set_body_json(self.metadata_document()),
            );
        let mut jwks = Mock::given(method("GET")).and(path("/jwks")).respond_with(
            ResponseTemplate::new(200)
                .set_delay(delay)
                .set_body_json(Self::jwks_document(kids)),
        );
        if let Some(expected) = expected_fetches {
            metadata = metadata.expect(expected);
            jwks = jwks.expect(expected);
        }
        metadata.mount(&self.server).await;
        jwks.mount(&self.server).await;
    }

    /// Serve a failing metadata endpoint, asserting it is hit exactly
    /// `expected_fetches` times (discovery failures must be retried, never
    /// cached).
    pub async fn mount_failing(&self, expected_fetches: u64) {
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(503))
            .expect(expected_fetches)
            .mount(&self.server)
            .await;
    }

    /// Assert no discovery traffic reached this provider at all.
    pub async fn mount_expecting_no_traffic(&self) {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&self.server)
            .await;
    }

    pub async fn verify(&self) {
        self.server.verify().await;
    }
}
