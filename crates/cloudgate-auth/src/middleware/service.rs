//! Tower Service implementation for bearer authentication.
//!
//! The service works with any `http::Request<B>` whose inner service
//! produces `http::Response<ResBody>` where `ResBody: From<String>`. That
//! covers `String` bodies in tests and framework body types like
//! `axum::body::Body` in applications.
//!
//! The security contract is enforced here: on any validation failure the
//! inner service is never called and no token extension is attached,
//! whatever the rejection handler renders.

use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use tower_service::Service;
use tracing::warn;

use crate::authenticator::Authenticator;
use crate::error::AuthError;

/// Pluggable rejection rendering: receives the validation error and the
/// request head, returns the full wire-level response.
pub type RejectionHandler =
    Arc<dyn Fn(&AuthError, &http::request::Parts) -> http::Response<String> + Send + Sync>;

/// Tower Service that authenticates bearer tokens.
///
/// On success the validated [`Token`](crate::Token) is inserted into the
/// request's extensions before the inner service runs.
pub struct BearerAuthService<S> {
    inner: S,
    authenticator: Arc<Authenticator>,
    error_handler: Option<RejectionHandler>,
}

impl<S> BearerAuthService<S> {
    /// Create a new service wrapping `inner`.
    pub fn new(
        inner: S,
        authenticator: Arc<Authenticator>,
        error_handler: Option<RejectionHandler>,
    ) -> Self {
        Self {
            inner,
            authenticator,
            error_handler,
        }
    }

    /// Get a reference to the inner service.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: Clone> Clone for BearerAuthService<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            authenticator: Arc::clone(&self.authenticator),
            error_handler: self.error_handler.clone(),
        }
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for BearerAuthService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuthService")
            .field("inner", &self.inner)
            .field("authenticator", &self.authenticator)
            .finish_non_exhaustive()
    }
}

impl<S, B, ResBody> Service<http::Request<B>> for BearerAuthService<S>
where
    S: Service<http::Request<B>, Response = http::Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    B: Send + 'static,
    ResBody: From<String>,
{
    type Response = http::Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        let authenticator = Arc::clone(&self.authenticator);
        let error_handler = self.error_handler.clone();
        let inner = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, inner);

        Box::pin(async move {
            let header = req
                .headers()
                .get(http::header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);

            let outcome = match extract_bearer(header.as_deref()) {
                Ok(raw) => authenticator.authenticate(&raw).await,
                Err(err) => Err(err),
            };

            match outcome {
                Ok(token) => {
                    req.extensions_mut().insert(token);
                    inner.call(req).await
                }
                Err(err) => {
                    warn!(error = %err, "rejecting unauthenticated request");
                    let (parts, _body) = req.into_parts();
                    let response = match error_handler.as_ref() {
                        Some(handler) => handler(&err, &parts),
                        None => default_rejection(&err),
                    };
                    Ok(response.map(ResBody::from))
                }
            }
        })
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
fn extract_bearer(header: Option<&str>) -> Result<String, AuthError> {
    let header = header
        .ok_or_else(|| AuthError::Malformed("missing Authorization header".to_string()))?;

    let parts: Vec<&str> = header.split_whitespace().collect();
    if parts.len() != 2 {
        return Err(AuthError::Malformed(
            "Authorization header must have format: Bearer <token>".to_string(),
        ));
    }
    if !parts[0].eq_ignore_ascii_case("bearer") {
        return Err(AuthError::Malformed(
            "only Bearer token authentication is supported".to_string(),
        ));
    }
    Ok(parts[1].to_string())
}

fn default_rejection(err: &AuthError) -> http::Response<String> {
    http::Response::builder()
        .status(http::StatusCode::UNAUTHORIZED)
        .header(http::header::WWW_AUTHENTICATE, "Bearer error=\"invalid_token\"")
        .header(http::header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(err.to_string())
        .expect("static response parts are valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::discovery::{DiscoveryError, TenantDiscovery, TenantRecord};
    use crate::testutil::{sign_token, tenant_record};
    use crate::middleware::BearerAuthLayer;
    use crate::token::Token;
    use async_trait::async_trait;
    use serde_json::json;
    use std::convert::Infallible;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tower::{Layer, ServiceExt};
    use url::Url;

    const ISSUER: &str = "https://t1.accounts.example.com";
    const CLIENT_ID: &str = "client-abc";

    /// Discovery that must never run; every test tenant is pre-seeded.
    struct NeverDiscover;

    #[async_trait]
    impl TenantDiscovery for NeverDiscover {
        async fn discover(&self, _issuer: &Url) -> Result<TenantRecord, DiscoveryError> {
            panic!("discovery must not run in seeded tests");
        }
    }

    async fn seeded_authenticator() -> Authenticator {
        let config = AuthConfig::new(CLIENT_ID, "accounts.example.com");
        let auth = Authenticator::with_discovery(config, Arc::new(NeverDiscover));
        auth.seed_tenant(tenant_record(ISSUER, &["k1"])).await;
        auth
    }

    fn valid_token() -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        sign_token(
            &json!({"iss": ISSUER, "sub": "user-1", "aud": CLIENT_ID, "exp": now + 3600}),
            Some("k1"),
        )
    }

    fn echo_subject_service(
    ) -> impl Service<
        http::Request<String>,
        Response = http::Response<String>,
        Error = Infallible,
        Future: Send,
    > + Clone
           + Send
           + 'static {
        tower::service_fn(|req: http::Request<String>| async move {
            let subject = req
                .extensions()
                .get::<Token>()
                .and_then(|token| token.subject())
                .unwrap_or("<anonymous>")
                .to_string();
            Ok::<_, Infallible>(http::Response::new(subject))
        })
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(Some("Bearer abc")).unwrap(), "abc");
        assert_eq!(extract_bearer(Some("bearer abc")).unwrap(), "abc");
    }

    #[test]
    fn test_extract_bearer_missing_header() {
        let err = extract_bearer(None).unwrap_err();
        assert!(matches!(err, AuthError::Malformed(_)));
    }

    #[test]
    fn test_extract_bearer_wrong_scheme() {
        let err = extract_bearer(Some("Basic dXNlcjpwYXNz")).unwrap_err();
        assert!(matches!(err, AuthError::Malformed(_)));
    }

    #[test]
    fn test_extract_bearer_wrong_shape() {
        let err = extract_bearer(Some("Bearer")).unwrap_err();
        assert!(matches!(err, AuthError::Malformed(_)));
        let err = extract_bearer(Some("Bearer a b")).unwrap_err();
        assert!(matches!(err, AuthError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_valid_token_reaches_inner_service() {
        let layer = BearerAuthLayer::new(seeded_authenticator().await);
        let service = layer.layer(echo_subject_service());

        let request = http::Request::builder()
            .header(http::header::AUTHORIZATION, format!("Bearer {}", valid_token()))
            .body(String::new())
            .unwrap();

        let response = service.oneshot(request).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(response.body(), "user-1");
    }

    #[tokio::test]
    async fn test_missing_header_rejected_with_default_response() {
        let layer = BearerAuthLayer::new(seeded_authenticator().await);
        let service = layer.layer(echo_subject_service());

        let request = http::Request::builder().body(String::new()).unwrap();
        let response = service.oneshot(request).await.unwrap();

        assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(http::header::WWW_AUTHENTICATE));
        assert!(response.body().contains("malformed token"));
    }

    #[tokio::test]
    async fn test_invalid_token_never_calls_inner_service() {
        async fn unreachable_inner(
            _req: http::Request<String>,
        ) -> Result<http::Response<String>, Infallible> {
            panic!("inner service must not run for rejected requests");
        }

        let layer = BearerAuthLayer::new(seeded_authenticator().await);
        let service = layer.layer(tower::service_fn(unreachable_inner));

        let request = http::Request::builder()
            .header(http::header::AUTHORIZATION, "Bearer not-a-jwt")
            .body(String::new())
            .unwrap();

        let response = service.oneshot(request).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_custom_error_handler_controls_response() {
        let layer = BearerAuthLayer::new(seeded_authenticator().await).with_error_handler(
            |err, parts| {
                http::Response::builder()
                    .status(http::StatusCode::FORBIDDEN)
                    .body(format!("{} {}: {err}", parts.method, parts.uri))
                    .expect("static response parts are valid")
            },
        );
        let service = layer.layer(echo_subject_service());

        let request = http::Request::builder()
            .uri("/protected")
            .body(String::new())
            .unwrap();
        let response = service.oneshot(request).await.unwrap();

        assert_eq!(response.status(), http::StatusCode::FORBIDDEN);
        assert!(response.body().starts_with("GET /protected"));
    }
}
