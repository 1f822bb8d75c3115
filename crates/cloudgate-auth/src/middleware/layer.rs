//! Tower Layer implementation for bearer authentication.

use std::sync::Arc;

use tower::Layer;

use super::service::{BearerAuthService, RejectionHandler};
use crate::authenticator::Authenticator;
use crate::error::AuthError;

/// Tower Layer that adds bearer-token authentication to services.
///
/// # Example
///
/// ```rust,ignore
/// use tower::ServiceBuilder;
/// use cloudgate_auth::BearerAuthLayer;
///
/// let service = ServiceBuilder::new()
///     .layer(BearerAuthLayer::new(authenticator))
///     .service(my_inner_service);
/// ```
#[derive(Clone)]
pub struct BearerAuthLayer {
    authenticator: Arc<Authenticator>,
    error_handler: Option<RejectionHandler>,
}

impl BearerAuthLayer {
    /// Create a layer with the default rejection response (401 with a
    /// `WWW-Authenticate: Bearer` header).
    pub fn new(authenticator: Authenticator) -> Self {
        Self::from_arc(Arc::new(authenticator))
    }

    /// Create a layer from an already shared authenticator.
    pub fn from_arc(authenticator: Arc<Authenticator>) -> Self {
        Self {
            authenticator,
            error_handler: None,
        }
    }

    /// Install a custom rejection handler. The handler fully controls the
    /// rejection response; the request is still denied regardless of what
    /// it returns.
    #[must_use]
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&AuthError, &http::request::Parts) -> http::Response<String>
            + Send
            + Sync
            + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }
}

impl<S> Layer<S> for BearerAuthLayer {
    type Service = BearerAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BearerAuthService::new(
            inner,
            Arc::clone(&self.authenticator),
            self.error_handler.clone(),
        )
    }
}

impl std::fmt::Debug for BearerAuthLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuthLayer")
            .field("authenticator", &self.authenticator)
            .field("error_handler", &self.error_handler.as_ref().map(|_| "<custom>"))
            .finish()
    }
}
