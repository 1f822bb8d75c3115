//! Tower middleware integration.
//!
//! [`BearerAuthLayer`] wraps services with [`BearerAuthService`], which
//! extracts the bearer token from the `Authorization` header, runs the full
//! validation pipeline, and either forwards the request with the validated
//! [`Token`](crate::Token) attached to its extensions or produces a
//! rejection response.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tower::ServiceBuilder;
//! use cloudgate_auth::{AuthConfig, Authenticator, BearerAuthLayer};
//!
//! let authenticator = Authenticator::new(AuthConfig::new(
//!     "my-client-id",
//!     "accounts.example.com",
//! ));
//!
//! let service = ServiceBuilder::new()
//!     .layer(BearerAuthLayer::new(authenticator))
//!     .service(my_inner_service);
//! ```
//!
//! ## Request extensions
//!
//! On success the validated token is inserted into the request's
//! extensions, typed by `Token` itself:
//!
//! ```rust,ignore
//! if let Some(token) = req.extensions().get::<cloudgate_auth::Token>() {
//!     println!("authenticated subject: {:?}", token.subject());
//! }
//! ```
//!
//! ## Rejections
//!
//! A rejected request never reaches the inner service and never carries a
//! token extension. The default rejection is `401 Unauthorized` with a
//! `WWW-Authenticate: Bearer` header and the error message as body; a
//! custom [`RejectionHandler`] takes full control of the response when
//! configured.

mod layer;
mod service;

pub use layer::BearerAuthLayer;
pub use service::{BearerAuthService, RejectionHandler};
