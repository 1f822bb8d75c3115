//! # Cloudgate Auth - Multi-Tenant Bearer JWT Middleware
//!
//! Request authentication for multi-tenant cloud services: every incoming
//! bearer JWT names its issuer, and the middleware dynamically resolves
//! that issuer to an OIDC tenant: trust-checking the issuer's host,
//! discovering provider metadata and signing keys (cached, with
//! single-flight deduplication under concurrent load), verifying the
//! signature with strict key selection, and validating claims with precise
//! clock-skew semantics.
//!
//! ## Pipeline
//!
//! ```text
//! parse → issuer-verify → tenant-resolve → signature-verify → claims-validate
//! ```
//!
//! Each request runs the pipeline once, synchronously, short-circuiting on
//! the first failure. The tenant cache is the only state shared between
//! requests; everything else is per-request and immutable.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use cloudgate_auth::{AuthConfig, Authenticator, BearerAuthLayer};
//! use tower::ServiceBuilder;
//!
//! let authenticator = Authenticator::new(AuthConfig::new(
//!     "my-client-id",            // expected audience
//!     "accounts.example.com",    // trusted issuer domain
//! ));
//!
//! let service = ServiceBuilder::new()
//!     .layer(BearerAuthLayer::new(authenticator))
//!     .service_fn(|req: http::Request<String>| async move {
//!         let token = req.extensions().get::<cloudgate_auth::Token>();
//!         Ok::<_, std::convert::Infallible>(http::Response::new(format!(
//!             "hello {}",
//!             token.and_then(|t| t.email()).unwrap_or("stranger")
//!         )))
//!     });
//! ```
//!
//! ## Security posture
//!
//! - The issuer trust check runs before any cache lookup or network call,
//!   so an attacker-controlled `iss` claim cannot steer discovery or
//!   poison the cache.
//! - Signature verification re-reads the protected header from the
//!   original compact encoding, rejects missing/`none`/symmetric
//!   algorithms, requires an exact `kid` match (or a single published
//!   key), and cross-checks the key type against the claimed algorithm.
//! - Expiry is computed independently of any JWT library: a token without
//!   an `exp` claim is expired, not eternal.
//!
//! ## Modules
//!
//! - [`token`] - compact JWT parsing and claim access
//! - [`issuer`] - issuer trust-domain verification
//! - [`discovery`] - OIDC provider metadata and JWKS fetching
//! - [`cache`] - tenant cache with single-flight deduplication
//! - [`verify`] - signature verification and key selection
//! - [`claims`] - claims validation
//! - [`authenticator`] - the per-request pipeline
//! - [`middleware`] - Tower `Layer`/`Service` integration

pub mod authenticator;
pub mod cache;
pub mod claims;
pub mod config;
pub mod discovery;
pub mod error;
pub mod issuer;
pub mod middleware;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
pub mod token;
pub mod verify;

#[doc(inline)]
pub use authenticator::Authenticator;
#[doc(inline)]
pub use cache::TenantCache;
#[doc(inline)]
pub use config::AuthConfig;
#[doc(inline)]
pub use discovery::{OidcDiscovery, ProviderMetadata, TenantDiscovery, TenantRecord};
#[doc(inline)]
pub use error::AuthError;
#[doc(inline)]
pub use middleware::{BearerAuthLayer, BearerAuthService, RejectionHandler};
#[doc(inline)]
pub use token::Token;
