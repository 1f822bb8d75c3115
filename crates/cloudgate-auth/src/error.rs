//! Authentication error taxonomy.
//!
//! Every pipeline stage maps its failures onto one variant of [`AuthError`].
//! The enum is `Clone` because a failed tenant discovery is shared verbatim
//! with every request joined to the same in-flight lookup.

use thiserror::Error;

/// Errors produced by the token validation pipeline.
///
/// All variants are request-scoped; none is fatal to the process. A
/// discovery failure surfaces as [`AuthError::Unverifiable`] and is retried
/// naturally on the next request because failures are never cached.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// The raw token is not a structurally valid compact JWT.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The issuer host lies outside the configured trust domain.
    #[error("token is unverifiable: unknown issuer host {0} (domain doesn't match)")]
    UntrustedIssuer(String),

    /// The token cannot be verified: unparsable issuer URI, failed
    /// discovery, ambiguous or missing key selection, or a missing or
    /// disallowed algorithm.
    #[error("token is unverifiable: {0}")]
    Unverifiable(String),

    /// Cryptographic signature mismatch.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// The token is expired, or carries no `exp` claim at all.
    #[error("token is expired{}", fmt_expiration(.expiration))]
    Expired {
        /// The `exp` claim value (unix seconds), if the token had one.
        expiration: Option<u64>,
    },

    /// Audience, issuer, or issued-at validation failed.
    #[error("claim validation failed: {0}")]
    ClaimValidation(String),
}

fn fmt_expiration(expiration: &Option<u64>) -> String {
    match expiration {
        Some(exp) => format!(", exp: {exp}"),
        None => String::from(" (no exp claim)"),
    }
}
