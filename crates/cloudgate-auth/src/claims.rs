//! Claims validation against the resolved tenant.
//!
//! Runs after signature verification. The expiry check comes first and is
//! computed by [`Token::is_expired`] with the same leeway used here for
//! `iat`, so the expiry and skew checks can never disagree about whether a
//! token is within tolerance.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::discovery::TenantRecord;
use crate::error::AuthError;
use crate::token::Token;

/// Validate `token`'s claims: expiry, audience, issuer, issued-at.
///
/// The issuer comparison uses the tenant's canonical provider issuer from
/// discovery, not the raw string the request carried.
///
/// # Errors
///
/// - [`AuthError::Expired`] when the token is past its `exp` (plus leeway)
///   or has no `exp` at all.
/// - [`AuthError::ClaimValidation`] for an audience, issuer, or `iat`
///   mismatch.
pub fn validate_claims(
    token: &Token,
    tenant: &TenantRecord,
    client_id: &str,
    leeway: Duration,
    now: SystemTime,
) -> Result<(), AuthError> {
    if token.is_expired(now, leeway) {
        return Err(AuthError::Expired {
            expiration: token.expiration(),
        });
    }

    if !token.audience().iter().any(|aud| aud == client_id) {
        return Err(AuthError::ClaimValidation(format!(
            "audience {:?} does not contain client id {client_id}",
            token.audience()
        )));
    }

    let canonical = tenant.issuer();
    if token.issuer() != Some(canonical) {
        return Err(AuthError::ClaimValidation(format!(
            "issuer {:?} does not match provider issuer {canonical}",
            token.issuer()
        )));
    }

    // Symmetric skew window: iat may sit slightly in the future, but no
    // further than the same leeway applied to exp.
    if let Some(iat) = token.issued_at() {
        let now_secs = now
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        if iat > now_secs.saturating_add(leeway.as_secs()) {
            return Err(AuthError::ClaimValidation(format!(
                "token issued in the future, iat: {iat}"
            )));
        }
    }

    Ok(())
}
