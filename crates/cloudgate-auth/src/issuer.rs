//! Issuer trust-domain verification.
//!
//! Runs strictly before any cache lookup or network call keyed by the
//! claimed issuer. An attacker-controlled `iss` claim must never be able to
//! steer discovery toward an arbitrary host or poison the tenant cache, so
//! the trust decision is made on nothing but the configured domain suffix.

use url::Url;

use crate::error::AuthError;

/// Verify that `claimed` parses as a URL whose host belongs to the trusted
/// `domain` suffix, and return the parsed URL for discovery.
///
/// Suffix matching is label-aware: `tenant.accounts.example.com` matches
/// the suffix `accounts.example.com`, but `evil-accounts.example.com` does
/// not. A `domain` value with a leading dot matches subdomains only.
///
/// # Errors
///
/// - [`AuthError::Unverifiable`] when `claimed` is not a parsable URL or
///   has no host component.
/// - [`AuthError::UntrustedIssuer`] when the host falls outside `domain`.
pub fn verify_issuer(claimed: &str, domain: &str) -> Result<Url, AuthError> {
    let issuer = Url::parse(claimed).map_err(|e| {
        AuthError::Unverifiable(format!("unable to parse issuer URI {claimed}: {e}"))
    })?;

    let host = issuer
        .host_str()
        .ok_or_else(|| AuthError::Unverifiable(format!("issuer URI {claimed} has no host")))?;

    if !host_in_domain(host, domain) {
        return Err(AuthError::UntrustedIssuer(host.to_string()));
    }

    Ok(issuer)
}

fn host_in_domain(host: &str, domain: &str) -> bool {
    if domain.is_empty() {
        return false;
    }
    if let Some(suffix) = domain.strip_prefix('.') {
        return host.len() > suffix.len() && host.ends_with(suffix)
            && host.as_bytes()[host.len() - suffix.len() - 1] == b'.';
    }
    host == domain || host.ends_with(&format!(".{domain}"))
}
