//! Signature verification against a tenant's key set.
//!
//! The protected header is re-read from the token's original compact
//! encoding, never from the parsed claim view, so the bytes that select
//! the key and algorithm are the bytes that were signed. Key selection is
//! strict: an exact `kid` match, or the single-key convenience path when
//! the tenant publishes exactly one key and the deployment allows it. The
//! claimed algorithm must agree with the selected key's type, which closes
//! the classic RSA-key-under-HMAC confusion.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::debug;

use crate::discovery::TenantRecord;
use crate::error::AuthError;
use crate::token::Token;

/// Protected header fields consumed by key selection.
#[derive(Debug, Deserialize)]
struct ProtectedHeader {
    alg: Option<String>,
    kid: Option<String>,
}

/// Verify `token`'s signature against `tenant`'s key set.
///
/// `accept_single_key_without_kid` enables the convenience path for tokens
/// without a `kid` header when the key set holds exactly one key.
///
/// # Errors
///
/// - [`AuthError::Unverifiable`] for a missing or disallowed algorithm,
///   failed key selection, or a key-type/algorithm mismatch.
/// - [`AuthError::InvalidSignature`] when the cryptographic check fails.
pub fn verify_signature(
    token: &Token,
    tenant: &TenantRecord,
    accept_single_key_without_kid: bool,
) -> Result<(), AuthError> {
    let header = decode_protected_header(token.raw())?;

    // Fail early so an unsigned token costs no key-set work.
    let alg = match header.alg.as_deref() {
        None | Some("") => {
            return Err(AuthError::Unverifiable(
                "alg is missing from the JWT header".to_string(),
            ))
        }
        Some(alg) => alg
            .parse::<Algorithm>()
            .map_err(|_| AuthError::Unverifiable(format!("unsupported algorithm {alg}")))?,
    };

    if matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
        return Err(AuthError::Unverifiable(format!(
            "symmetric algorithm {alg:?} is not allowed against a public key set"
        )));
    }

    let jwk = select_key(
        &tenant.keys,
        header.kid.as_deref(),
        accept_single_key_without_kid,
    )?;
    check_key_compatibility(jwk, alg)?;

    let decoding_key = DecodingKey::from_jwk(jwk)
        .map_err(|e| AuthError::Unverifiable(format!("unusable JWK in key set: {e}")))?;

    // Signature only; every claim check is disabled here. Claims are
    // validated separately against the resolved tenant.
    let mut validation = Validation::new(alg);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = std::collections::HashSet::new();

    decode::<serde_json::Value>(token.raw(), &decoding_key, &validation)
        .map_err(|e| AuthError::InvalidSignature(e.to_string()))?;

    debug!(kid = ?header.kid, alg = ?alg, "signature verified");
    Ok(())
}

fn decode_protected_header(raw: &str) -> Result<ProtectedHeader, AuthError> {
    let segment = raw.split('.').next().unwrap_or_default();
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::Malformed(format!("invalid header encoding: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::Malformed(format!("invalid header JSON: {e}")))
}

/// Select the verification key: exact `kid` match, or the sole key when no
/// `kid` is present. With several keys and no `kid` there is nothing an
/// attacker should be able to choose between, so selection fails.
fn select_key<'a>(
    keys: &'a JwkSet,
    kid: Option<&str>,
    accept_single_key: bool,
) -> Result<&'a Jwk, AuthError> {
    match kid {
        Some(kid) => keys.find(kid).ok_or_else(|| {
            AuthError::Unverifiable(format!(
                "kid {kid} is specified in token, but no matching key was provided by the server"
            ))
        }),
        None => match keys.keys.as_slice() {
            [only] if accept_single_key => Ok(only),
            [_] => Err(AuthError::Unverifiable(
                "no kid specified in token and single-key acceptance is disabled".to_string(),
            )),
            keys => Err(AuthError::Unverifiable(format!(
                "no kid specified in token and {} keys available from the server",
                keys.len()
            ))),
        },
    }
}

/// The claimed algorithm must belong to the selected key's family.
fn check_key_compatibility(jwk: &Jwk, alg: Algorithm) -> Result<(), AuthError> {
    let compatible = matches!(
        (&jwk.algorithm, alg),
        (
            AlgorithmParameters::RSA(_),
            Algorithm::RS256
                | Algorithm::RS384
                | Algorithm::RS512
                | Algorithm::PS256
                | Algorithm::PS384
                | Algorithm::PS512,
        ) | (
            AlgorithmParameters::EllipticCurve(_),
            Algorithm::ES256 | Algorithm::ES384,
        ) | (AlgorithmParameters::OctetKeyPair(_), Algorithm::EdDSA)
    );

    if compatible {
        Ok(())
    } else {
        Err(AuthError::Unverifiable(format!(
            "algorithm {alg:?} does not match the selected key's type"
        )))
    }
}
