//! Compact JWT parsing and read-only claim access.
//!
//! [`Token::parse`] performs structural decoding only; no signature or
//! claim validation happens here. The original compact encoding is retained
//! unchanged so that signature verification always operates on the exact
//! bytes the issuer signed, never on a re-serialized claim set.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Deserialize;
use serde_json::Value;

use crate::error::AuthError;

/// Typed view over the registered claims this crate depends on.
///
/// Everything else stays available through the raw claim map; see
/// [`Token::claim`].
#[derive(Debug, Clone, Deserialize)]
struct ClaimSet {
    iss: Option<String>,
    sub: Option<String>,
    #[serde(default, deserialize_with = "deserialize_audience")]
    aud: Vec<String>,
    exp: Option<u64>,
    iat: Option<u64>,
    email: Option<String>,
}

/// The `aud` claim may be a single JSON string or an array of strings
/// (RFC 7519 §4.1.3); both forms normalize to a set here.
fn deserialize_audience<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Audience {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<Audience>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Audience::One(aud)) => vec![aud],
        Some(Audience::Many(auds)) => auds,
    })
}

/// A parsed bearer token.
///
/// Created once per incoming request from the `Authorization` header and
/// dropped at the end of the request. Claims are immutable after
/// construction; the token is `Clone + Send + Sync` and safe to read
/// concurrently, so it can travel through request extensions untouched.
#[derive(Debug, Clone)]
pub struct Token {
    raw: String,
    claims: ClaimSet,
    claim_map: serde_json::Map<String, Value>,
}

impl Token {
    /// Parse a compact JWT into its claim view.
    ///
    /// Checks structure only: three dot-separated segments, valid base64url,
    /// JSON-object header and payload. The signature segment is not decoded
    /// here; that is the signature verifier's job, and it re-reads the
    /// original encoding via [`Token::raw`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Malformed`] for any structural defect.
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        let segments: Vec<&str> = raw.split('.').collect();
        if segments.len() != 3 {
            return Err(AuthError::Malformed(format!(
                "expected 3 token segments, got {}",
                segments.len()
            )));
        }

        // The header must decode even though its fields are consumed later:
        // a token whose header is garbage is malformed, not unverifiable.
        let header = decode_segment(segments[0], "header")?;
        if !header.is_object() {
            return Err(AuthError::Malformed(
                "token header is not a JSON object".to_string(),
            ));
        }

        let payload = decode_segment(segments[1], "payload")?;
        let claim_map = match payload {
            Value::Object(map) => map,
            _ => {
                return Err(AuthError::Malformed(
                    "token payload is not a JSON object".to_string(),
                ))
            }
        };

        let claims: ClaimSet = serde_json::from_value(Value::Object(claim_map.clone()))
            .map_err(|e| AuthError::Malformed(format!("unparsable claim set: {e}")))?;

        Ok(Self {
            raw: raw.to_string(),
            claims,
            claim_map,
        })
    }

    /// The original compact encoding, exactly as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The `iss` claim.
    pub fn issuer(&self) -> Option<&str> {
        self.claims.iss.as_deref()
    }

    /// The `sub` claim.
    pub fn subject(&self) -> Option<&str> {
        self.claims.sub.as_deref()
    }

    /// The `email` claim.
    pub fn email(&self) -> Option<&str> {
        self.claims.email.as_deref()
    }

    /// The audience set. Empty when the token carries no `aud` claim.
    pub fn audience(&self) -> &[String] {
        &self.claims.aud
    }

    /// The `exp` claim in unix seconds, if present.
    pub fn expiration(&self) -> Option<u64> {
        self.claims.exp
    }

    /// The `iat` claim in unix seconds, if present.
    pub fn issued_at(&self) -> Option<u64> {
        self.claims.iat
    }

    /// Look up an arbitrary claim by name.
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claim_map.get(name)
    }

    /// Whether the token is expired at `now`, given the configured leeway.
    ///
    /// Computed here rather than delegated to a JWT library so that a
    /// missing `exp` claim is treated as expired; absence must never read
    /// as "valid forever". The same leeway value is used by the claims
    /// validator, so the two checks cannot disagree.
    pub fn is_expired(&self, now: SystemTime, leeway: Duration) -> bool {
        let Some(exp) = self.claims.exp else {
            return true;
        };
        let now_secs = now
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        now_secs > exp.saturating_add(leeway.as_secs())
    }
}

fn decode_segment(segment: &str, what: &str) -> Result<Value, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::Malformed(format!("invalid {what} encoding: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::Malformed(format!("invalid {what} JSON: {e}")))
}
