//! Shared test utilities for token validation testing.
//!
//! Provides deterministic Ed25519 key pairs, signed JWT construction, and
//! pre-built tenant records, so tests exercise genuine signature
//! verification without touching the network. Feature-gated behind
//! `testutil` to keep the helpers (and the `ed25519-dalek` dependency) out
//! of production builds.
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! cloudgate-auth = { path = ".", features = ["testutil"] }
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ed25519_dalek::SigningKey;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{json, Value};

use crate::discovery::{ProviderMetadata, TenantRecord};

/// Seed for the well-known test signing key. Deterministic so every test
/// in the suite signs and verifies against the same key material.
const TEST_SEED: [u8; 32] = [42; 32];

/// Seed for a second key pair that is never published in any test JWKS.
const UNTRUSTED_SEED: [u8; 32] = [13; 32];

/// The test signing key all [`tenant_record`] key sets correspond to.
pub fn signing_key() -> SigningKey {
    SigningKey::from_bytes(&TEST_SEED)
}

/// A signing key whose public half is absent from every test key set.
pub fn untrusted_signing_key() -> SigningKey {
    SigningKey::from_bytes(&UNTRUSTED_SEED)
}

/// Wrap a raw Ed25519 private key in a PKCS#8 v1 DER document, suitable
/// for [`EncodingKey::from_ed_der`].
fn pkcs8_der(key: &SigningKey) -> Vec<u8> {
    let mut der = vec![
        0x30, 0x2e, // SEQUENCE, 46 bytes
        0x02, 0x01, 0x00, // INTEGER version 0
        0x30, 0x05, // SEQUENCE, 5 bytes (algorithm identifier)
        0x06, 0x03, 0x2b, 0x65, 0x70, // OID 1.3.101.112 (Ed25519)
        0x04, 0x22, // OCTET STRING, 34 bytes
        0x04, 0x20, // OCTET STRING, 32 bytes (the actual key)
    ];
    der.extend_from_slice(&key.to_bytes());
    der
}

/// Sign `claims` with the standard test key.
pub fn sign_token(claims: &Value, kid: Option<&str>) -> String {
    sign_token_with_key(claims, kid, &signing_key())
}

/// Sign `claims` with an explicit key (for wrong-key scenarios).
///
/// # Panics
///
/// Panics if JWT encoding fails, which cannot happen with valid inputs.
pub fn sign_token_with_key(claims: &Value, kid: Option<&str>, key: &SigningKey) -> String {
    let mut header = Header::new(Algorithm::EdDSA);
    header.kid = kid.map(str::to_string);
    let encoding_key = EncodingKey::from_ed_der(&pkcs8_der(key));
    jsonwebtoken::encode(&header, claims, &encoding_key).expect("failed to encode test JWT")
}

/// The JWK document for the standard test key under the given `kid`.
pub fn test_jwk(kid: &str) -> Value {
    json!({
        "kty": "OKP",
        "crv": "Ed25519",
        "kid": kid,
        "use": "sig",
        "x": URL_SAFE_NO_PAD.encode(signing_key().verifying_key().to_bytes()),
    })
}

/// A key set publishing the standard test key once per `kid`.
///
/// # Panics
///
/// Panics if the JWKS document fails to deserialize, which cannot happen
/// with valid inputs.
pub fn test_jwk_set(kids: &[&str]) -> JwkSet {
    let keys: Vec<Value> = kids.iter().map(|kid| test_jwk(kid)).collect();
    serde_json::from_value(json!({ "keys": keys })).expect("failed to build test JWKS")
}

/// A complete tenant record for `issuer` publishing the standard test key
/// under each of `kids`.
pub fn tenant_record(issuer: &str, kids: &[&str]) -> TenantRecord {
    TenantRecord {
        metadata: ProviderMetadata {
            issuer: issuer.to_string(),
            jwks_uri: format!("{issuer}/jwks"),
            authorization_endpoint: None,
            token_endpoint: None,
        },
        keys: test_jwk_set(kids),
    }
}
