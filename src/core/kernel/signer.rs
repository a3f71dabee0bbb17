use crate::core::errors::ExchangeError;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use std::collections::HashMap;

type HmacSha256 = Hmac<Sha256>;

/// Serialize a request body into its canonical byte form.
///
/// Canonical means compact separators and stable key order. The default
/// `serde_json` object map keeps keys sorted, so two semantically equal
/// payloads always serialize to identical bytes. Signatures are computed
/// over exactly these bytes, and the same bytes must be the ones
/// transmitted - signing and sending different serializations of the same
/// payload fails verification on the server.
pub fn canonical_json<T: Serialize>(body: &T) -> Result<Vec<u8>, ExchangeError> {
    serde_json::to_vec(body).map_err(|e| {
        ExchangeError::SerializationError(format!("Failed to serialize request body: {}", e))
    })
}

/// Compute a hex-encoded HMAC-SHA256 over the payload bytes.
pub fn hmac_sha256_hex(secret: &[u8], payload: &[u8]) -> Result<String, ExchangeError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| ExchangeError::AuthError(format!("Invalid secret key: {}", e)))?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Signer trait for request authentication
///
/// Implementations compute the signature over the exact serialized payload
/// bytes; they never alter the payload structure.
pub trait RequestSigner: Send + Sync {
    /// Compute the hex-encoded signature for the payload bytes.
    ///
    /// Deterministic: repeated calls with identical bytes and the same
    /// secret produce identical output.
    fn signature(&self, payload: &[u8]) -> Result<String, ExchangeError>;

    /// Build the authentication headers for a signed REST request carrying
    /// the payload.
    fn auth_headers(&self, payload: &[u8]) -> Result<HashMap<String, String>, ExchangeError>;

    /// The public API key sent alongside signatures.
    fn api_key(&self) -> &str;
}
