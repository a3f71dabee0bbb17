use crate::core::config::{ConfigError, ExchangeConfig};
use crate::core::errors::ExchangeError;
use crate::core::kernel::{hmac_sha256_hex, RequestSigner};
use secrecy::{ExposeSecret, Secret};
use std::collections::HashMap;

/// CoinDCX HMAC-SHA256 signer
///
/// Computes signatures over the exact canonical body bytes and builds the
/// `X-AUTH-*` header set used by the derivatives REST API. The secret is
/// held behind [`Secret`] and never logged.
pub struct CoindcxSigner {
    api_key: String,
    secret_key: Secret<String>,
}

impl std::fmt::Debug for CoindcxSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoindcxSigner")
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

impl CoindcxSigner {
    /// Create a new signer
    ///
    /// Fails with a configuration error when either credential is empty;
    /// this surfaces before any request is attempted.
    pub fn new(api_key: String, secret_key: String) -> Result<Self, ExchangeError> {
        if api_key.is_empty() {
            return Err(ExchangeError::ConfigError(
                ConfigError::InvalidConfiguration("API key must not be empty".to_string()),
            ));
        }
        if secret_key.is_empty() {
            return Err(ExchangeError::ConfigError(
                ConfigError::InvalidConfiguration("API secret must not be empty".to_string()),
            ));
        }

        Ok(Self {
            api_key,
            secret_key: Secret::new(secret_key),
        })
    }

    pub fn from_config(config: &ExchangeConfig) -> Result<Self, ExchangeError> {
        Self::new(config.api_key().to_string(), config.secret_key().to_string())
    }
}

impl RequestSigner for CoindcxSigner {
    fn signature(&self, payload: &[u8]) -> Result<String, ExchangeError> {
        hmac_sha256_hex(self.secret_key.expose_secret().as_bytes(), payload)
    }

    fn auth_headers(&self, payload: &[u8]) -> Result<HashMap<String, String>, ExchangeError> {
        let signature = self.signature(payload)?;

        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("X-AUTH-APIKEY".to_string(), self.api_key.clone());
        headers.insert("X-AUTH-SIGNATURE".to_string(), signature);

        Ok(headers)
    }

    fn api_key(&self) -> &str {
        &self.api_key
    }
}
