use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;

/// Environment variable holding the CoinDCX API key.
pub const API_KEY_ENV: &str = "CDX_KEY";
/// Environment variable holding the CoinDCX API secret.
pub const API_SECRET_ENV: &str = "CDX_SEC";
/// Optional override for the REST base URL.
pub const BASE_URL_ENV: &str = "CDX_BASE_URL";
/// Optional override for the streaming endpoint.
pub const WS_URL_ENV: &str = "CDX_WS_URL";

/// API credentials and endpoint overrides, loaded once at startup.
///
/// The secret is only ever used as a signing key; it is wrapped in
/// [`Secret`] and redacted from any serialized form.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub api_key: Secret<String>,
    pub secret_key: Secret<String>,
    pub base_url: Option<String>,
    pub ws_url: Option<String>,
}

// Custom Serialize implementation - never expose secrets in serialization
impl Serialize for ExchangeConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ExchangeConfig", 4)?;
        state.serialize_field("api_key", "[REDACTED]")?;
        state.serialize_field("secret_key", "[REDACTED]")?;
        state.serialize_field("base_url", &self.base_url)?;
        state.serialize_field("ws_url", &self.ws_url)?;
        state.end()
    }
}

// Custom Deserialize implementation
impl<'de> Deserialize<'de> for ExchangeConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ExchangeConfigHelper {
            api_key: String,
            secret_key: String,
            base_url: Option<String>,
            ws_url: Option<String>,
        }

        let helper = ExchangeConfigHelper::deserialize(deserializer)?;
        Ok(Self {
            api_key: Secret::new(helper.api_key),
            secret_key: Secret::new(helper.secret_key),
            base_url: helper.base_url,
            ws_url: helper.ws_url,
        })
    }
}

impl ExchangeConfig {
    /// Create a new configuration with API credentials
    #[must_use]
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            base_url: None,
            ws_url: None,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Required variables:
    /// - `CDX_KEY` - API key
    /// - `CDX_SEC` - API secret
    ///
    /// Optional variables:
    /// - `CDX_BASE_URL` - REST base URL override
    /// - `CDX_WS_URL` - streaming endpoint override
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var(API_KEY_ENV)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(API_KEY_ENV.to_string()))?;

        let secret_key = env::var(API_SECRET_ENV)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(API_SECRET_ENV.to_string()))?;

        let base_url = env::var(BASE_URL_ENV).ok();
        let ws_url = env::var(WS_URL_ENV).ok();

        Ok(Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            base_url,
            ws_url,
        })
    }

    /// Create configuration from a .env file and environment variables
    ///
    /// Loads `.env` from the working directory if it exists, then reads the
    /// standard environment variable names.
    ///
    /// **Security Warning**: Never commit .env files to version control!
    /// Add .env to your .gitignore file.
    #[cfg(feature = "env-file")]
    pub fn from_env_file() -> Result<Self, ConfigError> {
        match dotenv::dotenv() {
            Ok(_) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                // No .env file, fall through to system environment variables
            }
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file: {}",
                    e
                )));
            }
        }

        Self::from_env()
    }

    /// Check if this configuration has valid credentials for authenticated operations
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.api_key.expose_secret().is_empty() && !self.secret_key.expose_secret().is_empty()
    }

    /// Set custom REST base URL
    #[must_use]
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Set custom streaming endpoint
    #[must_use]
    pub fn ws_url(mut self, ws_url: String) -> Self {
        self.ws_url = Some(ws_url);
        self
    }

    /// Get API key (use carefully - exposes secret)
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Get secret key (use carefully - exposes secret)
    pub fn secret_key(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests mutate process-wide environment variables and must not interleave.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_from_env_missing_key_fails() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::remove_var(API_KEY_ENV);
        env::remove_var(API_SECRET_ENV);

        let err = ExchangeConfig::from_env().unwrap_err();
        match err {
            ConfigError::MissingEnvironmentVariable(var) => assert_eq!(var, API_KEY_ENV),
            ConfigError::InvalidConfiguration(_) => panic!("Expected missing variable error"),
        }
    }

    #[test]
    fn test_from_env_missing_secret_fails() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var(API_KEY_ENV, "key-only");
        env::remove_var(API_SECRET_ENV);

        let err = ExchangeConfig::from_env().unwrap_err();
        match err {
            ConfigError::MissingEnvironmentVariable(var) => assert_eq!(var, API_SECRET_ENV),
            ConfigError::InvalidConfiguration(_) => panic!("Expected missing variable error"),
        }
        env::remove_var(API_KEY_ENV);
    }

    #[test]
    fn test_from_env_reads_credentials() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var(API_KEY_ENV, "test-key");
        env::set_var(API_SECRET_ENV, "test-secret");

        let config = ExchangeConfig::from_env().unwrap();
        assert_eq!(config.api_key(), "test-key");
        assert_eq!(config.secret_key(), "test-secret");
        assert!(config.has_credentials());

        env::remove_var(API_KEY_ENV);
        env::remove_var(API_SECRET_ENV);
    }

    #[test]
    fn test_serialization_redacts_secrets() {
        let config = ExchangeConfig::new("visible-key".to_string(), "visible-secret".to_string());
        let serialized = serde_json::to_string(&config).unwrap();
        assert!(!serialized.contains("visible-key"));
        assert!(!serialized.contains("visible-secret"));
        assert!(serialized.contains("[REDACTED]"));
    }
}
