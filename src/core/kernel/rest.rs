use crate::core::errors::ExchangeError;
use crate::core::kernel::signer::{canonical_json, RequestSigner};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{instrument, trace};

/// REST client trait for signed JSON-over-POST requests
///
/// CoinDCX derivatives endpoints are uniformly POST with a signed JSON body,
/// so the interface is deliberately narrow.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// POST a signed JSON body and return the parsed response
    ///
    /// # Arguments
    /// * `endpoint` - The API endpoint path
    /// * `body` - Request body; serialized canonically, signed, and sent as
    ///   the exact signed bytes
    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value, ExchangeError>;

    /// POST a signed JSON body with strongly-typed response
    async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Value,
    ) -> Result<T, ExchangeError>;
}

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Exchange name for logging and tracing
    pub exchange_name: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string to include in requests
    pub user_agent: String,
}

impl RestClientConfig {
    pub fn new(base_url: String, exchange_name: String) -> Self {
        Self {
            base_url,
            exchange_name,
            timeout_seconds: 30,
            user_agent: "coindcx-connect/0.1".to_string(),
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Builder for creating REST client instances
pub struct RestClientBuilder {
    config: RestClientConfig,
    signer: Option<Arc<dyn RequestSigner>>,
}

impl RestClientBuilder {
    pub fn new(config: RestClientConfig) -> Self {
        Self {
            config,
            signer: None,
        }
    }

    /// Set the signer for authenticated requests
    pub fn with_signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Build the REST client
    pub fn build(self) -> Result<ReqwestRest, ExchangeError> {
        let signer = self.signer.ok_or_else(|| {
            ExchangeError::AuthError("REST client requires a signer".to_string())
        })?;

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(self.config.timeout_seconds))
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| {
                ExchangeError::ConfigError(crate::core::config::ConfigError::InvalidConfiguration(
                    format!("Failed to build HTTP client: {}", e),
                ))
            })?;

        Ok(ReqwestRest {
            client,
            config: self.config,
            signer,
        })
    }
}

/// Implementation of [`RestClient`] using reqwest
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    config: RestClientConfig,
    signer: Arc<dyn RequestSigner>,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReqwestRest {
    fn build_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url, endpoint)
    }

    /// Handle the response and extract JSON
    ///
    /// A body that is not valid JSON becomes an `ApiError` carrying the raw
    /// HTTP status code rather than a silent failure.
    #[instrument(skip(self, response), fields(exchange = %self.config.exchange_name, status = %response.status()))]
    async fn handle_response(&self, response: Response) -> Result<Value, ExchangeError> {
        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            ExchangeError::NetworkError(format!("Failed to read response body: {}", e))
        })?;

        trace!("Response body: {}", response_text);

        if !status.is_success() {
            return Err(ExchangeError::ApiError {
                code: i32::from(status.as_u16()),
                message: response_text,
            });
        }

        serde_json::from_str(&response_text).map_err(|_| ExchangeError::ApiError {
            code: i32::from(status.as_u16()),
            message: format!("Non-JSON response from API: {}", response_text),
        })
    }

    #[instrument(skip(self, body), fields(exchange = %self.config.exchange_name, endpoint = %endpoint))]
    async fn make_request(&self, endpoint: &str, body: &Value) -> Result<Value, ExchangeError> {
        let body_bytes = canonical_json(body)?;
        let headers = self.signer.auth_headers(&body_bytes)?;

        let mut request = self
            .client
            .post(self.build_url(endpoint))
            .body(body_bytes);

        for (key, value) in headers {
            request = request.header(&key, &value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExchangeError::NetworkError(format!("Request failed: {}", e)))?;

        self.handle_response(response).await
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value, ExchangeError> {
        self.make_request(endpoint, body).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Value,
    ) -> Result<T, ExchangeError> {
        self.make_request(endpoint, body).await.and_then(|value| {
            serde_json::from_value(value).map_err(|e| {
                ExchangeError::DeserializationError(format!("Failed to deserialize JSON: {}", e))
            })
        })
    }
}
