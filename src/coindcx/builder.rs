use crate::coindcx::client::CoindcxConnector;
use crate::coindcx::codec::CoindcxCodec;
use crate::coindcx::dispatcher::EventDispatcher;
use crate::coindcx::session::{SessionConfig, StreamingSession};
use crate::coindcx::signer::CoindcxSigner;
use crate::coindcx::{REST_ENDPOINT, STREAM_ENDPOINT};
use crate::core::config::ExchangeConfig;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{ReqwestRest, RestClientBuilder, RestClientConfig, TungsteniteWs};
use std::sync::Arc;
use tokio::sync::watch;

/// Create the REST connector for order placement and listing.
pub fn build_connector(
    config: &ExchangeConfig,
) -> Result<CoindcxConnector<ReqwestRest>, ExchangeError> {
    let signer = Arc::new(CoindcxSigner::from_config(config)?);

    let base_url = config
        .base_url
        .clone()
        .unwrap_or_else(|| REST_ENDPOINT.to_string());
    let rest_config = RestClientConfig::new(base_url, "coindcx".to_string()).with_timeout(30);

    let rest = RestClientBuilder::new(rest_config)
        .with_signer(signer)
        .build()?;

    Ok(CoindcxConnector::new(rest))
}

/// Create the authenticated streaming session.
///
/// Fails before any connection attempt when the credentials are missing or
/// empty. `shutdown` is the stop signal created by
/// [`crate::coindcx::session::shutdown_channel`].
pub fn build_session(
    config: &ExchangeConfig,
    dispatcher: EventDispatcher,
    session_config: SessionConfig,
    shutdown: watch::Receiver<bool>,
) -> Result<StreamingSession<TungsteniteWs<CoindcxCodec>>, ExchangeError> {
    let signer = Arc::new(CoindcxSigner::from_config(config)?);

    let ws_url = config
        .ws_url
        .clone()
        .unwrap_or_else(|| STREAM_ENDPOINT.to_string());
    let transport = TungsteniteWs::new(ws_url, CoindcxCodec);

    Ok(StreamingSession::new(
        transport,
        signer,
        dispatcher,
        session_config,
        shutdown,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_session_requires_credentials() {
        let config = ExchangeConfig::new(String::new(), String::new());
        let result = build_session(
            &config,
            EventDispatcher::new(),
            SessionConfig::default(),
            crate::coindcx::session::shutdown_channel().1,
        );
        assert!(matches!(result, Err(ExchangeError::ConfigError(_))));
    }

    #[test]
    fn test_build_connector_requires_credentials() {
        let config = ExchangeConfig::new("key".to_string(), String::new());
        assert!(matches!(
            build_connector(&config),
            Err(ExchangeError::ConfigError(_))
        ));
    }
}
