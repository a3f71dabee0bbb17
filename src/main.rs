use anyhow::Context;
use coindcx_connect::coindcx::{build_session, shutdown_channel, EventDispatcher, SessionConfig};
use coindcx_connect::core::config::ExchangeConfig;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    #[cfg(feature = "env-file")]
    let config = ExchangeConfig::from_env_file();
    #[cfg(not(feature = "env-file"))]
    let config = ExchangeConfig::from_env();
    let config = config.context("API key or secret is missing; set CDX_KEY and CDX_SEC")?;

    let dispatcher = EventDispatcher::new().on_position_update(|update| {
        info!(%update, "position update");
    });

    let (stop, stop_rx) = shutdown_channel();
    let mut session = build_session(&config, dispatcher, SessionConfig::default(), stop_rx)?;

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping session");
            let _ = stop.send(true);
        }
    });

    session.run().await?;
    Ok(())
}
