use crate::coindcx::codec::CoindcxCodec;
use crate::coindcx::dispatcher::EventDispatcher;
use crate::coindcx::DEFAULT_CHANNEL;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{canonical_json, RequestSigner, WsSession};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Connection lifecycle of the streaming session.
///
/// Owned exclusively by [`StreamingSession`]; observers get read-only
/// snapshots through [`StreamingSession::state_watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Subscribed,
    Stopped,
}

/// Streaming session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Channel to join after each successful connect
    pub channel: String,
    /// Delay before each reconnect attempt
    pub reconnect_delay: Duration,
    /// Reconnect attempt cap; `None` retries indefinitely
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            reconnect_delay: Duration::from_secs(3),
            max_reconnect_attempts: None,
        }
    }
}

impl SessionConfig {
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_max_reconnect_attempts(mut self, max_attempts: u32) -> Self {
        self.max_reconnect_attempts = Some(max_attempts);
        self
    }
}

/// Create the stop channel for a streaming session.
///
/// Sending `true` ends the session: the run loop suppresses further
/// reconnects, closes the transport, and returns.
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Owns one persistent authenticated connection to the exchange's
/// real-time channel.
///
/// Lifecycle per connection: connect the transport, sign and emit the join
/// message, then pump inbound events through the dispatcher. On transport
/// loss the session schedules exactly one reconnect after the configured
/// delay and starts over; the join message is re-sent on every connect
/// because subscriptions do not survive a transport reconnection.
pub struct StreamingSession<T: WsSession<CoindcxCodec>> {
    transport: T,
    signer: Arc<dyn RequestSigner>,
    dispatcher: EventDispatcher,
    config: SessionConfig,
    state_tx: watch::Sender<SessionState>,
    shutdown: watch::Receiver<bool>,
}

impl<T: WsSession<CoindcxCodec>> StreamingSession<T> {
    pub fn new(
        transport: T,
        signer: Arc<dyn RequestSigner>,
        dispatcher: EventDispatcher,
        config: SessionConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Disconnected);
        Self {
            transport,
            signer,
            dispatcher,
            config,
            state_tx,
            shutdown,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Subscribe to lifecycle state transitions.
    pub fn state_watch(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: SessionState) {
        debug!(state = ?state, "session state");
        self.state_tx.send_replace(state);
    }

    fn stop_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Resolve when a stop is requested on the shutdown channel.
    async fn stopped(shutdown: &mut watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                return;
            }
            if shutdown.changed().await.is_err() {
                // Stop handle dropped without a stop request; the signal
                // can no longer arrive.
                std::future::pending::<()>().await;
            }
        }
    }

    /// Run the session until a stop is requested.
    ///
    /// Returns an error only when the reconnect attempt cap is exhausted;
    /// every transport failure short of that is logged and retried.
    pub async fn run(&mut self) -> Result<(), ExchangeError> {
        let mut attempts: u32 = 0;

        loop {
            if self.stop_requested() {
                break;
            }

            self.set_state(SessionState::Connecting);
            match self.transport.connect().await {
                Ok(()) => {
                    attempts = 0;
                    self.set_state(SessionState::Connected);
                    match self.send_join().await {
                        Ok(()) => {
                            self.set_state(SessionState::Subscribed);
                            self.pump_events().await;
                        }
                        Err(e) => warn!(error = %e, "join emission failed"),
                    }
                }
                Err(e) => warn!(error = %e, "connect failed"),
            }

            self.set_state(SessionState::Disconnected);
            if self.stop_requested() {
                break;
            }

            attempts += 1;
            if let Some(max) = self.config.max_reconnect_attempts {
                if attempts > max {
                    self.set_state(SessionState::Stopped);
                    return Err(ExchangeError::NetworkError(format!(
                        "Giving up after {} reconnect attempts",
                        max
                    )));
                }
            }

            info!(
                delay_ms = self.config.reconnect_delay.as_millis() as u64,
                "scheduling reconnect"
            );
            tokio::select! {
                () = sleep(self.config.reconnect_delay) => {}
                () = Self::stopped(&mut self.shutdown) => {}
            }
        }

        let _ = self.transport.close().await;
        self.set_state(SessionState::Stopped);
        Ok(())
    }

    /// Sign and emit the join message for the configured channel.
    ///
    /// The signature covers the canonical bytes of `{"channel":<name>}` and
    /// is computed fresh for every handshake. Emission is fire-and-forget:
    /// inbound events on the channel are the only confirmation.
    async fn send_join(&mut self) -> Result<(), ExchangeError> {
        let body = json!({ "channel": self.config.channel });
        let payload = canonical_json(&body)?;
        let signature = self.signer.signature(&payload)?;

        let join = json!({
            "channelName": self.config.channel,
            "authSignature": signature,
            "apiKey": self.signer.api_key(),
        });

        self.transport.send_event("join", &join).await?;
        info!(channel = %self.config.channel, "joined channel");
        Ok(())
    }

    /// Dispatch inbound events until the transport drops or a stop is
    /// requested.
    ///
    /// Undecodable frames are skipped; only transport-level failures end
    /// the connection.
    async fn pump_events(&mut self) {
        let Self {
            transport,
            dispatcher,
            shutdown,
            ..
        } = self;

        loop {
            tokio::select! {
                maybe = transport.next_message() => {
                    match maybe {
                        Some(Ok(event)) => dispatcher.dispatch(&event.name, &event.payload),
                        Some(Err(ExchangeError::DeserializationError(e))) => {
                            warn!(error = %e, "skipping undecodable frame");
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "transport error");
                            return;
                        }
                        None => {
                            info!("stream closed by remote");
                            return;
                        }
                    }
                }
                () = Self::stopped(shutdown) => return,
            }
        }
    }
}
