pub mod builder;
pub mod client;
pub mod codec;
pub mod dispatcher;
pub mod session;
pub mod signer;
pub mod types;

/// Production REST base URL.
pub const REST_ENDPOINT: &str = "https://api.coindcx.com";
/// Production streaming endpoint (TLS WebSocket, no polling fallback).
pub const STREAM_ENDPOINT: &str = "wss://stream.coindcx.com";
/// The account's private update channel.
pub const DEFAULT_CHANNEL: &str = "coindcx";

// Re-export main types for easier importing
pub use builder::{build_connector, build_session};
pub use client::CoindcxConnector;
pub use codec::{CoindcxCodec, InboundEvent};
pub use dispatcher::EventDispatcher;
pub use session::{shutdown_channel, SessionConfig, SessionState, StreamingSession};
pub use signer::CoindcxSigner;
pub use types::{
    Order, OrderFilter, OrderRequest, Position, PositionUpdate, POSITION_UPDATE_EVENT,
};
