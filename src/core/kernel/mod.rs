/// Transport kernel - exchange-agnostic REST and WebSocket plumbing
///
/// The kernel contains only transport logic and generic interfaces; the
/// CoinDCX specifics (wire shapes, auth headers, session lifecycle) live in
/// `crate::coindcx`.
///
/// # Architecture
///
/// ## Transport Layer
/// - `RestClient`: signed JSON-over-POST HTTP interface
/// - `WsSession`: WebSocket connection management
///
/// ## Authentication
/// - `RequestSigner`: pluggable signing interface
/// - `canonical_json` / `hmac_sha256_hex`: canonical body bytes and the
///   HMAC-SHA256 primitive computed over them
///
/// ## Message Handling
/// - `WsCodec`: event-framed message encoding/decoding
///
/// All components are trait-based so tests can inject mock transports and
/// signers.
pub mod codec;
pub mod rest;
pub mod signer;
pub mod ws;

// Re-export key types for convenience
pub use codec::WsCodec;
pub use rest::{ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
pub use signer::{canonical_json, hmac_sha256_hex, RequestSigner};
pub use ws::{TungsteniteWs, WsConfig, WsSession};
