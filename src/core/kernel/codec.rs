use crate::core::errors::ExchangeError;
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

/// Codec trait for the event-framed streaming wire format
///
/// Converts between raw WebSocket messages and named application events.
/// Control messages (ping, pong, close) are handled at the transport level
/// and never reach the codec.
pub trait WsCodec: Send + Sync + 'static {
    /// The type representing decoded inbound messages
    type Message: Send;

    /// Encode a named outbound event into a WebSocket message
    fn encode_event(&self, event: &str, payload: &Value) -> Result<Message, ExchangeError>;

    /// Decode a raw WebSocket message into a typed message
    ///
    /// # Returns
    /// - `Ok(Some(message))` - Successfully decoded message
    /// - `Ok(None)` - Message was ignored/filtered by codec
    /// - `Err(error)` - Failed to decode message (recoverable; the caller
    ///   may skip the frame)
    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, ExchangeError>;
}
