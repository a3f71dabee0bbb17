use crate::core::errors::ExchangeError;
use crate::core::kernel::WsCodec;
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

/// A decoded inbound event: the event name plus its raw payload.
///
/// Payload interpretation is left to the dispatcher so that unknown events
/// can still be routed with their payload intact.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub name: String,
    pub payload: Value,
}

/// CoinDCX streaming codec
///
/// Frames are JSON text messages of the form `[<event-name>, <payload>]`
/// in both directions. A frame without a payload element decodes with a
/// null payload.
pub struct CoindcxCodec;

impl WsCodec for CoindcxCodec {
    type Message = InboundEvent;

    fn encode_event(&self, event: &str, payload: &Value) -> Result<Message, ExchangeError> {
        let json_str = serde_json::to_string(&(event, payload)).map_err(|e| {
            ExchangeError::SerializationError(format!("Failed to encode event frame: {}", e))
        })?;

        Ok(Message::Text(json_str))
    }

    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, ExchangeError> {
        match message {
            Message::Text(text) => {
                let frame: Value = serde_json::from_str(&text).map_err(|e| {
                    ExchangeError::DeserializationError(format!("Malformed event frame: {}", e))
                })?;

                let parts = frame.as_array().ok_or_else(|| {
                    ExchangeError::DeserializationError(
                        "Event frame is not an array".to_string(),
                    )
                })?;

                let name = parts
                    .first()
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        ExchangeError::DeserializationError(
                            "Event frame is missing the event name".to_string(),
                        )
                    })?
                    .to_string();

                let payload = parts.get(1).cloned().unwrap_or(Value::Null);

                Ok(Some(InboundEvent { name, payload }))
            }
            // The stream is text-only; anything else is ignored
            _ => Ok(None),
        }
    }
}
