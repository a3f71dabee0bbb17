use crate::coindcx::types::{PositionUpdate, POSITION_UPDATE_EVENT};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

type Handler = Box<dyn Fn(&Value) + Send + Sync>;
type FallbackHandler = Box<dyn Fn(&str, &Value) + Send + Sync>;

/// Routes inbound events to registered handlers by event name.
///
/// Events without a registered handler go to the fallback handler with the
/// original name and payload; nothing is dropped silently. The dispatcher
/// never touches connection state - it only reads dispatched payloads.
pub struct EventDispatcher {
    handlers: HashMap<String, Handler>,
    fallback: FallbackHandler,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            fallback: Box::new(|event, payload| {
                debug!(event = %event, payload = %payload, "unhandled event");
            }),
        }
    }

    /// Register a handler for a named event.
    pub fn on<F>(mut self, event: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.handlers.insert(event.into(), Box::new(handler));
        self
    }

    /// Replace the fallback handler invoked for unrecognized events.
    pub fn on_unhandled<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        self.fallback = Box::new(handler);
        self
    }

    /// Register a typed handler for cross position updates.
    ///
    /// The nested `data` string is decoded before the handler runs. A
    /// malformed payload is logged and skipped; it never reaches the
    /// handler and never stops the session.
    pub fn on_position_update<F>(self, handler: F) -> Self
    where
        F: Fn(PositionUpdate) + Send + Sync + 'static,
    {
        self.on(POSITION_UPDATE_EVENT, move |payload| {
            match PositionUpdate::from_payload(payload) {
                Ok(update) => handler(update),
                Err(e) => warn!(error = %e, "skipping undecodable position update"),
            }
        })
    }

    /// Dispatch one event to its handler, or to the fallback.
    pub fn dispatch(&self, event: &str, payload: &Value) {
        match self.handlers.get(event) {
            Some(handler) => handler(payload),
            None => (self.fallback)(event, payload),
        }
    }
}
