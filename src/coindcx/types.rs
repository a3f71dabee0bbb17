use crate::core::errors::ExchangeError;
use crate::core::types::{Notification, OrderSide, OrderType, TimeInForce};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event name carrying account-wide cross position updates.
pub const POSITION_UPDATE_EVENT: &str = "df-user-cross-position-details";

/// Futures order placement request
///
/// Field names follow the wire format of
/// `/exchange/v1/derivatives/futures/orders/create`.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub side: OrderSide,
    pub pair: String,
    pub order_type: OrderType,
    pub price: f64,
    pub total_quantity: f64,
    pub leverage: u32,
    pub notification: Notification,
    pub time_in_force: TimeInForce,
    pub hidden: bool,
    pub post_only: bool,
}

impl OrderRequest {
    /// Create an order request with the default notification, time-in-force
    /// and visibility settings.
    pub fn new(
        side: OrderSide,
        pair: impl Into<String>,
        order_type: OrderType,
        price: f64,
        total_quantity: f64,
        leverage: u32,
    ) -> Self {
        Self {
            side,
            pair: pair.into(),
            order_type,
            price,
            total_quantity,
            leverage,
            notification: Notification::NoNotification,
            time_in_force: TimeInForce::GoodTillCancel,
            hidden: false,
            post_only: false,
        }
    }

    pub fn time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }

    pub fn post_only(mut self, post_only: bool) -> Self {
        self.post_only = post_only;
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

/// Filter for the order listing endpoint
///
/// `status` takes comma separated statuses (`open,filled,cancelled`); `page`
/// and `size` are decimal strings on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct OrderFilter {
    pub status: String,
    pub side: OrderSide,
    pub page: String,
    pub size: String,
}

impl Default for OrderFilter {
    fn default() -> Self {
        Self {
            status: "open".to_string(),
            side: OrderSide::Buy,
            page: "1".to_string(),
            size: "10".to_string(),
        }
    }
}

/// An order as returned by the listing endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    #[serde(default)]
    pub id: Option<String>,
    pub pair: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub total_quantity: Option<f64>,
    #[serde(default)]
    pub remaining_quantity: Option<f64>,
    #[serde(default)]
    pub leverage: Option<f64>,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

/// An open or settled futures position
#[derive(Debug, Clone, Deserialize)]
pub struct Position {
    pub pair: String,
    pub active_pos: f64,
    #[serde(default)]
    pub avg_price: Option<f64>,
    #[serde(default)]
    pub mark_price: Option<f64>,
    #[serde(default)]
    pub leverage: Option<f64>,
    #[serde(default)]
    pub locked_margin: Option<f64>,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

impl Position {
    /// Whether the position has an open quantity.
    pub fn is_active(&self) -> bool {
        self.active_pos > 0.0
    }
}

/// Account-wide cross position update pushed on
/// [`POSITION_UPDATE_EVENT`]
///
/// The event payload carries a `data` field that is itself a JSON-encoded
/// string; this struct is the result of the second decode. Every field may
/// be absent on the wire and decodes to `None` ("not available") rather
/// than failing the event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PositionUpdate {
    #[serde(default)]
    pub pnl: Option<f64>,
    #[serde(default)]
    pub maintenance_margin: Option<f64>,
    #[serde(default)]
    pub available_wallet_balance: Option<f64>,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

impl PositionUpdate {
    /// Decode a position update from the raw event payload.
    ///
    /// The outer payload must contain a `data` string which is decoded a
    /// second time; this nested encoding is the real wire format.
    pub fn from_payload(payload: &Value) -> Result<Self, ExchangeError> {
        let raw = payload
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ExchangeError::DeserializationError(
                    "Position update payload is missing the data string".to_string(),
                )
            })?;

        serde_json::from_str(raw).map_err(|e| {
            ExchangeError::DeserializationError(format!(
                "Malformed nested position update JSON: {}",
                e
            ))
        })
    }

    /// The update time as a UTC timestamp, when present.
    pub fn updated_at_utc(&self) -> Option<DateTime<Utc>> {
        self.updated_at
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
    }
}

fn fmt_opt_f64(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

impl std::fmt::Display for PositionUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let updated_at = self
            .updated_at_utc()
            .map_or_else(|| "N/A".to_string(), |t| t.to_rfc3339());
        write!(
            f,
            "pnl={} maintenance_margin={} available_wallet_balance={} updated_at={}",
            fmt_opt_f64(self.pnl),
            fmt_opt_f64(self.maintenance_margin),
            fmt_opt_f64(self.available_wallet_balance),
            updated_at
        )
    }
}
