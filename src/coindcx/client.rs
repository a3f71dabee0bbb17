use crate::coindcx::types::{Order, OrderFilter, OrderRequest, Position};
use crate::core::errors::ExchangeError;
use crate::core::kernel::RestClient;
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::instrument;

/// Order placement endpoint.
const ORDERS_CREATE_ENDPOINT: &str = "/exchange/v1/derivatives/futures/orders/create";
/// Order listing endpoint.
const ORDERS_LIST_ENDPOINT: &str = "/exchange/v1/derivatives/futures/orders";
/// Position listing endpoint.
const POSITIONS_LIST_ENDPOINT: &str = "/exchange/v1/derivatives/futures/positions";

/// CoinDCX derivatives REST connector
///
/// Single-shot signed calls; each request body carries a fresh epoch-millis
/// timestamp and is signed over its exact canonical bytes by the underlying
/// REST client.
pub struct CoindcxConnector<R: RestClient> {
    rest: R,
}

impl<R: RestClient> CoindcxConnector<R> {
    pub fn new(rest: R) -> Self {
        Self { rest }
    }

    fn timestamp_millis() -> Result<u64, ExchangeError> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .map_err(|e| {
                ExchangeError::NetworkError(format!("System clock before epoch: {}", e))
            })
    }

    /// Place a futures order.
    #[instrument(skip(self, order), fields(pair = %order.pair, side = %order.side))]
    pub async fn place_order(&self, order: &OrderRequest) -> Result<Value, ExchangeError> {
        let body = json!({
            "timestamp": Self::timestamp_millis()?,
            "order": order,
        });

        self.rest.post(ORDERS_CREATE_ENDPOINT, &body).await
    }

    /// List orders matching the filter.
    #[instrument(skip(self, filter), fields(status = %filter.status))]
    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, ExchangeError> {
        let body = json!({
            "timestamp": Self::timestamp_millis()?,
            "status": filter.status,
            "side": filter.side,
            "page": filter.page,
            "size": filter.size,
        });

        self.rest.post_json(ORDERS_LIST_ENDPOINT, &body).await
    }

    /// List positions, a page at a time.
    #[instrument(skip(self))]
    pub async fn list_positions(
        &self,
        page: u32,
        size: u32,
    ) -> Result<Vec<Position>, ExchangeError> {
        let body = json!({
            "timestamp": Self::timestamp_millis()?,
            "page": page.to_string(),
            "size": size.to_string(),
        });

        self.rest.post_json(POSITIONS_LIST_ENDPOINT, &body).await
    }

    /// List positions with an open quantity.
    pub async fn active_positions(
        &self,
        page: u32,
        size: u32,
    ) -> Result<Vec<Position>, ExchangeError> {
        let positions = self.list_positions(page, size).await?;
        Ok(positions.into_iter().filter(Position::is_active).collect())
    }
}
