//! Thin typed wrapper around the REST transport for the USD-M futures
//! endpoints. Responses decode to generic JSON; the exchange sends
//! high-precision decimals as strings, so no precision is lost here.

use serde_json::Value;
use tracing::instrument;

use crate::core::config::Credentials;
use crate::core::env::EnvironmentConfig;
use crate::core::errors::ClientError;
use crate::core::kernel::{ReqwestTransport, Request, RestClient};
use crate::core::params::Params;
use crate::orders::{KlineInterval, MarginType, OrderRequest};

const DEFAULT_KLINE_LIMIT: u32 = 1000;

/// USD-M futures API client.
pub struct UsdFuturesClient<R: RestClient> {
    rest: R,
}

impl UsdFuturesClient<ReqwestTransport> {
    /// Build a client for the given resolved environment.
    pub fn new(config: &EnvironmentConfig, credentials: Credentials) -> Result<Self, ClientError> {
        Ok(Self {
            rest: ReqwestTransport::new(config, credentials)?,
        })
    }
}

impl<R: RestClient> UsdFuturesClient<R> {
    /// Wrap an existing transport (mockable seam for tests).
    pub fn with_transport(rest: R) -> Self {
        Self { rest }
    }

    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn all_orders(&self, symbol: &str) -> Result<Value, ClientError> {
        self.rest
            .send(
                Request::get("/fapi/v1/allOrders")
                    .params(Params::new().with("symbol", symbol))
                    .signed(),
            )
            .await
    }

    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn open_orders(&self, symbol: &str) -> Result<Value, ClientError> {
        self.rest
            .send(
                Request::get("/fapi/v1/openOrders")
                    .params(Params::new().with("symbol", symbol))
                    .signed(),
            )
            .await
    }

    /// Place an order built by [`OrderRequest`]. The transport assigns the
    /// `timestamp` at send time.
    #[instrument(skip(self, order), fields(symbol = %order.symbol, order_type = order.order_type.as_str()))]
    pub async fn place_order(&self, order: &OrderRequest) -> Result<Value, ClientError> {
        let params = order.to_params()?;
        self.rest
            .send(Request::post("/fapi/v1/order").params(params).signed())
            .await
    }

    #[instrument(skip(self), fields(symbol = %symbol, leverage = leverage))]
    pub async fn update_leverage(&self, symbol: &str, leverage: u32) -> Result<Value, ClientError> {
        self.rest
            .send(
                Request::post("/fapi/v1/leverage")
                    .params(Params::new().with("symbol", symbol).with("leverage", leverage))
                    .signed(),
            )
            .await
    }

    /// Obtain a listen key for the user-data stream. API-key header only;
    /// this endpoint is not signed.
    #[instrument(skip(self))]
    pub async fn start_user_data_stream(&self) -> Result<Value, ClientError> {
        self.rest.send(Request::post("/fapi/v1/listenKey")).await
    }

    /// Keep the current listen key alive. Not signed.
    #[instrument(skip(self))]
    pub async fn keepalive_user_data_stream(&self) -> Result<Value, ClientError> {
        self.rest.send(Request::put("/fapi/v1/listenKey")).await
    }

    #[instrument(skip(self))]
    pub async fn exchange_info(&self) -> Result<Value, ClientError> {
        self.rest.send(Request::get("/fapi/v1/exchangeInfo")).await
    }

    #[instrument(skip(self))]
    pub async fn balances(&self) -> Result<Value, ClientError> {
        self.rest
            .send(Request::get("/fapi/v2/balance").signed())
            .await
    }

    #[instrument(skip(self), fields(symbol = %symbol, margin_type = margin_type.as_str()))]
    pub async fn update_margin_type(
        &self,
        symbol: &str,
        margin_type: MarginType,
    ) -> Result<Value, ClientError> {
        self.rest
            .send(
                Request::post("/fapi/v1/marginType")
                    .params(
                        Params::new()
                            .with("symbol", symbol)
                            .with("marginType", margin_type.as_str()),
                    )
                    .signed(),
            )
            .await
    }

    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn position_risk(&self, symbol: &str) -> Result<Value, ClientError> {
        self.rest
            .send(
                Request::get("/fapi/v2/positionRisk")
                    .params(Params::new().with("symbol", symbol))
                    .signed(),
            )
            .await
    }

    #[instrument(skip(self), fields(symbol = %symbol, interval = interval.as_str()))]
    pub async fn klines(
        &self,
        symbol: &str,
        interval: KlineInterval,
        limit: Option<u32>,
        start_time: Option<u64>,
        end_time: Option<u64>,
    ) -> Result<Value, ClientError> {
        let mut params = Params::new()
            .with("symbol", symbol)
            .with("interval", interval.as_str())
            .with("limit", limit.unwrap_or(DEFAULT_KLINE_LIMIT));
        if let Some(start_time) = start_time {
            params.insert("startTime", start_time);
        }
        if let Some(end_time) = end_time {
            params.insert("endTime", end_time);
        }
        self.rest
            .send(Request::get("/fapi/v1/klines").params(params))
            .await
    }

    /// 24h ticker statistics; without a symbol the exchange returns all
    /// symbols.
    #[instrument(skip(self))]
    pub async fn ticker_24h(&self, symbol: Option<&str>) -> Result<Value, ClientError> {
        let mut params = Params::new();
        if let Some(symbol) = symbol {
            params.insert("symbol", symbol);
        }
        self.rest
            .send(Request::get("/fapi/v1/ticker/24hr").params(params))
            .await
    }

    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn cancel_all_open_orders(&self, symbol: &str) -> Result<Value, ClientError> {
        self.rest
            .send(
                Request::delete("/fapi/v1/allOpenOrders")
                    .params(Params::new().with("symbol", symbol))
                    .signed(),
            )
            .await
    }

    #[instrument(skip(self), fields(symbol = %symbol))]
    pub async fn user_trades(
        &self,
        symbol: &str,
        start_time: Option<u64>,
        end_time: Option<u64>,
    ) -> Result<Value, ClientError> {
        let mut params = Params::new().with("symbol", symbol);
        if let Some(start_time) = start_time {
            params.insert("startTime", start_time);
        }
        if let Some(end_time) = end_time {
            params.insert("endTime", end_time);
        }
        self.rest
            .send(Request::get("/fapi/v1/userTrades").params(params).signed())
            .await
    }

    /// Request an async download id for the trade history in the range.
    #[instrument(skip(self))]
    pub async fn trade_download_id(
        &self,
        start_time: u64,
        end_time: u64,
    ) -> Result<Value, ClientError> {
        self.rest
            .send(
                Request::get("/fapi/v1/trade/asyn")
                    .params(
                        Params::new()
                            .with("startTime", start_time)
                            .with("endTime", end_time),
                    )
                    .signed(),
            )
            .await
    }

    #[instrument(skip(self), fields(download_id = %download_id))]
    pub async fn trade_download_link(&self, download_id: &str) -> Result<Value, ClientError> {
        self.rest
            .send(
                Request::get("/fapi/v1/trade/asyn/id")
                    .params(Params::new().with("downloadId", download_id))
                    .signed(),
            )
            .await
    }

    /// Request an async download id for the order history in the range.
    #[instrument(skip(self))]
    pub async fn order_download_id(
        &self,
        start_time: u64,
        end_time: u64,
    ) -> Result<Value, ClientError> {
        self.rest
            .send(
                Request::get("/fapi/v1/order/asyn")
                    .params(
                        Params::new()
                            .with("startTime", start_time)
                            .with("endTime", end_time),
                    )
                    .signed(),
            )
            .await
    }

    #[instrument(skip(self), fields(download_id = %download_id))]
    pub async fn order_download_link(&self, download_id: &str) -> Result<Value, ClientError> {
        self.rest
            .send(
                Request::get("/fapi/v1/order/asyn/id")
                    .params(Params::new().with("downloadId", download_id))
                    .signed(),
            )
            .await
    }

    #[instrument(skip(self), fields(symbol = %symbol, order_id = order_id))]
    pub async fn order_amendment(&self, symbol: &str, order_id: u64) -> Result<Value, ClientError> {
        self.rest
            .send(
                Request::get("/fapi/v1/orderAmendment")
                    .params(Params::new().with("symbol", symbol).with("orderId", order_id))
                    .signed(),
            )
            .await
    }
}
