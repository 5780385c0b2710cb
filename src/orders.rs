//! Order parameter builders.
//!
//! Builders produce the flat parameter mapping for `/fapi/v1/order` and
//! enforce each order type's required/forbidden field rules. The `timestamp`
//! field is deliberately absent: the transport assigns it at send time so a
//! build-then-delay-then-send pattern cannot drift from server time.

use rust_decimal::Decimal;

use crate::core::errors::ClientError;
use crate::core::params::Params;
use crate::core::time::now_millis;

/// Offset applied to `goodTillDate` for GTD limit orders.
const LIMIT_GTD_OFFSET_MS: u64 = 660_000;
/// Offset applied to `goodTillDate` for GTD stop-market orders.
const STOP_MARKET_GTD_OFFSET_MS: u64 = 1_500_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Market,
    Limit,
    StopMarket,
    TakeProfit,
    TakeProfitMarket,
    TrailingStopMarket,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Market => "MARKET",
            Self::Limit => "LIMIT",
            Self::StopMarket => "STOP_MARKET",
            Self::TakeProfit => "TAKE_PROFIT",
            Self::TakeProfitMarket => "TAKE_PROFIT_MARKET",
            Self::TrailingStopMarket => "TRAILING_STOP_MARKET",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeInForce {
    /// Good till cancelled.
    Gtc,
    /// Good till a specified date.
    Gtd,
    Ioc,
    Fok,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gtc => "GTC",
            Self::Gtd => "GTD",
            Self::Ioc => "IOC",
            Self::Fok => "FOK",
        }
    }
}

/// One order to be placed, across all supported order types.
///
/// Use the per-type constructors; `to_params` validates the combination and
/// never silently drops or coerces a conflicting field.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub time_in_force: Option<TimeInForce>,
    pub stop_price: Option<Decimal>,
    pub reduce_only: Option<bool>,
    pub activation_price: Option<Decimal>,
    pub callback_rate: Option<Decimal>,
    pub good_till_date: bool,
}

impl OrderRequest {
    fn new(symbol: impl Into<String>, side: Side, order_type: OrderType) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            order_type,
            quantity: None,
            price: None,
            time_in_force: None,
            stop_price: None,
            reduce_only: None,
            activation_price: None,
            callback_rate: None,
            good_till_date: false,
        }
    }

    pub fn market(symbol: impl Into<String>, side: Side, quantity: Decimal) -> Self {
        let mut order = Self::new(symbol, side, OrderType::Market);
        order.quantity = Some(quantity);
        order
    }

    pub fn limit(
        symbol: impl Into<String>,
        side: Side,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        let mut order = Self::new(symbol, side, OrderType::Limit);
        order.quantity = Some(quantity);
        order.price = Some(price);
        order
    }

    pub fn stop_market(symbol: impl Into<String>, side: Side, stop_price: Decimal) -> Self {
        let mut order = Self::new(symbol, side, OrderType::StopMarket);
        order.stop_price = Some(stop_price);
        order
    }

    pub fn take_profit(
        symbol: impl Into<String>,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        stop_price: Decimal,
    ) -> Self {
        let mut order = Self::new(symbol, side, OrderType::TakeProfit);
        order.quantity = Some(quantity);
        order.price = Some(price);
        order.stop_price = Some(stop_price);
        order
    }

    pub fn take_profit_market(
        symbol: impl Into<String>,
        side: Side,
        stop_price: Decimal,
    ) -> Self {
        let mut order = Self::new(symbol, side, OrderType::TakeProfitMarket);
        order.stop_price = Some(stop_price);
        order
    }

    pub fn trailing_stop_market(
        symbol: impl Into<String>,
        side: Side,
        quantity: Decimal,
        activation_price: Decimal,
    ) -> Self {
        let mut order = Self::new(symbol, side, OrderType::TrailingStopMarket);
        order.quantity = Some(quantity);
        order.activation_price = Some(activation_price);
        order
    }

    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = Some(time_in_force);
        self
    }

    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    /// Request the good-till-date variant (LIMIT and STOP_MARKET only).
    pub fn with_good_till_date(mut self) -> Self {
        self.good_till_date = true;
        self
    }

    pub fn with_reduce_only(mut self, reduce_only: bool) -> Self {
        self.reduce_only = Some(reduce_only);
        self
    }

    pub fn with_callback_rate(mut self, callback_rate: Decimal) -> Self {
        self.callback_rate = Some(callback_rate);
        self
    }

    /// Validate and assemble the wire parameters for this order.
    pub fn to_params(&self) -> Result<Params, ClientError> {
        let mut params = Params::new()
            .with("symbol", &self.symbol)
            .with("side", self.side.as_str())
            .with("type", self.order_type.as_str());

        match self.order_type {
            OrderType::Market => {
                let quantity = self.require(self.quantity, "quantity")?;
                self.forbid(self.time_in_force.is_some(), "timeInForce")?;
                self.forbid(self.price.is_some(), "price")?;
                params.insert("quantity", quantity);
            }
            OrderType::Limit => {
                let quantity = self.require(self.quantity, "quantity")?;
                let price = self.require(self.price, "price")?;
                params.insert("quantity", quantity);
                params.insert(
                    "timeInForce",
                    self.time_in_force.unwrap_or(TimeInForce::Gtc).as_str(),
                );
                params.insert("price", price);
                if self.good_till_date {
                    params.insert("goodTillDate", now_millis()? + LIMIT_GTD_OFFSET_MS);
                    params.insert("timeInForce", TimeInForce::Gtd.as_str());
                }
            }
            OrderType::StopMarket => {
                let stop_price = self.require(self.stop_price, "stopPrice")?;
                params.insert("stopPrice", stop_price);
                params.insert("closePosition", true);
                if self.good_till_date {
                    params.insert("goodTillDate", now_millis()? + STOP_MARKET_GTD_OFFSET_MS);
                    params.insert("timeInForce", TimeInForce::Gtd.as_str());
                }
            }
            OrderType::TakeProfit => {
                let quantity = self.require(self.quantity, "quantity")?;
                let price = self.require(self.price, "price")?;
                let stop_price = self.require(self.stop_price, "stopPrice")?;
                params.insert("reduceOnly", self.reduce_only.unwrap_or(false));
                params.insert("price", price);
                params.insert("quantity", quantity);
                params.insert("stopPrice", stop_price);
            }
            OrderType::TakeProfitMarket => {
                let stop_price = self.require(self.stop_price, "stopPrice")?;
                params.insert("stopPrice", stop_price);
                params.insert("closePosition", true);
            }
            OrderType::TrailingStopMarket => {
                let quantity = self.require(self.quantity, "quantity")?;
                let activation_price = self.require(self.activation_price, "activationPrice")?;
                params.insert("activationPrice", activation_price);
                params.insert(
                    "callbackRate",
                    self.callback_rate.unwrap_or_else(|| Decimal::new(20, 1)),
                );
                params.insert("quantity", quantity);
            }
        }

        Ok(params)
    }

    fn require(&self, field: Option<Decimal>, name: &str) -> Result<Decimal, ClientError> {
        field.ok_or_else(|| {
            ClientError::invalid_order(format!(
                "{} order requires `{}`",
                self.order_type.as_str(),
                name
            ))
        })
    }

    fn forbid(&self, present: bool, name: &str) -> Result<(), ClientError> {
        if present {
            return Err(ClientError::invalid_order(format!(
                "{} order forbids `{}`",
                self.order_type.as_str(),
                name
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginType {
    Isolated,
    Crossed,
}

impl MarginType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Isolated => "ISOLATED",
            Self::Crossed => "CROSSED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KlineInterval {
    Minutes1,
    Minutes3,
    Minutes5,
    Minutes15,
    Minutes30,
    Hours1,
    Hours2,
    Hours4,
    Hours6,
    Hours8,
    Hours12,
    Days1,
    Days3,
    Weeks1,
    Months1,
}

impl KlineInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minutes1 => "1m",
            Self::Minutes3 => "3m",
            Self::Minutes5 => "5m",
            Self::Minutes15 => "15m",
            Self::Minutes30 => "30m",
            Self::Hours1 => "1h",
            Self::Hours2 => "2h",
            Self::Hours4 => "4h",
            Self::Hours6 => "6h",
            Self::Hours8 => "8h",
            Self::Hours12 => "12h",
            Self::Days1 => "1d",
            Self::Days3 => "3d",
            Self::Weeks1 => "1w",
            Self::Months1 => "1M",
        }
    }
}
