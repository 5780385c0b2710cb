//! Binance USD-M futures client.
//!
//! Three pieces do the real work:
//!
//! - [`core::env::Environment`] resolves a named runtime environment to its
//!   base URLs, exactly once per process.
//! - The transport kernel ([`core::kernel`]) signs and sends REST requests
//!   and runs WebSocket stream sessions.
//! - [`orders::OrderRequest`] assembles and validates order parameters.
//!
//! ```rust,no_run
//! use binance_fapi::{Credentials, Environment, OrderRequest, Side, UsdFuturesClient};
//! use rust_decimal::Decimal;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Environment::setup("testnet")?;
//! let client = UsdFuturesClient::new(config, Credentials::new("key".into(), "secret".into()))?;
//!
//! let order = OrderRequest::limit("BTCUSDT", Side::Sell, Decimal::ONE, Decimal::new(50_000, 0));
//! let placed = client.place_order(&order).await?;
//! println!("{placed}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod core;
pub mod orders;

pub use crate::core::config::Credentials;
pub use crate::core::env::{ConfigError, Environment, EnvironmentConfig, EnvironmentName};
pub use crate::core::errors::ClientError;
pub use crate::core::kernel::{
    ReqwestTransport, Request, RestClient, SessionState, StreamEvent, StreamSession,
};
pub use crate::core::params::Params;
pub use client::UsdFuturesClient;
pub use orders::{KlineInterval, MarginType, OrderRequest, OrderType, Side, TimeInForce};
