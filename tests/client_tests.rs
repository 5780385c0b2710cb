use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use binance_fapi::{
    ClientError, KlineInterval, MarginType, OrderRequest, Request, RestClient, Side,
    UsdFuturesClient,
};
use reqwest::Method;
use rust_decimal::Decimal;
use serde_json::{json, Value};

/// Records every request descriptor and replies with a canned value.
#[derive(Clone)]
struct RecordingTransport {
    seen: Arc<Mutex<Vec<Request>>>,
    reply: Value,
}

impl RecordingTransport {
    fn new(reply: Value) -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
            reply,
        }
    }

    fn requests(&self) -> Vec<Request> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl RestClient for RecordingTransport {
    async fn send(&self, request: Request) -> Result<Value, ClientError> {
        self.seen.lock().unwrap().push(request);
        Ok(self.reply.clone())
    }
}

#[tokio::test]
async fn endpoint_descriptors_match_contract() {
    let transport = RecordingTransport::new(json!({}));
    let client = UsdFuturesClient::with_transport(transport.clone());

    client.all_orders("BTCUSDT").await.unwrap();
    client.open_orders("BTCUSDT").await.unwrap();
    client.update_leverage("BTCUSDT", 10).await.unwrap();
    client.start_user_data_stream().await.unwrap();
    client.keepalive_user_data_stream().await.unwrap();
    client.exchange_info().await.unwrap();
    client.balances().await.unwrap();
    client
        .update_margin_type("BTCUSDT", MarginType::Isolated)
        .await
        .unwrap();
    client.position_risk("BTCUSDT").await.unwrap();
    client.ticker_24h(None).await.unwrap();
    client.ticker_24h(Some("BTCUSDT")).await.unwrap();
    client.cancel_all_open_orders("BTCUSDT").await.unwrap();
    client.user_trades("BTCUSDT", Some(1), Some(2)).await.unwrap();
    client.trade_download_id(1, 2).await.unwrap();
    client.trade_download_link("abc").await.unwrap();
    client.order_download_id(1, 2).await.unwrap();
    client.order_download_link("abc").await.unwrap();
    client.order_amendment("BTCUSDT", 42).await.unwrap();

    let requests = transport.requests();

    let expect = [
        (Method::GET, "/fapi/v1/allOrders", true),
        (Method::GET, "/fapi/v1/openOrders", true),
        (Method::POST, "/fapi/v1/leverage", true),
        (Method::POST, "/fapi/v1/listenKey", false),
        (Method::PUT, "/fapi/v1/listenKey", false),
        (Method::GET, "/fapi/v1/exchangeInfo", false),
        (Method::GET, "/fapi/v2/balance", true),
        (Method::POST, "/fapi/v1/marginType", true),
        (Method::GET, "/fapi/v2/positionRisk", true),
        (Method::GET, "/fapi/v1/ticker/24hr", false),
        (Method::GET, "/fapi/v1/ticker/24hr", false),
        (Method::DELETE, "/fapi/v1/allOpenOrders", true),
        (Method::GET, "/fapi/v1/userTrades", true),
        (Method::GET, "/fapi/v1/trade/asyn", true),
        (Method::GET, "/fapi/v1/trade/asyn/id", true),
        (Method::GET, "/fapi/v1/order/asyn", true),
        (Method::GET, "/fapi/v1/order/asyn/id", true),
        (Method::GET, "/fapi/v1/orderAmendment", true),
    ];

    assert_eq!(requests.len(), expect.len());
    for (request, (method, path, signed)) in requests.iter().zip(expect.iter()) {
        assert_eq!(&request.method, method, "method for {}", path);
        assert_eq!(request.path, *path);
        assert_eq!(request.sign, *signed, "sign flag for {}", path);
    }

    // Spot checks on params.
    assert_eq!(requests[0].params.encode(), "symbol=BTCUSDT");
    assert_eq!(requests[2].params.encode(), "symbol=BTCUSDT&leverage=10");
    assert!(requests[3].params.is_empty());
    assert_eq!(
        requests[7].params.encode(),
        "symbol=BTCUSDT&marginType=ISOLATED"
    );
    assert!(requests[9].params.is_empty());
    assert_eq!(requests[10].params.encode(), "symbol=BTCUSDT");
    assert_eq!(
        requests[12].params.encode(),
        "symbol=BTCUSDT&startTime=1&endTime=2"
    );
    assert_eq!(requests[13].params.encode(), "startTime=1&endTime=2");
    assert_eq!(requests[14].params.encode(), "downloadId=abc");
    assert_eq!(requests[17].params.encode(), "symbol=BTCUSDT&orderId=42");
}

#[tokio::test]
async fn place_limit_order_params_in_wire_order() {
    let transport = RecordingTransport::new(json!({"orderId": 1}));
    let client = UsdFuturesClient::with_transport(transport.clone());

    let order = OrderRequest::limit(
        "BTCUSDT",
        Side::Sell,
        Decimal::ONE,
        Decimal::from_str("50000").unwrap(),
    );
    client.place_order(&order).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::POST);
    assert_eq!(requests[0].path, "/fapi/v1/order");
    assert!(requests[0].sign);
    assert_eq!(
        requests[0].params.encode(),
        "symbol=BTCUSDT&side=SELL&type=LIMIT&quantity=1&timeInForce=GTC&price=50000"
    );
}

#[tokio::test]
async fn invalid_order_is_rejected_before_transport() {
    let transport = RecordingTransport::new(json!({}));
    let client = UsdFuturesClient::with_transport(transport.clone());

    let order = OrderRequest::market("BTCUSDT", Side::Buy, Decimal::ONE)
        .with_price(Decimal::from_str("50000").unwrap());
    let err = client.place_order(&order).await.unwrap_err();

    assert!(matches!(err, ClientError::InvalidOrderParameters { .. }));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn klines_defaults_limit_and_orders_params() {
    let transport = RecordingTransport::new(json!([]));
    let client = UsdFuturesClient::with_transport(transport.clone());

    client
        .klines("BTCUSDT", KlineInterval::Minutes1, None, Some(1), Some(2))
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(
        requests[0].params.encode(),
        "symbol=BTCUSDT&interval=1m&limit=1000&startTime=1&endTime=2"
    );
    assert!(!requests[0].sign);
}

#[tokio::test]
async fn decoded_decimal_strings_survive_round_trip() {
    // The exchange sends prices as strings; generic JSON decoding must not
    // truncate them, and Decimal parses them losslessly.
    let reply = json!({
        "symbol": "BTCUSDT",
        "price": "50000.12345678901234567",
        "qty": "0.00000001"
    });
    let transport = RecordingTransport::new(reply);
    let client = UsdFuturesClient::with_transport(transport.clone());

    let value = client.ticker_24h(Some("BTCUSDT")).await.unwrap();
    let price = value["price"].as_str().unwrap();
    assert_eq!(price, "50000.12345678901234567");
    assert_eq!(
        Decimal::from_str(price).unwrap().to_string(),
        "50000.12345678901234567"
    );

    let qty = value["qty"].as_str().unwrap();
    assert_eq!(Decimal::from_str(qty).unwrap().to_string(), "0.00000001");
}
