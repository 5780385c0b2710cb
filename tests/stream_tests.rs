use binance_fapi::{ClientError, SessionState, StreamEvent, StreamSession};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Accepts one connection, collects `count` text frames, replies with a
/// subscription ack, then closes.
async fn spawn_server(count: usize) -> (String, JoinHandle<Vec<Value>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        let mut frames = Vec::new();
        while let Some(Ok(message)) = ws.next().await {
            match message {
                Message::Text(text) => {
                    frames.push(serde_json::from_str(&text).unwrap());
                    if frames.len() == count {
                        ws.send(Message::Text(
                            json!({"result": null, "id": frames.len()}).to_string(),
                        ))
                        .await
                        .unwrap();
                        let _ = ws.close(None).await;
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
        frames
    });

    (format!("ws://{}", addr), handle)
}

async fn next_event(session: &mut StreamSession) -> StreamEvent {
    timeout(Duration::from_secs(5), session.next_event())
        .await
        .expect("timed out waiting for stream event")
        .expect("event channel closed")
}

#[tokio::test]
async fn subscribe_ids_increase_from_one() {
    init_tracing();
    let (url, server) = spawn_server(3).await;
    let mut session = StreamSession::connect_url(url).await.unwrap();

    assert!(matches!(next_event(&mut session).await, StreamEvent::Open));
    assert_eq!(session.state(), SessionState::Open);

    let first = session.subscribe(&["btcusdt@kline_1m"]).await.unwrap();
    let second = session.subscribe(&["ethusdt@ticker"]).await.unwrap();
    let third = session
        .subscribe(&["btcusdt@markPrice", "ethusdt@markPrice"])
        .await
        .unwrap();
    assert_eq!((first, second, third), (1, 2, 3));

    // Server saw the same ids in wire order, in SUBSCRIBE frames.
    let frames = server.await.unwrap();
    let ids: Vec<u64> = frames.iter().map(|f| f["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, [1, 2, 3]);
    for frame in &frames {
        assert_eq!(frame["method"], "SUBSCRIBE");
        assert!(frame["params"].is_array());
    }
    assert_eq!(frames[2]["params"], json!(["btcusdt@markPrice", "ethusdt@markPrice"]));

    // The ack arrives as a raw message, then the remote close surfaces.
    assert!(matches!(
        next_event(&mut session).await,
        StreamEvent::Message(_)
    ));
    assert!(matches!(next_event(&mut session).await, StreamEvent::Closed));
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn subscribe_after_close_is_rejected() {
    init_tracing();
    let (url, server) = spawn_server(1).await;
    let mut session = StreamSession::connect_url(url).await.unwrap();
    assert!(matches!(next_event(&mut session).await, StreamEvent::Open));

    session.close().await.unwrap();
    assert!(matches!(next_event(&mut session).await, StreamEvent::Closed));

    let err = session.subscribe(&["btcusdt@kline_1m"]).await.unwrap_err();
    assert!(matches!(err, ClientError::SessionNotOpen));

    server.abort();
}

#[tokio::test]
async fn new_session_restarts_id_counter() {
    init_tracing();
    let (url, server) = spawn_server(1).await;
    let session = StreamSession::connect_url(url).await.unwrap();
    assert_eq!(session.subscribe(&["btcusdt@trade"]).await.unwrap(), 1);
    server.await.unwrap();

    let (url, server) = spawn_server(1).await;
    let session = StreamSession::connect_url(url).await.unwrap();
    assert_eq!(session.subscribe(&["btcusdt@trade"]).await.unwrap(), 1);
    server.await.unwrap();
}

#[tokio::test]
async fn inbound_messages_reach_the_event_channel() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        ws.send(Message::Text(
            json!({"e": "aggTrade", "s": "BTCUSDT"}).to_string(),
        ))
        .await
        .unwrap();
        let _ = ws.close(None).await;
    });

    let mut session = StreamSession::connect_url(format!("ws://{}", addr))
        .await
        .unwrap();
    let mut events = session.take_events().unwrap();

    let mut saw_payload = false;
    while let Ok(Some(event)) = timeout(Duration::from_secs(5), events.recv()).await {
        match event {
            StreamEvent::Message(payload) => {
                let value: Value = serde_json::from_str(&payload).unwrap();
                assert_eq!(value["s"], "BTCUSDT");
                saw_payload = true;
            }
            StreamEvent::Closed => break,
            StreamEvent::Open => {}
        }
    }
    assert!(saw_payload);
    server.await.unwrap();
}
