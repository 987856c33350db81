//! End-to-end tests: stub upstream, ingestion, REST and WebSocket delivery

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use market_tracker::api::{self, AppState};
use market_tracker::hub::{BroadcastHub, HubConfig, HubHandle};
use market_tracker::ingest::Ingestor;
use market_tracker::market::{MarketClient, MarketClientConfig};
use market_tracker::store::{MemoryPriceStore, PriceStore};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upstream stub whose gold price can be changed between passes
#[derive(Clone)]
struct Upstream {
    gold_price: Arc<Mutex<String>>,
}

impl Upstream {
    fn set_gold_price(&self, price: &str) {
        *self.gold_price.lock().unwrap() = price.to_string();
    }
}

async fn snapshot(State(upstream): State<Upstream>) -> String {
    let gold = upstream.gold_price.lock().unwrap().clone();
    format!(
        r#"{{
            "gold": [{{"date": "1403/10/01", "time": "12:30", "symbol": "IR_COIN", "name": "Coin", "price": "{}", "unit": "toman"}}],
            "currency": [{{"date": "1403/10/01", "time": "12:30", "symbol": "USD", "name": "Dollar", "price": "82150", "unit": "toman"}}]
        }}"#,
        gold
    )
}

async fn listen(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr.to_string()
}

struct TestApp {
    addr: String,
    upstream: Upstream,
    store: Arc<MemoryPriceStore>,
    hub: HubHandle,
    http: reqwest::Client,
}

impl TestApp {
    async fn start() -> Self {
        let upstream = Upstream {
            gold_price: Arc::new(Mutex::new("70000000".to_string())),
        };
        let upstream_addr = listen(
            Router::new()
                .route("/market", get(snapshot))
                .with_state(upstream.clone()),
        )
        .await;

        let client = MarketClient::new(MarketClientConfig {
            base_url: format!("http://{}/market", upstream_addr),
            api_key: "e2e".to_string(),
            timeout: Duration::from_secs(5),
            ..Default::default()
        })
        .unwrap();

        let store = Arc::new(MemoryPriceStore::new());
        let hub = BroadcastHub::spawn(HubConfig::default().send_timeout(Duration::from_secs(1)));
        let ingestor = Arc::new(
            Ingestor::new(Arc::new(client), store.clone())
                .with_update_callback(hub.price_update_callback()),
        );

        let addr = listen(api::router(AppState {
            store: store.clone(),
            ingestor,
            hub: hub.clone(),
        }))
        .await;

        Self {
            addr,
            upstream,
            store,
            hub,
            http: reqwest::Client::new(),
        }
    }

    async fn connect(&self) -> WsClient {
        let (ws, _) = connect_async(format!("ws://{}/ws", self.addr)).await.unwrap();
        ws
    }

    async fn wait_for_subscribers(&self, expected: usize) {
        for _ in 0..100 {
            if self.hub.live_subscribers().await.unwrap().len() == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("hub never reached {} subscribers", expected);
    }

    async fn fetch(&self) -> serde_json::Value {
        let response = self
            .http
            .post(format!("http://{}/api/v1/prices/fetch", self.addr))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        response.json().await.unwrap()
    }

    async fn get(&self, path: &str) -> serde_json::Value {
        self.http
            .get(format!("http://{}{}", self.addr, path))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}

async fn next_update(ws: &mut WsClient) -> serde_json::Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for update")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

fn price_of<'a>(update: &'a serde_json::Value, symbol: &str) -> &'a serde_json::Value {
    update["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["symbol"] == symbol)
        .map(|r| &r["price"])
        .unwrap()
}

#[tokio::test]
async fn test_fetch_pushes_update_to_websocket_clients() {
    let app = TestApp::start().await;
    let mut first = app.connect().await;
    let mut second = app.connect().await;
    app.wait_for_subscribers(2).await;

    let body = app.fetch().await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["report"]["inserted"], 2);

    for ws in [&mut first, &mut second] {
        let update = next_update(ws).await;
        assert_eq!(update["data"].as_array().unwrap().len(), 2);
        assert_eq!(price_of(&update, "IR_COIN"), "70000000");
    }

    app.upstream.set_gold_price("71500000");
    let body = app.fetch().await;
    assert_eq!(body["report"]["changed"], 1);
    assert_eq!(body["report"]["unchanged"], 1);

    let update = next_update(&mut first).await;
    assert_eq!(price_of(&update, "IR_COIN"), "71500000");
    assert_eq!(price_of(&update, "USD"), "82150");
}

#[tokio::test]
async fn test_rest_queries_after_ingestion() {
    let app = TestApp::start().await;
    app.fetch().await;
    app.upstream.set_gold_price("71500000");
    app.fetch().await;
    app.fetch().await;

    let gold = app.get("/api/v1/prices?type=gold").await;
    assert_eq!(gold["data"][0]["price"], "71500000");

    let all = app.get("/api/v1/prices/all").await;
    assert_eq!(all["data"].as_array().unwrap().len(), 2);

    let timeline = app.get("/api/v1/prices/timeline?symbol=IR_COIN").await;
    let entries = timeline["timeline"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["price"], "71500000");
    assert_eq!(entries[1]["price"], "70000000");

    assert_eq!(app.store.history("USD", 24).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_disconnected_client_is_unregistered() {
    let app = TestApp::start().await;
    let mut leaving = app.connect().await;
    let mut staying = app.connect().await;
    app.wait_for_subscribers(2).await;

    leaving.close(None).await.unwrap();
    drop(leaving);
    app.wait_for_subscribers(1).await;

    let health = app.get("/health").await;
    assert_eq!(health["subscribers"], 1);

    app.fetch().await;
    let update = next_update(&mut staying).await;
    assert_eq!(price_of(&update, "USD"), "82150");

    staying.send(Message::Close(None)).await.unwrap();
    app.wait_for_subscribers(0).await;
}
