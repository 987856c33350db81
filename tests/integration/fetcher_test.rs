//! Integration tests for the market API client against a local stub

use axum::extract::Query;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::get;
use axum::Router;
use market_tracker::market::{
    FetchError, MarketClient, MarketClientConfig, MarketFetcher, DEFAULT_USER_AGENT,
};
use market_tracker::price::Category;
use std::collections::HashMap;
use std::time::Duration;

const SNAPSHOT: &str = r#"{
    "gold": [
        {"date": "1403/10/01", "time": "12:30", "symbol": "IR_GOLD_18K", "name": "18K Gold", "price": 6543000, "unit": "toman"}
    ],
    "currency": [
        {"date": "1403/10/01", "time": "12:31", "symbol": "USD", "name_en": "US Dollar", "price": "82150", "unit": "toman"}
    ],
    "cryptocurrency": [
        {"date": "1403/10/01", "time": "12:32", "symbol": "SHIB", "name": "Shiba Inu", "price": 1.5e-7, "unit": "USD"}
    ],
    "count": 3
}"#;

async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(url: String, timeout: Duration) -> MarketClient {
    MarketClient::new(MarketClientConfig {
        base_url: url,
        api_key: "test-key".to_string(),
        timeout,
        ..Default::default()
    })
    .unwrap()
}

/// Stub that only answers requests carrying the expected key and user agent
async fn authenticated_snapshot(
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, String) {
    if params.get("key").map(String::as_str) != Some("test-key") {
        return (StatusCode::UNAUTHORIZED, "bad key".to_string());
    }
    let agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if agent != DEFAULT_USER_AGENT {
        return (StatusCode::BAD_REQUEST, format!("unexpected agent {}", agent));
    }
    (StatusCode::OK, SNAPSHOT.to_string())
}

#[tokio::test]
async fn test_fetch_snapshot() {
    let base = spawn_stub(Router::new().route("/prices", get(authenticated_snapshot))).await;
    let client = client(format!("{}/prices", base), Duration::from_secs(5));

    let mut records = client.fetch().await.unwrap();
    records.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    assert_eq!(records.len(), 3);

    assert_eq!(records[0].symbol, "IR_GOLD_18K");
    assert_eq!(records[0].category, Category::Gold);
    assert_eq!(records[0].price, "6543000");

    assert_eq!(records[1].symbol, "SHIB");
    assert_eq!(records[1].category, Category::Cryptocurrency);
    assert_eq!(records[1].price, "0.00000015");

    assert_eq!(records[2].symbol, "USD");
    assert_eq!(records[2].name, "US Dollar");
    assert_eq!(records[2].date, "1403/10/01");
}

#[tokio::test]
async fn test_wrong_key_is_status_error() {
    let base = spawn_stub(Router::new().route("/prices", get(authenticated_snapshot))).await;
    let client = MarketClient::new(MarketClientConfig {
        base_url: format!("{}/prices", base),
        api_key: "wrong".to_string(),
        ..Default::default()
    })
    .unwrap();

    match client.fetch().await {
        Err(FetchError::Status { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "bad key");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_is_status_error() {
    let router = Router::new().route(
        "/prices",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
    );
    let base = spawn_stub(router).await;
    let client = client(format!("{}/prices", base), Duration::from_secs(5));

    match client.fetch().await {
        Err(FetchError::Status { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let router = Router::new().route("/prices", get(|| async { "<html>oops</html>" }));
    let base = spawn_stub(router).await;
    let client = client(format!("{}/prices", base), Duration::from_secs(5));

    let result = client.fetch().await;
    assert!(matches!(result, Err(FetchError::Decode(_))), "{:?}", result);
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let router = Router::new().route(
        "/prices",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            SNAPSHOT
        }),
    );
    let base = spawn_stub(router).await;
    let client = client(format!("{}/prices", base), Duration::from_millis(200));

    let result = client.fetch().await;
    assert!(matches!(result, Err(FetchError::Request(_))), "{:?}", result);
}
