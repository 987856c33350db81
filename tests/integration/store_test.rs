//! Integration tests for the SQLite price store

use market_tracker::ingest::{PriceUpserter, UpsertError, UpsertOutcome};
use market_tracker::price::{Category, PriceRecord};
use market_tracker::store::{PriceStore, SqlitePriceStore};
use std::path::Path;
use std::sync::Arc;

async fn open(path: &Path) -> Arc<SqlitePriceStore> {
    let url = format!("sqlite://{}", path.display());
    Arc::new(SqlitePriceStore::connect(&url, 4).await.unwrap())
}

fn coin(price: &str) -> PriceRecord {
    PriceRecord::new("IR_COIN_EMAMI", Category::Gold, price).observed("1403/10/01", "12:30")
}

#[tokio::test]
async fn test_change_detection_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir.path().join("prices.db")).await;
    let upserter = PriceUpserter::new(store.clone());

    assert_eq!(upserter.upsert(&coin("100")).await.unwrap(), UpsertOutcome::Inserted);
    assert_eq!(upserter.upsert(&coin("105")).await.unwrap(), UpsertOutcome::Changed);
    assert_eq!(upserter.upsert(&coin("105")).await.unwrap(), UpsertOutcome::Unchanged);

    let history = store.history("IR_COIN_EMAMI", 10).await.unwrap();
    let prices: Vec<&str> = history.iter().map(|h| h.price.as_str()).collect();
    assert_eq!(prices, vec!["105", "100"]);

    let current = store.list(&Category::Gold).await.unwrap();
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].price, "105");
    assert!(current[0].updated_at >= current[0].created_at);
}

#[tokio::test]
async fn test_textual_comparison() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir.path().join("prices.db")).await;
    let upserter = PriceUpserter::new(store.clone());

    upserter.upsert(&coin("100")).await.unwrap();
    assert_eq!(upserter.upsert(&coin("100.0")).await.unwrap(), UpsertOutcome::Changed);
    assert_eq!(store.history("IR_COIN_EMAMI", 10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_invalid_records_never_written() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir.path().join("prices.db")).await;
    let upserter = PriceUpserter::new(store.clone());

    for price in ["", "0"] {
        let result = upserter.upsert(&coin(price)).await;
        assert!(matches!(result, Err(UpsertError::Invalid { .. })));
    }
    assert!(store.all(None).await.unwrap().is_empty());
    assert!(store.history("IR_COIN_EMAMI", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prices.db");

    {
        let store = open(&path).await;
        let upserter = PriceUpserter::new(store);
        upserter.upsert(&coin("100")).await.unwrap();
        upserter.upsert(&coin("110")).await.unwrap();
    }

    let store = open(&path).await;
    let upserter = PriceUpserter::new(store.clone());
    assert_eq!(upserter.upsert(&coin("110")).await.unwrap(), UpsertOutcome::Unchanged);
    assert_eq!(store.history("IR_COIN_EMAMI", 10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_batch_and_queries() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir.path().join("prices.db")).await;
    let upserter = PriceUpserter::new(store.clone());

    let batch = vec![
        PriceRecord::new("USD", Category::Currency, "82150"),
        PriceRecord::new("EUR", Category::Currency, "89000"),
        PriceRecord::new("BTC", Category::Cryptocurrency, "0"),
        PriceRecord::new("IR_GOLD_18K", Category::Gold, "6543000"),
        PriceRecord::new("ETH", Category::Cryptocurrency, "3400.25"),
    ];
    let report = upserter.upsert_batch(&batch).await;
    assert_eq!(report.inserted, 4);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].symbol, "BTC");

    let currencies = store.list(&Category::Currency).await.unwrap();
    let symbols: Vec<&str> = currencies.iter().map(|c| c.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["EUR", "USD"]);

    assert_eq!(store.all(None).await.unwrap().len(), 4);
    let crypto = store.all(Some(&Category::Cryptocurrency)).await.unwrap();
    assert_eq!(crypto.len(), 1);
    assert_eq!(crypto[0].price, "3400.25");
}

#[tokio::test]
async fn test_history_limit_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir.path().join("prices.db")).await;
    let upserter = PriceUpserter::new(store.clone());

    for price in ["1", "2", "3", "4", "5"] {
        upserter.upsert(&coin(price)).await.unwrap();
    }

    let history = store.history("IR_COIN_EMAMI", 3).await.unwrap();
    let prices: Vec<&str> = history.iter().map(|h| h.price.as_str()).collect();
    assert_eq!(prices, vec!["5", "4", "3"]);
    assert!(store.history("UNKNOWN", 3).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_history_insert_rolls_back_current_row() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prices.db");
    let store = open(&path).await;
    let upserter = PriceUpserter::new(store.clone());
    upserter.upsert(&coin("100")).await.unwrap();

    // Make every history insert fail from a second connection
    let admin = sqlx::SqlitePool::connect(&format!("sqlite://{}", path.display()))
        .await
        .unwrap();
    sqlx::query(
        "CREATE TRIGGER reject_history BEFORE INSERT ON price_history \
         BEGIN SELECT RAISE(ABORT, 'history locked'); END",
    )
    .execute(&admin)
    .await
    .unwrap();

    let result = upserter.upsert(&coin("105")).await;
    assert!(matches!(result, Err(UpsertError::Store { .. })), "{:?}", result);

    let usd = PriceRecord::new("USD", Category::Currency, "82150");
    let result = upserter.upsert(&usd).await;
    assert!(matches!(result, Err(UpsertError::Store { .. })), "{:?}", result);

    // Neither the overwrite nor the insert of the current row survived
    let rows = store.all(None).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].symbol, "IR_COIN_EMAMI");
    assert_eq!(rows[0].price, "100");
    assert_eq!(store.history("IR_COIN_EMAMI", 10).await.unwrap().len(), 1);
    assert!(store.history("USD", 10).await.unwrap().is_empty());
}
