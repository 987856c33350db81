//! SQLite-backed price store

use super::{PriceStore, StoreResult};
use crate::price::{Category, CurrentPrice, HistoryEntry, PriceRecord};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS prices (
        symbol     TEXT NOT NULL,
        category   TEXT NOT NULL,
        name       TEXT NOT NULL DEFAULT '',
        price      TEXT NOT NULL,
        unit       TEXT NOT NULL DEFAULT '',
        date       TEXT NOT NULL DEFAULT '',
        time       TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (symbol, category)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS price_history (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        symbol      TEXT NOT NULL,
        category    TEXT NOT NULL,
        price       TEXT NOT NULL,
        recorded_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_price_history_symbol ON price_history (symbol, recorded_at)",
];

const CURRENT_COLUMNS: &str =
    "symbol, category, name, price, unit, date, time, created_at, updated_at";

/// Price store on a pooled SQLite database
#[derive(Clone)]
pub struct SqlitePriceStore {
    pool: SqlitePool,
}

impl SqlitePriceStore {
    /// Open (creating if needed) the database at `url` and ensure the schema
    ///
    /// In-memory databases are pinned to a single connection so every query
    /// sees the same data.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections.max(1));
        if in_memory {
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;
        let store = Self { pool };
        store.init_schema().await?;

        tracing::info!(url = %url, in_memory, "Opened SQLite price store");
        Ok(store)
    }

    async fn init_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn current_from_row(row: &SqliteRow) -> Result<CurrentPrice, sqlx::Error> {
    let category: String = row.try_get("category")?;
    Ok(CurrentPrice {
        symbol: row.try_get("symbol")?,
        category: Category::from_name(&category),
        name: row.try_get("name")?,
        price: row.try_get("price")?,
        unit: row.try_get("unit")?,
        date: row.try_get("date")?,
        time: row.try_get("time")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn history_from_row(row: &SqliteRow) -> Result<HistoryEntry, sqlx::Error> {
    let category: String = row.try_get("category")?;
    Ok(HistoryEntry {
        symbol: row.try_get("symbol")?,
        category: Category::from_name(&category),
        price: row.try_get("price")?,
        recorded_at: row.try_get("recorded_at")?,
    })
}

#[async_trait]
impl PriceStore for SqlitePriceStore {
    async fn latest_history_price(&self, symbol: &str) -> StoreResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT price FROM price_history
            WHERE symbol = ?1
            ORDER BY recorded_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(price,)| price))
    }

    async fn touch_current(&self, record: &PriceRecord) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE prices SET date = ?1, time = ?2, updated_at = ?3
            WHERE symbol = ?4 AND category = ?5
            "#,
        )
        .bind(&record.date)
        .bind(&record.time)
        .bind(Utc::now())
        .bind(&record.symbol)
        .bind(record.category.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_change(&self, record: &PriceRecord) -> StoreResult<()> {
        let now = Utc::now();
        // Dropping the transaction on an early return rolls it back
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO prices
                (symbol, category, name, price, unit, date, time, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            ON CONFLICT (symbol, category) DO UPDATE SET
                price = excluded.price,
                date = excluded.date,
                time = excluded.time,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&record.symbol)
        .bind(record.category.as_str())
        .bind(&record.name)
        .bind(&record.price)
        .bind(&record.unit)
        .bind(&record.date)
        .bind(&record.time)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO price_history (symbol, category, price, recorded_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&record.symbol)
        .bind(record.category.as_str())
        .bind(&record.price)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list(&self, category: &Category) -> StoreResult<Vec<CurrentPrice>> {
        let query = format!(
            "SELECT {} FROM prices WHERE category = ?1 ORDER BY symbol",
            CURRENT_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(category.as_str())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(current_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn history(&self, symbol: &str, limit: usize) -> StoreResult<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT symbol, category, price, recorded_at
            FROM price_history
            WHERE symbol = ?1
            ORDER BY recorded_at DESC, id DESC
            LIMIT ?2
            "#,
        )
        .bind(symbol)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(history_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn all(&self, category: Option<&Category>) -> StoreResult<Vec<CurrentPrice>> {
        let rows = match category {
            Some(category) => {
                let query = format!(
                    "SELECT {} FROM prices WHERE category = ?1 ORDER BY created_at DESC, symbol",
                    CURRENT_COLUMNS
                );
                sqlx::query(&query)
                    .bind(category.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let query = format!(
                    "SELECT {} FROM prices ORDER BY created_at DESC, symbol",
                    CURRENT_COLUMNS
                );
                sqlx::query(&query).fetch_all(&self.pool).await?
            }
        };

        Ok(rows
            .iter()
            .map(current_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }
}
