//! Price record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Market category a symbol is quoted under
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Gold coins and bullion
    Gold,
    /// Fiat currencies
    Currency,
    /// Crypto assets
    Cryptocurrency,
    /// Any other category name the upstream sends
    Other(String),
}

impl Category {
    /// Parse a category name, case-insensitively
    pub fn from_name(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        match name.as_str() {
            "gold" => Category::Gold,
            "currency" => Category::Currency,
            "cryptocurrency" => Category::Cryptocurrency,
            _ => Category::Other(name),
        }
    }

    /// Canonical lowercase name
    pub fn as_str(&self) -> &str {
        match self {
            Category::Gold => "gold",
            Category::Currency => "currency",
            Category::Cryptocurrency => "cryptocurrency",
            Category::Other(name) => name,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Category::from_name(s))
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Category::from_name(&name))
    }
}

/// A normalized price observation from the market feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Ticker symbol (e.g., "IR_GOLD_18K")
    pub symbol: String,
    /// Category the symbol was listed under
    #[serde(rename = "type")]
    pub category: Category,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Price as decimal text, never in exponent notation
    pub price: String,
    /// Quote unit (e.g., "تومان", "USD")
    #[serde(default)]
    pub unit: String,
    /// Upstream observation date
    #[serde(default)]
    pub date: String,
    /// Upstream observation time
    #[serde(default)]
    pub time: String,
}

impl PriceRecord {
    /// Create a record with empty name, unit and observation fields
    pub fn new(symbol: impl Into<String>, category: Category, price: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            category,
            name: String::new(),
            price: price.into(),
            unit: String::new(),
            date: String::new(),
            time: String::new(),
        }
    }

    /// Set the upstream observation date and time
    pub fn observed(mut self, date: impl Into<String>, time: impl Into<String>) -> Self {
        self.date = date.into();
        self.time = time.into();
        self
    }
}

/// Latest known price for a `(symbol, category)` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentPrice {
    pub symbol: String,
    #[serde(rename = "type")]
    pub category: Category,
    pub name: String,
    pub price: String,
    pub unit: String,
    pub date: String,
    pub time: String,
    /// When the row was first inserted
    pub created_at: DateTime<Utc>,
    /// Last time the row was written or refreshed
    pub updated_at: DateTime<Utc>,
}

/// One detected price change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub symbol: String,
    #[serde(rename = "type")]
    pub category: Category,
    pub price: String,
    pub recorded_at: DateTime<Utc>,
}
