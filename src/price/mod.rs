//! Price domain model
//!
//! Normalized price records as they come off the market feed, the rows the
//! store keeps for them, and the checks a record must pass before any write.

mod types;
mod validation;

pub use types::{Category, CurrentPrice, HistoryEntry, PriceRecord};
pub use validation::{validate, ValidationError};
