//! Record validation applied before any store write

use super::PriceRecord;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// Zero price sentinel the upstream sends for unquoted symbols
const ZERO_SENTINEL: &str = "0";

/// Reasons a record is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("symbol is empty")]
    EmptySymbol,
    #[error("price is empty")]
    EmptyPrice,
    #[error("price is the zero sentinel")]
    ZeroPrice,
    #[error("price is not a decimal number: {0}")]
    NotANumber(String),
    #[error("price is not positive: {0}")]
    NonPositive(String),
}

/// Check that a record can be stored
pub fn validate(record: &PriceRecord) -> Result<(), ValidationError> {
    if record.symbol.trim().is_empty() {
        return Err(ValidationError::EmptySymbol);
    }

    let price = record.price.trim();
    if price.is_empty() {
        return Err(ValidationError::EmptyPrice);
    }
    if price == ZERO_SENTINEL {
        return Err(ValidationError::ZeroPrice);
    }

    let value =
        Decimal::from_str(price).map_err(|_| ValidationError::NotANumber(price.to_string()))?;
    if value <= Decimal::ZERO {
        return Err(ValidationError::NonPositive(price.to_string()));
    }

    Ok(())
}
