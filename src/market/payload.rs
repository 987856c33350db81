//! Market API response parsing
//!
//! The response is a JSON object keyed by category (`gold`, `currency`,
//! `cryptocurrency`, ...) where each value is a list of quotes. Prices arrive
//! as JSON numbers or strings depending on the category, so both are folded
//! into plain decimal text here.

use crate::price::{Category, PriceRecord};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Raw quote item as sent by the upstream
#[derive(Debug, Deserialize)]
struct RawQuote {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    name_en: Option<String>,
    price: Value,
    #[serde(default)]
    unit: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    time: String,
}

/// Parse a full market response into records
///
/// Fails only if the body is not a JSON object. Top-level keys whose value is
/// not a list are ignored, and quotes that cannot be read are skipped with a
/// warning.
pub fn parse_market_response(body: &str) -> Result<Vec<PriceRecord>, serde_json::Error> {
    let root: Map<String, Value> = serde_json::from_str(body)?;
    let mut records = Vec::new();

    for (key, value) in root {
        let Value::Array(items) = value else {
            tracing::debug!(key = %key, "Ignoring non-list response field");
            continue;
        };

        let category = Category::from_name(&key);
        for item in items {
            let quote: RawQuote = match serde_json::from_value(item) {
                Ok(quote) => quote,
                Err(e) => {
                    tracing::warn!(category = %category, error = %e, "Skipping unreadable quote");
                    continue;
                }
            };

            let Some(price) = normalize_price(&quote.price) else {
                tracing::warn!(
                    category = %category,
                    symbol = %quote.symbol,
                    "Skipping quote with non-numeric price field"
                );
                continue;
            };

            records.push(PriceRecord {
                symbol: quote.symbol,
                category: category.clone(),
                name: quote.name.or(quote.name_en).unwrap_or_default(),
                price,
                unit: quote.unit,
                date: quote.date,
                time: quote.time,
            });
        }
    }

    Ok(records)
}

/// Normalize a JSON price value into decimal text
///
/// Numbers keep their source digits (serde_json is built with
/// `arbitrary_precision`), strings are trimmed, and exponent notation is
/// expanded. Returns `None` for anything that is neither a number nor a string.
pub fn normalize_price(value: &Value) -> Option<String> {
    match value {
        Value::Number(number) => Some(expand_exponent(&number.to_string())),
        Value::String(text) => Some(expand_exponent(text.trim())),
        _ => None,
    }
}

fn expand_exponent(text: &str) -> String {
    let Some(split) = text.find(['e', 'E']) else {
        return text.to_string();
    };
    match shift_decimal_point(&text[..split], &text[split + 1..]) {
        Some(expanded) => expanded,
        None => {
            tracing::warn!(price = %text, "Could not expand exponent notation");
            text.to_string()
        }
    }
}

/// Rewrite `mantissa * 10^exponent` as plain decimal text, keeping every
/// mantissa digit
fn shift_decimal_point(mantissa: &str, exponent: &str) -> Option<String> {
    const MAX_EXPONENT: i64 = 1_000;

    let (negative, unsigned) = match mantissa.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, mantissa.strip_prefix('+').unwrap_or(mantissa)),
    };
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let digits = format!("{}{}", int_part, frac_part);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let exponent: i64 = exponent.parse().ok()?;
    if exponent.abs() > MAX_EXPONENT {
        return None;
    }

    let point = int_part.len() as i64 + exponent;
    let (whole, fraction) = if point <= 0 {
        let zeros = "0".repeat(point.unsigned_abs() as usize);
        (String::new(), format!("{}{}", zeros, digits))
    } else if point as usize >= digits.len() {
        let zeros = "0".repeat(point as usize - digits.len());
        (format!("{}{}", digits, zeros), String::new())
    } else {
        let (whole, fraction) = digits.split_at(point as usize);
        (whole.to_string(), fraction.to_string())
    };

    let whole = whole.trim_start_matches('0');
    let mut out = String::with_capacity(whole.len() + fraction.len() + 3);
    if negative {
        out.push('-');
    }
    out.push_str(if whole.is_empty() { "0" } else { whole });
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(&fraction);
    }
    Some(out)
}
