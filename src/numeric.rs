//! Number parsing shared by the ledger and the import path.
//!
//! Both accept a comma or a dot as decimal separator. Movement quantities go
//! through [`parse_quantity`], which fails on anything that is not a finite
//! number. Imported cells go through [`parse_lenient`], which reads the leading
//! number of a cell ("1000 g", "12,5 %AA") and yields `None` when there is none.

use crate::error::{LedgerError, LedgerResult};

fn normalize(raw: &str) -> String {
    raw.trim().replace(',', ".")
}

/// Strict parse for a movement quantity.
pub fn parse_quantity(raw: &str) -> LedgerResult<f64> {
    let text = normalize(raw);
    if text.is_empty() {
        return Err(LedgerError::invalid("quantity is required"));
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(LedgerError::invalid(format!("'{}' is not a number", raw.trim()))),
    }
}

/// Strict parse for a container count.
pub fn parse_count(raw: &str) -> LedgerResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| LedgerError::invalid(format!("'{}' is not a whole number", raw.trim())))
}

/// Reads the leading decimal number of `raw`, ignoring trailing text.
pub fn parse_lenient(raw: &str) -> Option<f64> {
    let text = normalize(raw);
    let bytes = text.as_bytes();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let mut digits = 0;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => digits += 1,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if digits == 0 {
        return None;
    }
    text[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}
