//! Delta decoding
//!
//! Converts raw `(price, size)` text pairs from the feed into typed levels.

use super::PriceLevel;
use rust_decimal::Decimal;
use thiserror::Error;

/// A raw level as carried on the wire: `[price_text, size_text]`
pub type RawLevel = (String, String);

/// A raw level that could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed level #{index} [{price:?}, {size:?}]: invalid {field}: {reason}")]
pub struct DecodeError {
    /// Position of the tuple within its side of the batch
    pub index: usize,
    /// Raw price text
    pub price: String,
    /// Raw size text
    pub size: String,
    /// Which element failed ("price" or "size")
    pub field: &'static str,
    /// Parser message
    pub reason: String,
}

/// Result of decoding one side of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedBatch {
    /// Successfully decoded levels, in input order
    pub levels: Vec<PriceLevel>,
    /// Tuples that were dropped
    pub errors: Vec<DecodeError>,
}

impl DecodedBatch {
    /// True if every tuple decoded
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Decode a single raw tuple at `index`
pub fn decode_level(index: usize, raw: &RawLevel) -> Result<PriceLevel, DecodeError> {
    let (price_text, size_text) = raw;
    let fail = |field: &'static str, reason: String| DecodeError {
        index,
        price: price_text.clone(),
        size: size_text.clone(),
        field,
        reason,
    };

    let price = parse_decimal(price_text).map_err(|e| fail("price", e))?;
    let size = parse_decimal(size_text).map_err(|e| fail("size", e))?;

    Ok(PriceLevel::new(price, size))
}

/// Decode all raw tuples of one side
///
/// Malformed tuples are collected in `errors`; the rest are returned in
/// input order. Never fails as a whole.
pub fn decode_levels(raw: &[RawLevel]) -> DecodedBatch {
    let mut batch = DecodedBatch {
        levels: Vec::with_capacity(raw.len()),
        errors: Vec::new(),
    };

    for (index, entry) in raw.iter().enumerate() {
        match decode_level(index, entry) {
            Ok(level) => batch.levels.push(level),
            Err(e) => batch.errors.push(e),
        }
    }

    batch
}

/// Parse decimal text, accepting plain and scientific notation.
///
/// Only ASCII digits, one decimal point, a sign and an exponent are allowed.
/// Text that `Decimal` cannot hold exactly is rejected rather than rounded.
/// The result is normalized so that "100.5" and "100.50" produce the same key.
fn parse_decimal(text: &str) -> Result<Decimal, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("empty".to_string());
    }
    if let Some(c) = text
        .chars()
        .find(|&c| !matches!(c, '0'..='9' | '.' | '+' | '-' | 'e' | 'E'))
    {
        return Err(format!("unexpected character {:?}", c));
    }

    let value = match text.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => parse_scientific(mantissa, exponent)?,
        None => parse_exact(text)?,
    };

    Ok(value.normalize())
}

/// Parse plain decimal text without rounding
fn parse_exact(text: &str) -> Result<Decimal, String> {
    Decimal::from_str_exact(trim_fraction_zeros(text)).map_err(|e| e.to_string())
}

/// Drop trailing fractional zeros so they do not count against precision
fn trim_fraction_zeros(text: &str) -> &str {
    if !text.contains('.') {
        return text;
    }
    let trimmed = text.trim_end_matches('0');
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
    if trimmed.bytes().any(|b| b.is_ascii_digit()) {
        trimmed
    } else {
        text
    }
}

/// Scale `mantissa` by ten to the `exponent`, failing if any digit is lost
fn parse_scientific(mantissa: &str, exponent: &str) -> Result<Decimal, String> {
    let mut value = parse_exact(mantissa)?.normalize();
    let exponent: i32 = exponent
        .parse()
        .map_err(|_| format!("invalid exponent {:?}", exponent))?;

    if value.is_zero() {
        return Ok(value);
    }
    if exponent.unsigned_abs() > MAX_EXPONENT {
        return Err("exponent out of range".to_string());
    }

    for _ in 0..exponent.unsigned_abs() {
        let next = if exponent > 0 {
            value.checked_mul(Decimal::TEN)
        } else {
            value.checked_div(Decimal::TEN)
        };
        let next = next.ok_or_else(|| "exponent out of range".to_string())?;

        let back = if exponent > 0 {
            next.checked_div(Decimal::TEN)
        } else {
            next.checked_mul(Decimal::TEN)
        };
        if back != Some(value) {
            return Err("too many significant digits".to_string());
        }
        value = next;
    }

    Ok(value)
}

/// Largest power of ten a `Decimal` can be scaled by without overflow or underflow
const MAX_EXPONENT: u32 = 56;
