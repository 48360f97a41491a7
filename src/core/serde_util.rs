//! Serde helpers for venues that send decimals as strings.
//!
//! Some numeric fields arrive as `""` when the venue has no value; those read as zero.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

#[derive(Deserialize)]
#[serde(untagged)]
enum Raw {
    Str(String),
    Num(serde_json::Number),
    Null,
}

fn parse<E: serde::de::Error>(raw: Raw) -> Result<Option<Decimal>, E> {
    match raw {
        Raw::Null => Ok(None),
        Raw::Str(s) if s.trim().is_empty() => Ok(None),
        Raw::Str(s) => Decimal::from_str(s.trim())
            .or_else(|_| Decimal::from_scientific(s.trim()))
            .map(Some)
            .map_err(|e| E::custom(format!("invalid decimal {:?}: {}", s, e))),
        Raw::Num(n) => {
            let s = n.to_string();
            Decimal::from_str(&s)
                .or_else(|_| Decimal::from_scientific(&s))
                .map(Some)
                .map_err(|e| E::custom(format!("invalid decimal {}: {}", s, e)))
        }
    }
}

/// Decimal string; empty string or null reads as zero.
pub fn decimal_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<Decimal, D::Error> {
    let raw = Raw::deserialize(d)?;
    Ok(parse(raw)?.unwrap_or(Decimal::ZERO))
}

/// Decimal string; empty string or null reads as `None`.
pub fn opt_decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Decimal>, D::Error> {
    let raw = Raw::deserialize(d)?;
    parse(raw)
}

/// Empty string reads as `None`.
pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let s: Option<String> = Option::deserialize(d)?;
    Ok(s.filter(|s| !s.is_empty()))
}
