//! Perp universe snapshot (`{"type":"meta"}` info response) -> registry entries

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::{Error, InstrumentKind, Result, Symbol, Venue};
use crate::registry::{InstrumentDescriptor, SnapshotEntry};

#[derive(Debug, Deserialize)]
struct Meta {
    universe: Vec<UniverseEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UniverseEntry {
    name: String,
    sz_decimals: u32,
    #[serde(default)]
    max_leverage: Option<u32>,
    #[serde(default)]
    only_isolated: bool,
    #[serde(default)]
    is_delisted: bool,
}

/// Parse a `meta` response, or the `[meta, assetCtxs]` pair from `metaAndAssetCtxs`.
///
/// Asset index is the position in the full universe, delisted rows included,
/// because that is what order actions reference.
pub fn parse_meta(json: &str) -> Result<Vec<SnapshotEntry>> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| Error::Parse(format!("meta is not JSON: {}", e)))?;
    let meta_value = match value {
        serde_json::Value::Array(mut parts) if !parts.is_empty() => parts.swap_remove(0),
        other => other,
    };
    let meta: Meta = serde_json::from_value(meta_value)
        .map_err(|e| Error::Parse(format!("bad meta: {}", e)))?;

    meta.universe
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            if entry.sz_decimals > 18 {
                return Err(Error::Parse(format!(
                    "{}: szDecimals {} out of range",
                    entry.name, entry.sz_decimals
                )));
            }
            // one size unit; price decimals are derived from the same scale
            let unit = Decimal::new(1, entry.sz_decimals);
            let descriptor = InstrumentDescriptor {
                symbol: Symbol::perp(&entry.name),
                venue_symbol: Symbol::new(entry.name),
                venue: Venue::Hyperliquid,
                kind: InstrumentKind::Perpetual,
                tick_size: unit,
                size_increment: unit,
                asset_index: index as u32,
                max_leverage: entry.max_leverage,
                max_funding_rate: None,
                only_isolated: entry.only_isolated,
            };
            Ok(SnapshotEntry {
                descriptor,
                restriction: entry.is_delisted.then(|| "isDelisted".to_string()),
            })
        })
        .collect()
}
