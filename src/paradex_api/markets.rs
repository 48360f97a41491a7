//! `GET /markets` snapshot -> registry entries

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::serde_util::{decimal_or_zero, opt_decimal};
use crate::core::{Error, InstrumentKind, Result, Symbol, Venue};
use crate::registry::{InstrumentDescriptor, SnapshotEntry};

#[derive(Debug, Deserialize)]
struct MarketsResponse {
    results: Vec<Market>,
}

#[derive(Debug, Deserialize)]
struct Market {
    symbol: String,
    #[serde(default)]
    base_currency: Option<String>,
    asset_kind: String,
    #[serde(deserialize_with = "decimal_or_zero")]
    price_tick_size: Decimal,
    #[serde(deserialize_with = "decimal_or_zero")]
    order_size_increment: Decimal,
    #[serde(default, deserialize_with = "opt_decimal")]
    max_funding_rate: Option<Decimal>,
    #[serde(default)]
    expiry_at: u64,
}

fn kind(asset_kind: &str) -> InstrumentKind {
    match asset_kind {
        "PERP" => InstrumentKind::Perpetual,
        "PERP_OPTION" | "OPTION" => InstrumentKind::Option,
        "FUTURE" => InstrumentKind::Future,
        _ => InstrumentKind::Spot,
    }
}

/// Parse the markets list.
///
/// Perpetuals get the common `BASE-PERP` symbol; everything else keeps the
/// venue symbol. A perpetual carrying an expiry is marked restricted.
pub fn parse_markets(json: &str) -> Result<Vec<SnapshotEntry>> {
    let response: MarketsResponse =
        serde_json::from_str(json).map_err(|e| Error::Parse(format!("bad markets response: {}", e)))?;

    response
        .results
        .into_iter()
        .enumerate()
        .map(|(index, m)| {
            if m.price_tick_size <= Decimal::ZERO || m.order_size_increment <= Decimal::ZERO {
                return Err(Error::Parse(format!("{}: tick or size increment is not positive", m.symbol)));
            }
            let kind = kind(&m.asset_kind);
            let symbol = match (&kind, m.base_currency.as_deref()) {
                (InstrumentKind::Perpetual, Some(base)) if !base.is_empty() => Symbol::perp(base),
                _ => Symbol::new(m.symbol.clone()),
            };
            let restriction = (kind == InstrumentKind::Perpetual && m.expiry_at != 0)
                .then(|| "expiry_at".to_string());

            Ok(SnapshotEntry {
                descriptor: InstrumentDescriptor {
                    symbol,
                    venue_symbol: Symbol::new(m.symbol),
                    venue: Venue::Paradex,
                    kind,
                    tick_size: m.price_tick_size,
                    size_increment: m.order_size_increment,
                    asset_index: index as u32,
                    max_leverage: None,
                    max_funding_rate: m.max_funding_rate,
                    only_isolated: false,
                },
                restriction,
            })
        })
        .collect()
}
