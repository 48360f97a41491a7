//! Hyperliquid wire types.
//!
//! Field order in the outbound structs is part of the signature: actions are
//! msgpack-encoded in declaration order before hashing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Outbound actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    Order(BulkOrder),
    Cancel(BulkCancel),
    CancelByCloid(BulkCancelCloid),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkOrder {
    pub orders: Vec<OrderWire>,
    pub grouping: Grouping,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub builder: Option<BuilderWire>,
}

/// One order leg
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderWire {
    /// Asset index
    pub a: u32,
    /// Is buy
    pub b: bool,
    /// Price
    pub p: String,
    /// Size
    pub s: String,
    /// Reduce only
    pub r: bool,
    /// Order type
    pub t: OrderTypeWire,
    /// Client order id (128-bit hex)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderTypeWire {
    Limit(LimitWire),
    Trigger(TriggerWire),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LimitWire {
    pub tif: Tif,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tif {
    /// Add liquidity only (post-only)
    Alo,
    Ioc,
    Gtc,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerWire {
    pub is_market: bool,
    pub trigger_px: String,
    pub tpsl: Tpsl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tpsl {
    Tp,
    Sl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Grouping {
    #[default]
    Na,
    NormalTpsl,
    PositionTpsl,
}

/// Fee-sharing block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuilderWire {
    /// Lowercase builder address
    pub b: String,
    /// Fee in tenths of a basis point
    pub f: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkCancel {
    pub cancels: Vec<CancelWire>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CancelWire {
    pub a: u32,
    pub o: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkCancelCloid {
    pub cancels: Vec<CancelByCloidWire>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancelByCloidWire {
    pub asset: u32,
    pub cloid: String,
}

/// Outer envelope posted to `/exchange`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRequest<'a> {
    pub action: &'a Action,
    pub nonce: u64,
    pub signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_address: Option<String>,
}

// ---------------------------------------------------------------------------
// Inbound subscription payloads
// ---------------------------------------------------------------------------

/// `orderUpdates` element
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsOrderUpdate {
    pub order: WsBasicOrder,
    pub status: String,
    pub status_timestamp: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsBasicOrder {
    pub coin: String,
    /// "B" bid / "A" ask
    pub side: String,
    pub limit_px: Decimal,
    /// Remaining size
    pub sz: Decimal,
    pub oid: u64,
    pub timestamp: u64,
    pub orig_sz: Decimal,
    #[serde(default)]
    pub cloid: Option<String>,
}

/// `userFills` payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsUserFills {
    #[serde(default)]
    pub is_snapshot: bool,
    #[serde(default)]
    pub user: Option<String>,
    pub fills: Vec<WsFill>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsFill {
    pub coin: String,
    pub px: Decimal,
    pub sz: Decimal,
    pub side: String,
    pub time: u64,
    pub oid: u64,
    /// Taker when true
    pub crossed: bool,
    pub fee: Decimal,
    /// Trade id; the dedup key
    #[serde(default)]
    pub tid: Option<u64>,
    #[serde(default)]
    pub fee_token: Option<String>,
    #[serde(default)]
    pub cloid: Option<String>,
}

/// `webData2` payload (only the margin part is read)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsWebData {
    pub clearinghouse_state: ClearinghouseState,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearinghouseState {
    pub margin_summary: MarginSummary,
    pub cross_maintenance_margin_used: Decimal,
    #[serde(default)]
    pub withdrawable: Option<Decimal>,
    #[serde(default)]
    pub time: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginSummary {
    pub account_value: Decimal,
    pub total_margin_used: Decimal,
}
