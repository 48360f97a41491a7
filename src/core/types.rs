//! Core types - Strong typing for safety

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Supported derivatives venues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    Hyperliquid,
    Paradex,
}

impl Venue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Venue::Hyperliquid => "hyperliquid",
            Venue::Paradex => "paradex",
        }
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tradeable symbol (common "BTC-PERP" or venue-native "BTC", "BTC-USD-PERP").
///
/// Case is preserved: some venues list mixed-case coins (`kPEPE`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        let s = s.into();
        match s.trim() {
            trimmed if trimmed.len() == s.len() => Self(s),
            trimmed => Self(trimmed.to_string()),
        }
    }

    /// Common symbol for a perpetual on `base`.
    pub fn perp(base: &str) -> Self {
        Self(format!("{}-PERP", base))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::new(s)
    }
}

/// Instrument kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentKind {
    Perpetual,
    Future,
    Option,
    Spot,
}

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn is_buy(&self) -> bool {
        matches!(self, Side::Buy)
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl OrderKind {
    pub fn needs_limit_price(&self) -> bool {
        matches!(self, OrderKind::Limit | OrderKind::StopLimit)
    }

    pub fn needs_trigger_price(&self) -> bool {
        matches!(self, OrderKind::Stop | OrderKind::StopLimit)
    }
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderKind::Market => write!(f, "MARKET"),
            OrderKind::Limit => write!(f, "LIMIT"),
            OrderKind::Stop => write!(f, "STOP"),
            OrderKind::StopLimit => write!(f, "STOP_LIMIT"),
        }
    }
}

/// Order duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeInForce {
    #[default]
    GoodTilCanceled,
    ImmediateOrCancel,
    FillOrKill,
}

/// Whether a trigger order protects a position or takes profit on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerRole {
    #[default]
    StopLoss,
    TakeProfit,
}

/// Venue-agnostic order request.
///
/// Immutable once handed to a translator; the translator only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: Side,
    pub size: Decimal,
    pub kind: OrderKind,
    pub limit_price: Option<Decimal>,
    pub trigger_price: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub post_only: bool,
    pub reduce_only: bool,
    pub trigger_role: TriggerRole,
    pub client_order_id: Option<String>,
}

impl OrderRequest {
    fn base(symbol: impl Into<Symbol>, side: Side, size: Decimal, kind: OrderKind) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            size,
            kind,
            limit_price: None,
            trigger_price: None,
            time_in_force: TimeInForce::default(),
            post_only: false,
            reduce_only: false,
            trigger_role: TriggerRole::default(),
            client_order_id: None,
        }
    }

    pub fn market(symbol: impl Into<Symbol>, side: Side, size: Decimal) -> Self {
        let mut order = Self::base(symbol, side, size, OrderKind::Market);
        order.time_in_force = TimeInForce::ImmediateOrCancel;
        order
    }

    pub fn limit(symbol: impl Into<Symbol>, side: Side, size: Decimal, price: Decimal) -> Self {
        let mut order = Self::base(symbol, side, size, OrderKind::Limit);
        order.limit_price = Some(price);
        order
    }

    pub fn stop(symbol: impl Into<Symbol>, side: Side, size: Decimal, trigger: Decimal) -> Self {
        let mut order = Self::base(symbol, side, size, OrderKind::Stop);
        order.trigger_price = Some(trigger);
        order
    }

    pub fn stop_limit(
        symbol: impl Into<Symbol>,
        side: Side,
        size: Decimal,
        trigger: Decimal,
        price: Decimal,
    ) -> Self {
        let mut order = Self::base(symbol, side, size, OrderKind::StopLimit);
        order.trigger_price = Some(trigger);
        order.limit_price = Some(price);
        order
    }

    pub fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = tif;
        self
    }

    pub fn with_client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = Some(id.into());
        self
    }

    pub fn with_trigger_role(mut self, role: TriggerRole) -> Self {
        self.trigger_role = role;
        self
    }

    pub fn post_only(mut self) -> Self {
        self.post_only = true;
        self
    }

    pub fn reduce_only(mut self) -> Self {
        self.reduce_only = true;
        self
    }
}

/// Best bid/offer used to simulate market orders
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestBidOffer {
    pub bid: Decimal,
    pub ask: Decimal,
}

impl BestBidOffer {
    pub fn new(bid: Decimal, ask: Decimal) -> Self {
        Self { bid, ask }
    }
}

/// Normalized order lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    New,
    Open,
    PartiallyFilled,
    Triggered,
    Filled,
    Canceled,
    Rejected,
}

impl OrderState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Filled | OrderState::Canceled | OrderState::Rejected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Liquidity {
    Maker,
    Taker,
}

/// Order status update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub venue: Venue,
    pub symbol: Symbol,
    pub order_id: String,
    pub client_order_id: Option<String>,
    pub side: Side,
    pub state: OrderState,
    pub original_size: Decimal,
    pub remaining_size: Decimal,
    pub limit_price: Option<Decimal>,
    pub avg_fill_price: Option<Decimal>,
    pub cancel_reason: Option<String>,
    pub timestamp_ms: u64,
    pub seq: Option<u64>,
}

/// Account margin snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountUpdate {
    pub venue: Venue,
    pub account: Option<String>,
    pub account_value: Decimal,
    pub maintenance_margin: Decimal,
    pub initial_margin: Option<Decimal>,
    pub free_collateral: Option<Decimal>,
    pub timestamp_ms: u64,
    pub seq: Option<u64>,
}

/// Execution (fill) report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillUpdate {
    pub venue: Venue,
    pub fill_id: String,
    pub order_id: String,
    pub client_order_id: Option<String>,
    pub symbol: Symbol,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    pub fee: Decimal,
    pub fee_asset: Option<String>,
    pub liquidity: Liquidity,
    pub timestamp_ms: u64,
    pub seq: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    OrderStatus,
    AccountState,
    Fill,
}

/// Typed update produced from one inbound venue message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpdateEvent {
    OrderStatus(OrderUpdate),
    AccountState(AccountUpdate),
    Fill(FillUpdate),
}

impl UpdateEvent {
    pub fn venue(&self) -> Venue {
        match self {
            UpdateEvent::OrderStatus(u) => u.venue,
            UpdateEvent::AccountState(u) => u.venue,
            UpdateEvent::Fill(u) => u.venue,
        }
    }

    pub fn timestamp_ms(&self) -> u64 {
        match self {
            UpdateEvent::OrderStatus(u) => u.timestamp_ms,
            UpdateEvent::AccountState(u) => u.timestamp_ms,
            UpdateEvent::Fill(u) => u.timestamp_ms,
        }
    }

    pub fn seq(&self) -> Option<u64> {
        match self {
            UpdateEvent::OrderStatus(u) => u.seq,
            UpdateEvent::AccountState(u) => u.seq,
            UpdateEvent::Fill(u) => u.seq,
        }
    }
}

/// Signed venue-native envelope, ready for the transport.
///
/// `payload` is the exact byte snapshot that was signed over (plus envelope);
/// it is never mutated after signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedAction {
    pub venue: Venue,
    pub nonce: u64,
    pub signature: String,
    pub client_order_ids: Vec<String>,
    pub payload: Vec<u8>,
}

impl SignedAction {
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}
