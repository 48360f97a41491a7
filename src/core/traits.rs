//! Core traits - Zero-cost abstractions for extensibility

use async_trait::async_trait;
use std::fmt::Debug;

use crate::core::capabilities::CapabilitySet;
use crate::core::{types::*, Result};

/// Outcome of looking at one inbound frame from a stream's point of view.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified<E> {
    /// Not this stream's message shape; dropped without logging
    NotApplicable,
    /// Right discriminator, unusable payload
    Malformed(String),
    /// One frame may carry several events (batched fills)
    Parsed(Vec<E>),
}

impl<E> Classified<E> {
    pub fn parsed(event: E) -> Self {
        Classified::Parsed(vec![event])
    }

    pub fn is_applicable(&self) -> bool {
        !matches!(self, Classified::NotApplicable)
    }
}

/// Typed event flowing through a dispatcher
pub trait StreamEvent: Send + Sync + 'static {
    type Kind: Copy + Eq + Debug + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;

    /// Venue identifier used for exactly-once delivery, if this event needs it
    fn dedup_key(&self) -> Option<&str> {
        None
    }
}

impl StreamEvent for UpdateEvent {
    type Kind = UpdateKind;

    fn kind(&self) -> UpdateKind {
        match self {
            UpdateEvent::OrderStatus(_) => UpdateKind::OrderStatus,
            UpdateEvent::AccountState(_) => UpdateKind::AccountState,
            UpdateEvent::Fill(_) => UpdateKind::Fill,
        }
    }

    fn dedup_key(&self) -> Option<&str> {
        match self {
            UpdateEvent::Fill(fill) => Some(&fill.fill_id),
            _ => None,
        }
    }
}

/// Turns raw venue text into typed events for one logical stream
pub trait StreamParser: Send + Sync + 'static {
    type Event: StreamEvent;

    /// Stream name for logs ("hyperliquid.userFills")
    fn name(&self) -> &str;

    fn classify(&self, raw: &str) -> Classified<Self::Event>;
}

/// Subscriber to a dispatcher. Errors and panics are caught and logged by the pool.
pub trait Listener<E>: Send + Sync + 'static {
    fn on_event(&self, event: &E) -> anyhow::Result<()>;
}

impl<E, F> Listener<E> for F
where
    F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
{
    fn on_event(&self, event: &E) -> anyhow::Result<()> {
        self(event)
    }
}

/// Generic order -> signed venue-native action
pub trait OrderTranslator: Send + Sync {
    fn venue(&self) -> Venue;

    fn capabilities(&self) -> &CapabilitySet;

    /// Market orders need `bbo` to synthesize an aggressive limit price.
    fn translate(&self, order: &OrderRequest, bbo: Option<&BestBidOffer>) -> Result<SignedAction>;

    fn cancel(&self, symbol: &Symbol, order_id: &str) -> Result<SignedAction>;

    fn cancel_by_client_id(&self, symbol: &Symbol, client_order_id: &str) -> Result<SignedAction>;
}

/// Transport seam: receives fully prepared, signed payloads
#[async_trait]
pub trait ActionSink: Send + Sync {
    async fn submit(&self, action: &SignedAction) -> Result<()>;
}
