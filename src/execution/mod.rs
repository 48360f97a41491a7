//! Execution layer - translate, sign, hand off

pub mod ids;

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::{ActionSink, BestBidOffer, Error, OrderRequest, OrderTranslator, Result, Symbol};

pub use ids::{ClientIdGenerator, Clock, NonceSource, SystemClock};

/// Order gateway - one translator, one transport sink
pub struct OrderGateway {
    translator: Arc<dyn OrderTranslator>,
    sink: Arc<dyn ActionSink>,
    /// Submitted requests by client order id
    submitted: RwLock<HashMap<String, OrderRequest>>,
}

impl OrderGateway {
    pub fn new(translator: Arc<dyn OrderTranslator>, sink: Arc<dyn ActionSink>) -> Self {
        Self {
            translator,
            sink,
            submitted: RwLock::new(HashMap::new()),
        }
    }

    /// Place an order, returning its client order id
    pub async fn place_order(&self, order: OrderRequest, bbo: Option<BestBidOffer>) -> Result<String> {
        info!(
            venue = %self.translator.venue(),
            "Placing order: {} {} {} {} @ {:?}",
            order.kind, order.side, order.size, order.symbol, order.limit_price
        );

        let action = self.translator.translate(&order, bbo.as_ref())?;
        let cloid = action
            .client_order_ids
            .first()
            .cloned()
            .ok_or_else(|| Error::Signing("translator returned no client order id".into()))?;

        if let Err(e) = self.sink.submit(&action).await {
            warn!(%cloid, "Order handoff failed: {}", e);
            return Err(e);
        }

        self.submitted.write().insert(cloid.clone(), order);
        Ok(cloid)
    }

    /// Cancel by venue order id
    pub async fn cancel_order(&self, symbol: &Symbol, order_id: &str) -> Result<()> {
        let action = self.translator.cancel(symbol, order_id)?;
        self.sink.submit(&action).await
    }

    /// Cancel a previously placed order by its client order id
    pub async fn cancel_by_client_id(&self, client_order_id: &str) -> Result<()> {
        let symbol = self
            .submitted
            .read()
            .get(client_order_id)
            .map(|o| o.symbol.clone())
            .ok_or_else(|| Error::validation(format!("unknown client order id {}", client_order_id)))?;
        let action = self.translator.cancel_by_client_id(&symbol, client_order_id)?;
        self.sink.submit(&action).await
    }

    /// Get a submitted request by client order id
    pub fn get_order(&self, client_order_id: &str) -> Option<OrderRequest> {
        self.submitted.read().get(client_order_id).cloned()
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted.read().len()
    }
}
