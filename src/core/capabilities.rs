//! Venue capability declarations
//!
//! Built once per venue at startup and queried before an order is translated.

use std::collections::BTreeSet;

use crate::core::{Error, OrderKind, OrderRequest, Result, TimeInForce, Venue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    MarketOrders,
    LimitOrders,
    StopOrders,
    StopLimitOrders,
    GoodTilCanceled,
    ImmediateOrCancel,
    FillOrKill,
    PostOnly,
    ReduceOnly,
    ClientOrderId,
    BatchOrders,
    CancelByClientId,
}

impl Capability {
    pub fn for_kind(kind: OrderKind) -> Self {
        match kind {
            OrderKind::Market => Capability::MarketOrders,
            OrderKind::Limit => Capability::LimitOrders,
            OrderKind::Stop => Capability::StopOrders,
            OrderKind::StopLimit => Capability::StopLimitOrders,
        }
    }

    pub fn for_tif(tif: TimeInForce) -> Self {
        match tif {
            TimeInForce::GoodTilCanceled => Capability::GoodTilCanceled,
            TimeInForce::ImmediateOrCancel => Capability::ImmediateOrCancel,
            TimeInForce::FillOrKill => Capability::FillOrKill,
        }
    }
}

/// Queryable set of what a venue accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilitySet {
    venue: Venue,
    caps: BTreeSet<Capability>,
}

impl CapabilitySet {
    pub fn new(venue: Venue, caps: impl IntoIterator<Item = Capability>) -> Self {
        Self { venue, caps: caps.into_iter().collect() }
    }

    pub fn venue(&self) -> Venue {
        self.venue
    }

    pub fn supports(&self, cap: Capability) -> bool {
        self.caps.contains(&cap)
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.caps.iter().copied()
    }

    fn require(&self, cap: Capability) -> Result<()> {
        if self.supports(cap) {
            Ok(())
        } else {
            Err(Error::Unsupported {
                venue: self.venue.to_string(),
                what: format!("{:?}", cap),
            })
        }
    }

    /// Check every capability the request needs.
    ///
    /// Market orders are sent as IOC limits, so their time-in-force is not checked.
    pub fn check(&self, order: &OrderRequest) -> Result<()> {
        self.require(Capability::for_kind(order.kind))?;
        if order.kind != OrderKind::Market {
            self.require(Capability::for_tif(order.time_in_force))?;
        }
        if order.post_only {
            self.require(Capability::PostOnly)?;
        }
        if order.reduce_only {
            self.require(Capability::ReduceOnly)?;
        }
        if order.client_order_id.is_some() {
            self.require(Capability::ClientOrderId)?;
        }
        Ok(())
    }
}
