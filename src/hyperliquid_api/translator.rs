//! Generic order -> signed Hyperliquid action

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

use super::model::{
    Action, BuilderWire, BulkCancel, BulkCancelCloid, BulkOrder, CancelByCloidWire, CancelWire,
    ExchangeRequest, Grouping, LimitWire, OrderTypeWire, OrderWire, Tif, TriggerWire, Tpsl,
};
use super::signature::sign_l1_action;
use crate::core::config::HyperliquidConfig;
use crate::core::{
    BestBidOffer, Capability, CapabilitySet, Error, OrderKind, OrderRequest, OrderTranslator,
    Result, Side, SignedAction, Symbol, TimeInForce, TriggerRole, Venue,
};
use crate::execution::{ClientIdGenerator, NonceSource};
use crate::normalize::{format_price, format_quantity, VenuePrecision};
use crate::registry::{InstrumentDescriptor, InstrumentRegistry};
use crate::signer::{parse_address, Signer};

/// Everything except fill-or-kill
pub fn default_capabilities() -> CapabilitySet {
    use Capability::*;
    CapabilitySet::new(
        Venue::Hyperliquid,
        [
            MarketOrders,
            LimitOrders,
            StopOrders,
            StopLimitOrders,
            GoodTilCanceled,
            ImmediateOrCancel,
            PostOnly,
            ReduceOnly,
            ClientOrderId,
            BatchOrders,
            CancelByClientId,
        ],
    )
}

pub struct HyperliquidTranslator {
    registry: Arc<InstrumentRegistry>,
    signer: Arc<dyn Signer>,
    precision: VenuePrecision,
    slippage: Decimal,
    mainnet: bool,
    vault: Option<[u8; 20]>,
    builder: Option<BuilderWire>,
    nonces: NonceSource,
    cloids: ClientIdGenerator,
    caps: CapabilitySet,
}

impl HyperliquidTranslator {
    pub fn new(
        registry: Arc<InstrumentRegistry>,
        signer: Arc<dyn Signer>,
        config: &HyperliquidConfig,
    ) -> Result<Self> {
        let vault = config
            .vault_address
            .as_deref()
            .map(parse_address)
            .transpose()
            .map_err(|e| Error::Config(format!("vault_address: {}", e)))?;
        let builder = match &config.builder {
            Some(b) => {
                let addr = parse_address(&b.address)
                    .map_err(|e| Error::Config(format!("builder.address: {}", e)))?;
                Some(BuilderWire { b: format!("0x{}", hex::encode(addr)), f: b.fee })
            }
            None => None,
        };

        Ok(Self {
            registry,
            signer,
            precision: config.precision(),
            slippage: config.market_slippage,
            mainnet: config.mainnet,
            vault,
            builder,
            nonces: NonceSource::system(),
            cloids: ClientIdGenerator::new(config.cloid_seed),
            caps: default_capabilities(),
        })
    }

    /// Replace the nonce source (tests use a fixed clock).
    pub fn with_nonce_source(mut self, nonces: NonceSource) -> Self {
        self.nonces = nonces;
        self
    }

    pub fn registry(&self) -> &InstrumentRegistry {
        &self.registry
    }

    // ---------------------------------------------------------------------
    // Order legs
    // ---------------------------------------------------------------------

    /// Validate, price and normalize one order into a wire leg.
    ///
    /// Nothing here touches key material; every rejection happens before signing.
    pub fn build_leg(
        &self,
        order: &OrderRequest,
        descriptor: &InstrumentDescriptor,
        bbo: Option<&BestBidOffer>,
    ) -> Result<(OrderWire, String)> {
        self.caps.check(order)?;
        validate(order)?;

        let limit_px = match order.kind {
            OrderKind::Market => self.market_price(order.side, bbo)?,
            OrderKind::Stop => self.slipped(order.side, require(order.trigger_price, "trigger price")?)?,
            OrderKind::Limit | OrderKind::StopLimit => require(order.limit_price, "limit price")?,
        };

        let price = format_price(limit_px, descriptor.tick_size, self.precision);
        let size = format_quantity(order.size, descriptor.size_increment);
        if is_zero(&size) {
            return Err(Error::validation(format!(
                "size {} truncates to zero at increment {}",
                order.size, descriptor.size_increment
            )));
        }
        if is_zero(&price) {
            return Err(Error::validation(format!("price {} truncates to zero", limit_px)));
        }

        let t = match order.kind {
            OrderKind::Market => OrderTypeWire::Limit(LimitWire { tif: Tif::Ioc }),
            OrderKind::Limit => OrderTypeWire::Limit(LimitWire { tif: tif(order)? }),
            OrderKind::Stop | OrderKind::StopLimit => {
                let trigger = require(order.trigger_price, "trigger price")?;
                OrderTypeWire::Trigger(TriggerWire {
                    is_market: order.kind == OrderKind::Stop,
                    trigger_px: format_price(trigger, descriptor.tick_size, self.precision),
                    tpsl: match order.trigger_role {
                        TriggerRole::StopLoss => Tpsl::Sl,
                        TriggerRole::TakeProfit => Tpsl::Tp,
                    },
                })
            }
        };

        let cloid = match &order.client_order_id {
            Some(id) => {
                validate_cloid(id)?;
                id.to_ascii_lowercase()
            }
            None => self.cloids.next_id(),
        };

        let leg = OrderWire {
            a: descriptor.asset_index,
            b: order.side.is_buy(),
            p: price,
            s: size,
            r: order.reduce_only,
            t,
            c: Some(cloid.clone()),
        };
        Ok((leg, cloid))
    }

    fn market_price(&self, side: Side, bbo: Option<&BestBidOffer>) -> Result<Decimal> {
        let bbo = bbo.ok_or_else(|| Error::validation("market order needs a best bid/offer"))?;
        let reference = match side {
            Side::Buy => bbo.ask,
            Side::Sell => bbo.bid,
        };
        if reference <= Decimal::ZERO {
            return Err(Error::validation(format!("no usable {} side in BBO", side)));
        }
        self.slipped(side, reference)
    }

    fn slipped(&self, side: Side, reference: Decimal) -> Result<Decimal> {
        let factor = match side {
            Side::Buy => Decimal::ONE + self.slippage,
            Side::Sell => Decimal::ONE - self.slippage,
        };
        reference.checked_mul(factor).ok_or_else(|| {
            Error::validation(format!("{} with slippage {} overflows", reference, self.slippage))
        })
    }

    // ---------------------------------------------------------------------
    // Actions
    // ---------------------------------------------------------------------

    /// Translate against an already resolved descriptor.
    pub fn translate_with(
        &self,
        order: &OrderRequest,
        descriptor: &InstrumentDescriptor,
        bbo: Option<&BestBidOffer>,
    ) -> Result<SignedAction> {
        let (leg, cloid) = self.build_leg(order, descriptor, bbo)?;
        let action = Action::Order(BulkOrder {
            orders: vec![leg],
            grouping: Grouping::Na,
            builder: self.builder.clone(),
        });
        self.sign(&action, vec![cloid])
    }

    /// Several legs signed as one action (e.g. entry + TP/SL).
    pub fn translate_batch(
        &self,
        legs: &[(OrderRequest, Option<BestBidOffer>)],
        grouping: Grouping,
    ) -> Result<SignedAction> {
        if legs.is_empty() {
            return Err(Error::validation("empty order batch"));
        }
        if !self.caps.supports(Capability::BatchOrders) && legs.len() > 1 {
            return Err(Error::Unsupported {
                venue: Venue::Hyperliquid.to_string(),
                what: "BatchOrders".into(),
            });
        }

        let mut orders = Vec::with_capacity(legs.len());
        let mut cloids = Vec::with_capacity(legs.len());
        for (order, bbo) in legs {
            let descriptor = self.registry.resolve(order.symbol.as_str())?;
            let (leg, cloid) = self.build_leg(order, descriptor, bbo.as_ref())?;
            orders.push(leg);
            cloids.push(cloid);
        }

        let action = Action::Order(BulkOrder { orders, grouping, builder: self.builder.clone() });
        self.sign(&action, cloids)
    }

    fn sign(&self, action: &Action, client_order_ids: Vec<String>) -> Result<SignedAction> {
        let nonce = self.nonces.next();
        let (signature, _digest) =
            sign_l1_action(self.signer.as_ref(), action, nonce, self.vault.as_ref(), self.mainnet)?;
        let signature = signature.to_hex();

        let request = ExchangeRequest {
            action,
            nonce,
            signature: signature.clone(),
            vault_address: self.vault.map(|v| format!("0x{}", hex::encode(v))),
        };
        let payload = serde_json::to_vec(&request)?;
        debug!(nonce, legs = client_order_ids.len(), "Signed hyperliquid action");

        Ok(SignedAction {
            venue: Venue::Hyperliquid,
            nonce,
            signature,
            client_order_ids,
            payload,
        })
    }
}

impl OrderTranslator for HyperliquidTranslator {
    fn venue(&self) -> Venue {
        Venue::Hyperliquid
    }

    fn capabilities(&self) -> &CapabilitySet {
        &self.caps
    }

    fn translate(&self, order: &OrderRequest, bbo: Option<&BestBidOffer>) -> Result<SignedAction> {
        let descriptor = self.registry.resolve(order.symbol.as_str())?;
        self.translate_with(order, descriptor, bbo)
    }

    fn cancel(&self, symbol: &Symbol, order_id: &str) -> Result<SignedAction> {
        let descriptor = self.registry.resolve(symbol.as_str())?;
        let oid: u64 = order_id
            .parse()
            .map_err(|_| Error::validation(format!("order id {:?} is not numeric", order_id)))?;
        let action = Action::Cancel(BulkCancel {
            cancels: vec![CancelWire { a: descriptor.asset_index, o: oid }],
        });
        self.sign(&action, Vec::new())
    }

    fn cancel_by_client_id(&self, symbol: &Symbol, client_order_id: &str) -> Result<SignedAction> {
        let descriptor = self.registry.resolve(symbol.as_str())?;
        validate_cloid(client_order_id)?;
        let cloid = client_order_id.to_ascii_lowercase();
        let action = Action::CancelByCloid(BulkCancelCloid {
            cancels: vec![CancelByCloidWire { asset: descriptor.asset_index, cloid: cloid.clone() }],
        });
        self.sign(&action, vec![cloid])
    }
}

fn require(value: Option<Decimal>, what: &str) -> Result<Decimal> {
    value.ok_or_else(|| Error::validation(format!("{} is required", what)))
}

fn validate(order: &OrderRequest) -> Result<()> {
    if order.size <= Decimal::ZERO {
        return Err(Error::validation(format!("size must be positive, got {}", order.size)));
    }
    if order.kind.needs_limit_price() {
        let px = require(order.limit_price, "limit price")?;
        if px <= Decimal::ZERO {
            return Err(Error::validation(format!("limit price must be positive, got {}", px)));
        }
    }
    if order.kind.needs_trigger_price() {
        let px = require(order.trigger_price, "trigger price")?;
        if px <= Decimal::ZERO {
            return Err(Error::validation(format!("trigger price must be positive, got {}", px)));
        }
    }
    if order.post_only && order.kind != OrderKind::Limit {
        return Err(Error::validation("post-only applies to limit orders only"));
    }
    Ok(())
}

fn tif(order: &OrderRequest) -> Result<Tif> {
    match (order.post_only, order.time_in_force) {
        (true, TimeInForce::GoodTilCanceled) => Ok(Tif::Alo),
        (true, other) => Err(Error::validation(format!("post-only conflicts with {:?}", other))),
        (false, TimeInForce::GoodTilCanceled) => Ok(Tif::Gtc),
        (false, TimeInForce::ImmediateOrCancel) => Ok(Tif::Ioc),
        (false, TimeInForce::FillOrKill) => Err(Error::Unsupported {
            venue: Venue::Hyperliquid.to_string(),
            what: "FillOrKill".into(),
        }),
    }
}

/// 128-bit hex: `0x` + 32 hex digits
fn validate_cloid(id: &str) -> Result<()> {
    let ok = id
        .strip_prefix("0x")
        .is_some_and(|h| h.len() == 32 && h.bytes().all(|b| b.is_ascii_hexdigit()));
    if ok {
        Ok(())
    } else {
        Err(Error::validation(format!("client order id {:?} is not 128-bit hex", id)))
    }
}

fn is_zero(s: &str) -> bool {
    s.trim_start_matches('-') == "0"
}
