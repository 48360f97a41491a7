//! Paradex wire types.
//!
//! Numbers travel as decimal strings; several of them are `""` when unset.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::serde_util::{decimal_or_zero, opt_decimal, opt_string};
use crate::core::{Error, OrderKind, OrderRequest, Result, TimeInForce, Venue};
use crate::normalize::{format_price, format_quantity, VenuePrecision};
use crate::registry::InstrumentDescriptor;

/// `{"jsonrpc":"2.0","method":"subscription","params":{"channel":..,"data":..}}`
#[derive(Debug, Deserialize)]
pub struct SubscriptionEnvelope<'a> {
    #[serde(borrow)]
    pub method: Option<&'a str>,
    #[serde(borrow)]
    pub params: Option<SubscriptionParams<'a>>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionParams<'a> {
    #[serde(borrow)]
    pub channel: std::borrow::Cow<'a, str>,
    #[serde(borrow, default)]
    pub data: Option<&'a serde_json::value::RawValue>,
}

/// `orders.<market>` payload
#[derive(Debug, Clone, Deserialize)]
pub struct WsOrder {
    pub id: String,
    pub market: String,
    /// BUY / SELL
    pub side: String,
    /// NEW / UNTRIGGERED / OPEN / CLOSED
    pub status: String,
    #[serde(deserialize_with = "decimal_or_zero")]
    pub size: Decimal,
    #[serde(deserialize_with = "decimal_or_zero")]
    pub remaining_size: Decimal,
    #[serde(default, deserialize_with = "opt_decimal")]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "opt_decimal")]
    pub avg_fill_price: Option<Decimal>,
    #[serde(default, deserialize_with = "opt_string")]
    pub client_id: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub cancel_reason: Option<String>,
    #[serde(default)]
    pub last_updated_at: u64,
    #[serde(default)]
    pub seq_no: Option<u64>,
}

/// `fills.<market>` payload
#[derive(Debug, Clone, Deserialize)]
pub struct WsFill {
    pub id: String,
    pub market: String,
    pub order_id: String,
    pub side: String,
    #[serde(deserialize_with = "decimal_or_zero")]
    pub price: Decimal,
    #[serde(deserialize_with = "decimal_or_zero")]
    pub size: Decimal,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub fee: Decimal,
    #[serde(default, deserialize_with = "opt_string")]
    pub fee_currency: Option<String>,
    /// MAKER / TAKER
    pub liquidity: String,
    #[serde(default, deserialize_with = "opt_string")]
    pub client_id: Option<String>,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub seq_no: Option<u64>,
}

/// `account` payload
#[derive(Debug, Clone, Deserialize)]
pub struct WsAccount {
    #[serde(default, deserialize_with = "opt_string")]
    pub account: Option<String>,
    #[serde(deserialize_with = "decimal_or_zero")]
    pub account_value: Decimal,
    #[serde(deserialize_with = "decimal_or_zero")]
    pub maintenance_margin_requirement: Decimal,
    #[serde(default, deserialize_with = "opt_decimal")]
    pub initial_margin_requirement: Option<Decimal>,
    #[serde(default, deserialize_with = "opt_decimal")]
    pub free_collateral: Option<Decimal>,
    #[serde(default)]
    pub updated_at: u64,
    #[serde(default)]
    pub seq_no: Option<u64>,
}

/// Normalized order fields in Paradex REST naming, before the account signs them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderFields {
    pub market: String,
    pub side: &'static str,
    #[serde(rename = "type")]
    pub order_type: &'static str,
    pub size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_price: Option<String>,
    pub instruction: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<&'static str>,
}

impl OrderFields {
    pub fn from_request(
        order: &OrderRequest,
        descriptor: &InstrumentDescriptor,
        precision: VenuePrecision,
    ) -> Result<Self> {
        if order.size <= Decimal::ZERO {
            return Err(Error::validation(format!("size must be positive, got {}", order.size)));
        }
        let size = format_quantity(order.size, descriptor.size_increment);
        if size == "0" {
            return Err(Error::validation(format!(
                "size {} truncates to zero at increment {}",
                order.size, descriptor.size_increment
            )));
        }

        let fmt = |px: Option<Decimal>, what: &str| -> Result<String> {
            let px = px.ok_or_else(|| Error::validation(format!("{} is required", what)))?;
            Ok(format_price(px, descriptor.tick_size, precision))
        };
        let price = match order.kind {
            OrderKind::Limit | OrderKind::StopLimit => Some(fmt(order.limit_price, "limit price")?),
            OrderKind::Market | OrderKind::Stop => None,
        };
        let trigger_price = match order.kind {
            OrderKind::Stop | OrderKind::StopLimit => Some(fmt(order.trigger_price, "trigger price")?),
            OrderKind::Market | OrderKind::Limit => None,
        };

        let instruction = match (order.post_only, order.time_in_force) {
            (true, _) => "POST_ONLY",
            (false, TimeInForce::ImmediateOrCancel) => "IOC",
            (false, TimeInForce::GoodTilCanceled) => "GTC",
            (false, TimeInForce::FillOrKill) => {
                return Err(Error::Unsupported {
                    venue: Venue::Paradex.to_string(),
                    what: "FillOrKill".into(),
                });
            }
        };

        Ok(Self {
            market: descriptor.venue_symbol.as_str().to_string(),
            side: if order.side.is_buy() { "BUY" } else { "SELL" },
            order_type: match order.kind {
                OrderKind::Market => "MARKET",
                OrderKind::Limit => "LIMIT",
                OrderKind::Stop => "STOP_MARKET",
                OrderKind::StopLimit => "STOP_LIMIT",
            },
            size,
            price,
            trigger_price,
            instruction,
            client_id: order.client_order_id.clone(),
            flags: if order.reduce_only { vec!["REDUCE_ONLY"] } else { Vec::new() },
        })
    }
}
