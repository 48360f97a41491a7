//! Hyperliquid subscription parsers.
//!
//! Frames look like `{"channel": "<name>", "data": ...}`. Anything with a
//! different channel (pong, subscriptionResponse, other streams) is not ours.

use serde::Deserialize;
use serde_json::value::RawValue;
use std::borrow::Cow;
use tracing::warn;

use super::model::{WsOrderUpdate, WsUserFills, WsWebData};
use crate::core::{
    AccountUpdate, Classified, FillUpdate, Liquidity, OrderState, OrderUpdate, Side, StreamParser,
    Symbol, UpdateEvent, Venue,
};

#[derive(Deserialize)]
struct Envelope<'a> {
    #[serde(borrow)]
    channel: Cow<'a, str>,
    #[serde(borrow, default)]
    data: Option<&'a RawValue>,
}

/// Extract and decode `data` when `raw` belongs to `channel`.
fn decode<'a, T: Deserialize<'a>>(raw: &'a str, channel: &str) -> Classified<T> {
    let Ok(envelope) = serde_json::from_str::<Envelope<'a>>(raw) else {
        return Classified::NotApplicable;
    };
    if envelope.channel != channel {
        return Classified::NotApplicable;
    }
    let Some(data) = envelope.data else {
        return Classified::Malformed(format!("{} frame without data", channel));
    };
    match serde_json::from_str::<T>(data.get()) {
        Ok(value) => Classified::parsed(value),
        Err(e) => Classified::Malformed(format!("{}: {}", channel, e)),
    }
}

fn map<T, E>(classified: Classified<T>, f: impl FnOnce(T) -> Result<Vec<E>, String>) -> Classified<E> {
    match classified {
        Classified::NotApplicable => Classified::NotApplicable,
        Classified::Malformed(reason) => Classified::Malformed(reason),
        Classified::Parsed(mut values) => match values.pop() {
            Some(value) => match f(value) {
                Ok(events) => Classified::Parsed(events),
                Err(reason) => Classified::Malformed(reason),
            },
            None => Classified::Parsed(Vec::new()),
        },
    }
}

fn side(raw: &str) -> Result<Side, String> {
    match raw {
        "B" => Ok(Side::Buy),
        "A" => Ok(Side::Sell),
        other => Err(format!("unknown side {:?}", other)),
    }
}

/// Venue order status -> normalized state plus cancel/reject reason
fn order_state(status: &str, remaining_is_partial: bool) -> Result<(OrderState, Option<String>), String> {
    let state = match status {
        "open" if remaining_is_partial => OrderState::PartiallyFilled,
        "open" => OrderState::Open,
        "filled" => OrderState::Filled,
        "triggered" => OrderState::Triggered,
        "canceled" => return Ok((OrderState::Canceled, None)),
        "rejected" => return Ok((OrderState::Rejected, None)),
        s if s.ends_with("Canceled") || s == "scheduledCancel" => {
            return Ok((OrderState::Canceled, Some(s.to_string())));
        }
        s if s.ends_with("Rejected") => return Ok((OrderState::Rejected, Some(s.to_string()))),
        other => return Err(format!("unknown order status {:?}", other)),
    };
    Ok((state, None))
}

/// `orderUpdates` -> `OrderStatus`
#[derive(Debug, Default, Clone, Copy)]
pub struct OrderUpdatesParser;

impl StreamParser for OrderUpdatesParser {
    type Event = UpdateEvent;

    fn name(&self) -> &str {
        "hyperliquid.orderUpdates"
    }

    fn classify(&self, raw: &str) -> Classified<UpdateEvent> {
        map(decode::<Vec<WsOrderUpdate>>(raw, "orderUpdates"), |updates| {
            updates
                .into_iter()
                .map(|u| -> Result<UpdateEvent, String> {
                    let o = u.order;
                    let (state, cancel_reason) = order_state(&u.status, o.sz < o.orig_sz)?;
                    Ok(UpdateEvent::OrderStatus(OrderUpdate {
                        venue: Venue::Hyperliquid,
                        symbol: Symbol::new(o.coin),
                        order_id: o.oid.to_string(),
                        client_order_id: o.cloid,
                        side: side(&o.side)?,
                        state,
                        original_size: o.orig_sz,
                        remaining_size: o.sz,
                        limit_price: Some(o.limit_px),
                        avg_fill_price: None,
                        cancel_reason,
                        timestamp_ms: u.status_timestamp,
                        seq: None,
                    }))
                })
                .collect()
        })
    }
}

/// `userFills` -> one `Fill` per element, keyed by `tid`
#[derive(Debug, Default, Clone, Copy)]
pub struct UserFillsParser;

impl StreamParser for UserFillsParser {
    type Event = UpdateEvent;

    fn name(&self) -> &str {
        "hyperliquid.userFills"
    }

    fn classify(&self, raw: &str) -> Classified<UpdateEvent> {
        map(decode::<WsUserFills>(raw, "userFills"), |batch| {
            let total = batch.fills.len();
            let mut events = Vec::with_capacity(total);
            for fill in batch.fills {
                let Some(tid) = fill.tid else {
                    warn!(oid = fill.oid, "userFills entry without tid, skipped");
                    continue;
                };
                let side = match side(&fill.side) {
                    Ok(side) => side,
                    Err(reason) => {
                        warn!(oid = fill.oid, tid, "userFills entry skipped: {}", reason);
                        continue;
                    }
                };
                events.push(UpdateEvent::Fill(FillUpdate {
                    venue: Venue::Hyperliquid,
                    fill_id: tid.to_string(),
                    order_id: fill.oid.to_string(),
                    client_order_id: fill.cloid,
                    symbol: Symbol::new(fill.coin),
                    side,
                    price: fill.px,
                    size: fill.sz,
                    fee: fill.fee,
                    fee_asset: fill.fee_token,
                    liquidity: if fill.crossed { Liquidity::Taker } else { Liquidity::Maker },
                    timestamp_ms: fill.time,
                    seq: None,
                }));
            }
            if events.is_empty() && total > 0 {
                return Err("no usable fill in batch".into());
            }
            Ok(events)
        })
    }
}

/// `webData2` -> `AccountState` from the clearinghouse state
#[derive(Debug, Default, Clone, Copy)]
pub struct AccountParser;

impl StreamParser for AccountParser {
    type Event = UpdateEvent;

    fn name(&self) -> &str {
        "hyperliquid.webData2"
    }

    fn classify(&self, raw: &str) -> Classified<UpdateEvent> {
        map(decode::<WsWebData>(raw, "webData2"), |web| {
            let state = web.clearinghouse_state;
            Ok(vec![UpdateEvent::AccountState(AccountUpdate {
                venue: Venue::Hyperliquid,
                account: web.user,
                account_value: state.margin_summary.account_value,
                maintenance_margin: state.cross_maintenance_margin_used,
                initial_margin: Some(state.margin_summary.total_margin_used),
                free_collateral: state.withdrawable,
                timestamp_ms: state.time,
                seq: None,
            })])
        })
    }
}
