//! Paradex subscription parsers.
//!
//! Frames are JSON-RPC notifications:
//! `{"jsonrpc":"2.0","method":"subscription","params":{"channel":"orders.ALL","data":{..}}}`.
//! The channel prefix (before the first '.') selects the parser.

use serde::de::DeserializeOwned;

use super::model::{SubscriptionEnvelope, WsAccount, WsFill, WsOrder};
use crate::core::{
    AccountUpdate, Classified, FillUpdate, Liquidity, OrderState, OrderUpdate, Side, StreamParser,
    Symbol, UpdateEvent, Venue,
};

fn decode<T: DeserializeOwned>(raw: &str, prefix: &str) -> Classified<T> {
    let Ok(envelope) = serde_json::from_str::<SubscriptionEnvelope<'_>>(raw) else {
        return Classified::NotApplicable;
    };
    if envelope.method != Some("subscription") {
        return Classified::NotApplicable;
    }
    let Some(params) = envelope.params else {
        return Classified::NotApplicable;
    };
    let channel_prefix = params.channel.split('.').next().unwrap_or_default();
    if channel_prefix != prefix {
        return Classified::NotApplicable;
    }
    let Some(data) = params.data else {
        return Classified::Malformed(format!("{} frame without data", params.channel));
    };
    match serde_json::from_str::<T>(data.get()) {
        Ok(value) => Classified::parsed(value),
        Err(e) => Classified::Malformed(format!("{}: {}", params.channel, e)),
    }
}

fn convert<T, E>(classified: Classified<T>, f: impl FnMut(T) -> Result<E, String>) -> Classified<E> {
    match classified {
        Classified::NotApplicable => Classified::NotApplicable,
        Classified::Malformed(reason) => Classified::Malformed(reason),
        Classified::Parsed(values) => {
            match values.into_iter().map(f).collect::<Result<Vec<_>, _>>() {
                Ok(events) => Classified::Parsed(events),
                Err(reason) => Classified::Malformed(reason),
            }
        }
    }
}

fn side(raw: &str) -> Result<Side, String> {
    match raw {
        "BUY" => Ok(Side::Buy),
        "SELL" => Ok(Side::Sell),
        other => Err(format!("unknown side {:?}", other)),
    }
}

/// CLOSED is terminal either way; a cancel reason tells canceled from filled.
fn order_state(o: &WsOrder) -> Result<OrderState, String> {
    Ok(match o.status.as_str() {
        "NEW" | "UNTRIGGERED" => OrderState::New,
        "OPEN" if o.remaining_size < o.size => OrderState::PartiallyFilled,
        "OPEN" => OrderState::Open,
        "CLOSED" if o.cancel_reason.is_some() => OrderState::Canceled,
        "CLOSED" => OrderState::Filled,
        other => return Err(format!("unknown order status {:?}", other)),
    })
}

/// `orders.*` -> `OrderStatus`
#[derive(Debug, Default, Clone, Copy)]
pub struct OrdersParser;

impl StreamParser for OrdersParser {
    type Event = UpdateEvent;

    fn name(&self) -> &str {
        "paradex.orders"
    }

    fn classify(&self, raw: &str) -> Classified<UpdateEvent> {
        convert(decode::<WsOrder>(raw, "orders"), |o| {
            let state = order_state(&o)?;
            Ok(UpdateEvent::OrderStatus(OrderUpdate {
                venue: Venue::Paradex,
                symbol: Symbol::new(o.market),
                side: side(&o.side)?,
                order_id: o.id,
                client_order_id: o.client_id,
                state,
                original_size: o.size,
                remaining_size: o.remaining_size,
                limit_price: o.price,
                avg_fill_price: o.avg_fill_price,
                cancel_reason: o.cancel_reason,
                timestamp_ms: o.last_updated_at,
                seq: o.seq_no,
            }))
        })
    }
}

/// `fills.*` -> `Fill`, keyed by the fill `id`
#[derive(Debug, Default, Clone, Copy)]
pub struct FillsParser;

impl StreamParser for FillsParser {
    type Event = UpdateEvent;

    fn name(&self) -> &str {
        "paradex.fills"
    }

    fn classify(&self, raw: &str) -> Classified<UpdateEvent> {
        convert(decode::<WsFill>(raw, "fills"), |f| {
            let liquidity = match f.liquidity.as_str() {
                "MAKER" => Liquidity::Maker,
                "TAKER" => Liquidity::Taker,
                other => return Err(format!("unknown liquidity {:?}", other)),
            };
            Ok(UpdateEvent::Fill(FillUpdate {
                venue: Venue::Paradex,
                side: side(&f.side)?,
                fill_id: f.id,
                order_id: f.order_id,
                client_order_id: f.client_id,
                symbol: Symbol::new(f.market),
                price: f.price,
                size: f.size,
                fee: f.fee,
                fee_asset: f.fee_currency,
                liquidity,
                timestamp_ms: f.created_at,
                seq: f.seq_no,
            }))
        })
    }
}

/// `account` -> `AccountState`
#[derive(Debug, Default, Clone, Copy)]
pub struct AccountParser;

impl StreamParser for AccountParser {
    type Event = UpdateEvent;

    fn name(&self) -> &str {
        "paradex.account"
    }

    fn classify(&self, raw: &str) -> Classified<UpdateEvent> {
        convert(decode::<WsAccount>(raw, "account"), |a| {
            Ok(UpdateEvent::AccountState(AccountUpdate {
                venue: Venue::Paradex,
                account: a.account,
                account_value: a.account_value,
                maintenance_margin: a.maintenance_margin_requirement,
                initial_margin: a.initial_margin_requirement,
                free_collateral: a.free_collateral,
                timestamp_ms: a.updated_at,
                seq: a.seq_no,
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn frame(channel: &str, data: &str) -> String {
        format!(
            r#"{{"jsonrpc":"2.0","method":"subscription","params":{{"channel":"{}","data":{}}}}}"#,
            channel, data
        )
    }

    fn order(status: &str, remaining: &str, cancel_reason: &str) -> String {
        frame(
            "orders.ALL",
            &format!(
                r#"{{"id":"1681","account":"0x1","market":"ETH-USD-PERP","side":"SELL","type":"LIMIT","size":"2","remaining_size":"{}","price":"3000.1","avg_fill_price":"","client_id":"c-1","status":"{}","cancel_reason":"{}","last_updated_at":1700000000000,"seq_no":12}}"#,
                remaining, status, cancel_reason
            ),
        )
    }

    fn one(c: Classified<UpdateEvent>) -> UpdateEvent {
        match c {
            Classified::Parsed(mut v) if v.len() == 1 => v.remove(0),
            other => panic!("expected one event, got {:?}", other),
        }
    }

    #[test]
    fn test_order_lifecycle_states() {
        let cases = [
            ("NEW", "2", "", OrderState::New),
            ("UNTRIGGERED", "2", "", OrderState::New),
            ("OPEN", "2", "", OrderState::Open),
            ("OPEN", "0.5", "", OrderState::PartiallyFilled),
            ("CLOSED", "0", "", OrderState::Filled),
            ("CLOSED", "2", "USER_CANCELED", OrderState::Canceled),
        ];
        for (status, remaining, reason, expected) in cases {
            let UpdateEvent::OrderStatus(u) = one(OrdersParser.classify(&order(status, remaining, reason))) else {
                panic!("wrong variant");
            };
            assert_eq!(u.state, expected, "{} / {}", status, reason);
        }
    }

    #[test]
    fn test_order_fields_mapped() {
        let UpdateEvent::OrderStatus(u) = one(OrdersParser.classify(&order("CLOSED", "2", "USER_CANCELED"))) else {
            panic!("wrong variant");
        };
        assert_eq!(u.symbol.as_str(), "ETH-USD-PERP");
        assert_eq!(u.side, Side::Sell);
        assert_eq!(u.avg_fill_price, None);
        assert_eq!(u.cancel_reason.as_deref(), Some("USER_CANCELED"));
        assert_eq!(u.client_order_id.as_deref(), Some("c-1"));
        assert_eq!(u.seq, Some(12));
    }

    #[test]
    fn test_other_frames_not_applicable() {
        for raw in [
            r#"{"jsonrpc":"2.0","id":1,"result":{"channel":"orders.ALL"}}"#,
            r#"{"channel":"orderUpdates","data":[]}"#,
            frame("fills.ALL", "{}").as_str(),
            frame("ordersx", "{}").as_str(),
            "[]",
        ] {
            assert_eq!(OrdersParser.classify(raw), Classified::NotApplicable, "{}", raw);
        }
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(OrdersParser.classify(&frame("orders.ALL", r#"{"id":"1"}"#)), Classified::Malformed(_)));
        assert!(matches!(
            OrdersParser.classify(r#"{"method":"subscription","params":{"channel":"orders.ALL"}}"#),
            Classified::Malformed(_)
        ));
        assert!(matches!(
            OrdersParser.classify(&order("LIMBO", "2", "")),
            Classified::Malformed(_)
        ));
    }

    #[test]
    fn test_fill() {
        let raw = frame(
            "fills.ETH-USD-PERP",
            r#"{"id":"f-99","market":"ETH-USD-PERP","order_id":"1681","side":"BUY","price":"3000.5","size":"0.25","fee":"","fee_currency":"USDC","liquidity":"MAKER","client_id":"","created_at":1700000000001,"fill_type":"FILL","seq_no":7}"#,
        );
        let UpdateEvent::Fill(f) = one(FillsParser.classify(&raw)) else {
            panic!("wrong variant");
        };
        assert_eq!(f.fill_id, "f-99");
        assert_eq!(f.fee, Decimal::ZERO);
        assert_eq!(f.liquidity, Liquidity::Maker);
        assert_eq!(f.client_order_id, None);
        assert_eq!(f.price, dec!(3000.5));
    }

    #[test]
    fn test_account() {
        let raw = frame(
            "account",
            r#"{"account":"0x1","account_value":"15000.25","free_collateral":"12000","initial_margin_requirement":"3000","maintenance_margin_requirement":"","updated_at":1700000000002,"seq_no":4}"#,
        );
        let UpdateEvent::AccountState(a) = one(AccountParser.classify(&raw)) else {
            panic!("wrong variant");
        };
        assert_eq!(a.account_value, dec!(15000.25));
        assert_eq!(a.maintenance_margin, Decimal::ZERO);
        assert_eq!(a.initial_margin, Some(dec!(3000)));
        assert_eq!(a.seq, Some(4));
    }
}
