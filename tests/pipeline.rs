//! End-to-end flows: transport frames -> typed events -> listeners, and
//! generic orders -> signed envelopes -> sink.

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use perp_gateway::core::{
    ActionSink, BestBidOffer, Listener, OrderRequest, Result, Side, SignedAction, UpdateEvent,
};
use perp_gateway::dispatch::{run_feed, ConnectionSink, InboundFrame, StreamClosed, StreamState};
use perp_gateway::hyperliquid_api::signature::{action_hash, PhantomAgent};
use perp_gateway::hyperliquid_api::{
    parse_meta, Action, Grouping, HyperliquidTranslator, OrderUpdatesParser, UserFillsParser,
};
use perp_gateway::hyperliquid_api::model::BulkOrder;
use perp_gateway::paradex_api::{self, FillsParser};
use perp_gateway::registry::RegistryCell;
use perp_gateway::signer::{EvmSignature, EvmSigner};
use perp_gateway::{
    EventDispatcher, FillDedupCache, GatewayConfig, InstrumentRegistry, OrderGateway, WorkerPool,
};

const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
const WAIT: Duration = Duration::from_secs(5);

const META: &str = r#"[{"universe":[
    {"name":"BTC","szDecimals":5,"maxLeverage":40},
    {"name":"ETH","szDecimals":4,"maxLeverage":25},
    {"name":"LUNA","szDecimals":1,"isDelisted":true}
]}, []]"#;

fn fills_frame(tids: &[u64]) -> String {
    let fills: Vec<String> = tids
        .iter()
        .map(|tid| {
            format!(
                r#"{{"coin":"ETH","px":"3000.5","sz":"0.1","side":"B","time":{},"oid":42,"crossed":true,"fee":"0.15","tid":{}}}"#,
                1_700_000_000_000u64 + tid,
                tid
            )
        })
        .collect();
    format!(
        r#"{{"channel":"userFills","data":{{"isSnapshot":false,"user":"0xabc","fills":[{}]}}}}"#,
        fills.join(",")
    )
}

const ORDER_FRAME: &str = r#"{"channel":"orderUpdates","data":[{"order":{"coin":"ETH","side":"B","limitPx":"3000.5","sz":"0.0","oid":42,"timestamp":1700000000000,"origSz":"0.2"},"status":"filled","statusTimestamp":1700000000200}]}"#;

fn forward(tx: flume::Sender<UpdateEvent>) -> Arc<dyn Listener<UpdateEvent>> {
    Arc::new(move |event: &UpdateEvent| -> anyhow::Result<()> {
        tx.send(event.clone())
            .map_err(|_| anyhow::anyhow!("receiver dropped"))?;
        Ok(())
    })
}

#[tokio::test]
async fn test_hyperliquid_feed_delivers_each_fill_once() {
    perp_gateway::core::logging::init_logging("warn,perp_gateway=debug");
    let pool = WorkerPool::new(2);
    let cache = Arc::new(FillDedupCache::new(Duration::from_secs(60), 1_000));
    let fills = Arc::new(EventDispatcher::new(UserFillsParser, pool.clone()).with_dedup(cache.clone()));
    let orders = Arc::new(EventDispatcher::new(OrderUpdatesParser, pool.clone()));

    let (tx, rx) = flume::unbounded();
    fills.add_listener(forward(tx.clone()));
    orders.add_listener(forward(tx));

    let (closed_tx, closed_rx) = flume::bounded(1);
    fills.set_close_observer(move |closed| {
        let _ = closed_tx.send(closed);
    });

    let (frames_tx, frames_rx) = mpsc::channel(16);
    let sinks: Vec<Arc<dyn ConnectionSink>> = vec![
        fills.clone() as Arc<dyn ConnectionSink>,
        orders.clone() as Arc<dyn ConnectionSink>,
    ];
    let feed = tokio::spawn(run_feed(sinks, frames_rx));

    frames_tx.send(InboundFrame::Opened).await.unwrap();
    frames_tx.send(InboundFrame::Text(r#"{"channel":"pong"}"#.into())).await.unwrap();
    frames_tx.send(InboundFrame::Text(fills_frame(&[1, 2]))).await.unwrap();
    // at-least-once redelivery overlapping the first batch
    frames_tx.send(InboundFrame::Text(fills_frame(&[2, 3]))).await.unwrap();
    frames_tx.send(InboundFrame::Text(ORDER_FRAME.into())).await.unwrap();
    frames_tx
        .send(InboundFrame::Closed { code: 1000, reason: "bye".into(), remote: true })
        .await
        .unwrap();

    let ended = feed.await.unwrap();
    assert_eq!(ended, StreamClosed { code: 1000, reason: "bye".into(), remote: true });

    let mut fill_ids = Vec::new();
    let mut order_states = Vec::new();
    for _ in 0..4 {
        match rx.recv_timeout(WAIT).unwrap() {
            UpdateEvent::Fill(f) => fill_ids.push(f.fill_id),
            UpdateEvent::OrderStatus(o) => order_states.push(o.state),
            other => panic!("unexpected {:?}", other),
        }
    }
    fill_ids.sort();
    assert_eq!(fill_ids, vec!["1", "2", "3"]);
    assert_eq!(order_states.len(), 1);
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

    let stats = fills.stats();
    assert_eq!(stats.parsed, 3);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(cache.duplicates_suppressed(), 1);
    assert_eq!(fills.state(), StreamState::Closed);
    assert_eq!(orders.state(), StreamState::Closed);

    let closed = closed_rx.recv_timeout(WAIT).unwrap();
    assert_eq!(closed.code, 1000);
    assert!(closed.remote);
    pool.shutdown();
}

#[tokio::test]
async fn test_dropped_transport_is_abnormal_close() {
    let pool = WorkerPool::new(1);
    let fills = Arc::new(EventDispatcher::new(FillsParser, pool.clone()));
    let (closed_tx, closed_rx) = flume::bounded(1);
    fills.set_close_observer(move |closed| {
        let _ = closed_tx.send(closed);
    });

    let (frames_tx, frames_rx) = mpsc::channel(4);
    let feed = tokio::spawn(run_feed(vec![fills.clone() as Arc<dyn ConnectionSink>], frames_rx));
    frames_tx.send(InboundFrame::Opened).await.unwrap();
    drop(frames_tx);

    let ended = feed.await.unwrap();
    assert_eq!(ended.code, StreamClosed::ABNORMAL);
    assert_eq!(closed_rx.recv_timeout(WAIT).unwrap().code, StreamClosed::ABNORMAL);
    // already closed: a later close does not notify again
    fills.on_close(1000, "late", true);
    assert!(closed_rx.try_recv().is_err());
}

#[test]
fn test_paradex_fill_survives_failing_listener() {
    let pool = WorkerPool::new(2);
    let cache = Arc::new(FillDedupCache::new(Duration::from_secs(60), 10));
    let fills = EventDispatcher::new(FillsParser, pool.clone()).with_dedup(cache);

    let failing: Arc<dyn Listener<UpdateEvent>> =
        Arc::new(|_: &UpdateEvent| -> anyhow::Result<()> { anyhow::bail!("downstream store offline") });
    let (tx, rx) = flume::unbounded();
    fills.add_listener(failing);
    fills.add_listener(forward(tx));

    let raw = r#"{"jsonrpc":"2.0","method":"subscription","params":{"channel":"fills.ALL","data":{
        "id":"f-1","market":"BTC-USD-PERP","order_id":"9","side":"SELL","price":"65000.1","size":"0.01",
        "fee":"","fee_currency":"USDC","liquidity":"TAKER","created_at":1700000000000,"seq_no":1}}}"#;
    fills.on_open();
    fills.on_message(raw);
    fills.on_message(raw);

    let UpdateEvent::Fill(fill) = rx.recv_timeout(WAIT).unwrap() else {
        panic!("expected a fill");
    };
    assert_eq!(fill.fill_id, "f-1");
    assert_eq!(fill.price, dec!(65000.1));
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

    pool.shutdown();
    assert_eq!(fills.stats().listener_failures, 1);
    assert_eq!(fills.stats().duplicates, 1);
}

#[derive(Default)]
struct CapturingSink(Mutex<Vec<SignedAction>>);

#[async_trait]
impl ActionSink for CapturingSink {
    async fn submit(&self, action: &SignedAction) -> Result<()> {
        self.0.lock().push(action.clone());
        Ok(())
    }
}

#[tokio::test]
async fn test_order_to_signed_envelope() {
    let config = GatewayConfig::load(&Path::new(env!("CARGO_MANIFEST_DIR")).join("gateway.toml")).unwrap();
    let cell = RegistryCell::new();
    let registry = cell
        .get_or_try_init(|| Ok(InstrumentRegistry::build(perp_gateway::core::Venue::Hyperliquid, parse_meta(META)?)))
        .unwrap();
    assert_eq!(registry.len(), 2);

    let signer = Arc::new(EvmSigner::from_hex(KEY).unwrap());
    let translator =
        Arc::new(HyperliquidTranslator::new(registry.clone(), signer.clone(), &config.hyperliquid).unwrap());
    let sink = Arc::new(CapturingSink::default());
    let gateway = OrderGateway::new(translator.clone(), sink.clone());

    let order = OrderRequest::market("ETH-PERP", Side::Buy, dec!(0.123456));
    let bbo = BestBidOffer::new(dec!(2999.9), dec!(3000.1));
    let cloid = gateway.place_order(order.clone(), Some(bbo)).await.unwrap();

    let sent = sink.0.lock().clone();
    assert_eq!(sent.len(), 1);
    let envelope: Value = serde_json::from_slice(&sent[0].payload).unwrap();
    let leg = &envelope["action"]["orders"][0];
    // 3000.1 * 1.05 = 3150.105 -> 5 significant figures
    assert_eq!(leg["p"], "3150.1");
    assert_eq!(leg["s"], "0.1234");
    assert_eq!(leg["c"], cloid.as_str());
    assert_eq!(leg["t"]["limit"]["tif"], "Ioc");

    // rebuild the signed bytes independently and recover the signer
    let (rebuilt, _) = translator
        .build_leg(
            &order.with_client_order_id(cloid.clone()),
            registry.resolve("ETH").unwrap(),
            Some(&bbo),
        )
        .unwrap();
    let action = Action::Order(BulkOrder { orders: vec![rebuilt], grouping: Grouping::Na, builder: None });
    assert_eq!(serde_json::to_value(&action).unwrap(), envelope["action"]);

    let nonce = envelope["nonce"].as_u64().unwrap();
    let digest = PhantomAgent::new(action_hash(&action, nonce, None).unwrap(), true).digest();
    let sig = EvmSignature::from_hex(envelope["signature"].as_str().unwrap()).unwrap();
    assert!(sig.v == 27 || sig.v == 28);
    assert_eq!(EvmSigner::recover_address(&digest, &sig).unwrap(), signer.address_bytes());

    gateway.cancel_by_client_id(&cloid).await.unwrap();
    let sent = sink.0.lock().clone();
    let cancel: Value = serde_json::from_slice(&sent[1].payload).unwrap();
    assert_eq!(cancel["action"]["type"], "cancelByCloid");
    assert!(cancel["nonce"].as_u64().unwrap() > nonce);
}

#[test]
fn test_paradex_snapshot_and_order_fields() {
    let config = GatewayConfig::default();
    let markets = r#"{"results":[{"symbol":"SOL-USD-PERP","base_currency":"SOL","asset_kind":"PERP",
        "price_tick_size":"0.001","order_size_increment":"0.10","max_funding_rate":"0.05","expiry_at":0}]}"#;
    let registry = InstrumentRegistry::build(
        perp_gateway::core::Venue::Paradex,
        paradex_api::parse_markets(markets).unwrap(),
    );
    let sol = registry.resolve("SOL-PERP").unwrap();
    let order = OrderRequest::limit("SOL-PERP", Side::Buy, dec!(12.0), dec!(145.123456789));
    let fields = paradex_api::OrderFields::from_request(&order, sol, config.paradex.precision()).unwrap();
    assert_eq!(fields.size, "12");
    assert_eq!(fields.price.as_deref(), Some("145.12345"));
}
