//! Inbound update dispatch: parse, dedup, fan out.

pub mod dispatcher;
pub mod feed;
pub mod pool;

pub use dispatcher::{CloseObserver, DispatchStats, EventDispatcher, StreamClosed, StreamState};
pub use feed::{run_feed, ConnectionSink, InboundFrame};
pub use pool::WorkerPool;
