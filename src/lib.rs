//! perp-gateway - Core Library
//! Uniform order/update plumbing over perpetual-futures venues

// Public modules
pub mod core;
pub mod dedup;
pub mod dispatch;
pub mod execution;
pub mod hyperliquid_api;
pub mod normalize;
pub mod paradex_api;
pub mod registry;
pub mod signer;

// Re-exports
pub use core::{Error, GatewayConfig, Result};
pub use dedup::FillDedupCache;
pub use dispatch::{EventDispatcher, WorkerPool};
pub use execution::OrderGateway;
pub use registry::{InstrumentDescriptor, InstrumentRegistry};
