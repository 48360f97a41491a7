//! Hyperliquid - compact wire format, msgpack + EIP-712 signed actions

pub mod meta;
pub mod model;
pub mod signature;
pub mod stream;
pub mod translator;

pub use meta::parse_meta;
pub use model::{Action, Grouping};
pub use stream::{AccountParser, OrderUpdatesParser, UserFillsParser};
pub use translator::HyperliquidTranslator;
