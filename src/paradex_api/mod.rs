//! Paradex - verbose JSON-RPC subscription streams

pub mod markets;
pub mod model;
pub mod stream;

pub use markets::parse_markets;
pub use model::OrderFields;
pub use stream::{AccountParser, FillsParser, OrdersParser};
