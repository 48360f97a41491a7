//! Core module - Common types, traits, and error handling

pub mod capabilities;
pub mod config;
pub mod error;
pub mod logging;
pub mod serde_util;
pub mod traits;
pub mod types;

pub use capabilities::{Capability, CapabilitySet};
pub use config::GatewayConfig;
pub use error::{Error, Result};
pub use traits::*;
pub use types::*;
