//! Configuration - Type-safe, validated config
//!
//! Loads from `gateway.toml`. Key material is never part of this document.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::core::{Error, Result};
use crate::normalize::VenuePrecision;

/// Gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub dispatch: DispatchConfig,
    pub dedup: DedupConfig,
    pub hyperliquid: HyperliquidConfig,
    pub paradex: ParadexConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Size of the shared listener pool
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Retention window, counted from first sight
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HyperliquidConfig {
    /// Selects phantom-agent source "a" (mainnet) or "b" (testnet)
    #[serde(default = "default_true")]
    pub mainnet: bool,
    #[serde(default = "default_hl_price_decimals")]
    pub max_price_decimals: u32,
    #[serde(default = "default_hl_sig_figs")]
    pub max_significant_figures: u32,
    /// Buffer applied to the BBO for simulated market orders (0.05 = 5%)
    #[serde(default = "default_market_slippage")]
    pub market_slippage: Decimal,
    /// Starting counter for derived client order ids
    #[serde(default)]
    pub cloid_seed: u64,
    #[serde(default)]
    pub vault_address: Option<String>,
    #[serde(default)]
    pub builder: Option<BuilderConfig>,
}

/// Fee-sharing block attached to order actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderConfig {
    pub address: String,
    /// Tenths of a basis point
    pub fee: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParadexConfig {
    #[serde(default = "default_pdx_price_decimals")]
    pub max_price_decimals: u32,
    #[serde(default = "default_pdx_sig_figs")]
    pub max_significant_figures: u32,
}

fn default_worker_threads() -> usize {
    4
}
fn default_ttl_secs() -> u64 {
    3600
}
fn default_max_entries() -> usize {
    100_000
}
fn default_true() -> bool {
    true
}
fn default_hl_price_decimals() -> u32 {
    6
}
fn default_hl_sig_figs() -> u32 {
    5
}
fn default_market_slippage() -> Decimal {
    Decimal::new(5, 2)
}
fn default_pdx_price_decimals() -> u32 {
    8
}
fn default_pdx_sig_figs() -> u32 {
    10
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { worker_threads: default_worker_threads() }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

impl DedupConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for HyperliquidConfig {
    fn default() -> Self {
        Self {
            mainnet: true,
            max_price_decimals: default_hl_price_decimals(),
            max_significant_figures: default_hl_sig_figs(),
            market_slippage: default_market_slippage(),
            cloid_seed: 0,
            vault_address: None,
            builder: None,
        }
    }
}

impl HyperliquidConfig {
    pub fn precision(&self) -> VenuePrecision {
        VenuePrecision::new(self.max_price_decimals, self.max_significant_figures)
    }
}

impl Default for ParadexConfig {
    fn default() -> Self {
        Self {
            max_price_decimals: default_pdx_price_decimals(),
            max_significant_figures: default_pdx_sig_figs(),
        }
    }
}

impl ParadexConfig {
    pub fn precision(&self) -> VenuePrecision {
        VenuePrecision::new(self.max_price_decimals, self.max_significant_figures)
    }
}

impl GatewayConfig {
    /// Load from TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: GatewayConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the default location, falling back to built-in defaults.
    pub fn load_default() -> Self {
        let candidates = [
            "gateway.toml",
            concat!(env!("CARGO_MANIFEST_DIR"), "/gateway.toml"),
        ];

        for path in &candidates {
            match Self::load(Path::new(path)) {
                Ok(cfg) => {
                    tracing::info!("📋 Loaded config from {}", path);
                    return cfg;
                }
                Err(e) if Path::new(path).exists() => {
                    tracing::warn!("Ignoring {}: {}", path, e);
                }
                Err(_) => {}
            }
        }

        tracing::warn!("No gateway.toml found, using defaults");
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.dispatch.worker_threads == 0 {
            return Err(Error::Config("dispatch.worker_threads must be > 0".into()));
        }
        if self.dedup.ttl_secs == 0 {
            return Err(Error::Config("dedup.ttl_secs must be > 0".into()));
        }
        if self.dedup.max_entries == 0 {
            return Err(Error::Config("dedup.max_entries must be > 0".into()));
        }
        let slip = self.hyperliquid.market_slippage;
        if slip < Decimal::ZERO || slip >= Decimal::ONE {
            return Err(Error::Config(format!(
                "hyperliquid.market_slippage {} outside [0, 1)",
                slip
            )));
        }
        if let Some(builder) = &self.hyperliquid.builder {
            if !is_hex_address(&builder.address) {
                return Err(Error::Config(format!(
                    "hyperliquid.builder.address {} is not a 20-byte hex address",
                    builder.address
                )));
            }
        }
        if let Some(vault) = &self.hyperliquid.vault_address {
            if !is_hex_address(vault) {
                return Err(Error::Config(format!(
                    "hyperliquid.vault_address {} is not a 20-byte hex address",
                    vault
                )));
            }
        }
        Ok(())
    }
}

fn is_hex_address(s: &str) -> bool {
    let body = s.strip_prefix("0x").unwrap_or(s);
    body.len() == 40 && body.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = GatewayConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.dispatch.worker_threads, 4);
        assert_eq!(cfg.dedup.ttl(), Duration::from_secs(3600));
        assert_eq!(cfg.hyperliquid.market_slippage, dec!(0.05));
        assert!(cfg.hyperliquid.mainnet);
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let cfg = GatewayConfig::from_toml(
            r#"
            [dedup]
            ttl_secs = 60

            [hyperliquid]
            mainnet = false
            market_slippage = "0.01"

            [hyperliquid.builder]
            address = "0x1234567890abcdef1234567890abcdef12345678"
            fee = 10
            "#,
        )
        .unwrap();
        assert_eq!(cfg.dedup.ttl_secs, 60);
        assert_eq!(cfg.dedup.max_entries, 100_000);
        assert!(!cfg.hyperliquid.mainnet);
        assert_eq!(cfg.hyperliquid.market_slippage, dec!(0.01));
        assert_eq!(cfg.hyperliquid.builder.as_ref().unwrap().fee, 10);
        assert_eq!(cfg.paradex.max_price_decimals, 8);
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = GatewayConfig::from_toml("[dispatch]\nworker_threads = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = GatewayConfig::from_toml("[hyperliquid]\nmarket_slippage = \"1.5\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = GatewayConfig::from_toml("[hyperliquid]\nvault_address = \"0xabc\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unparseable_document() {
        let err = GatewayConfig::from_toml("[dedup\n").unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }
}
