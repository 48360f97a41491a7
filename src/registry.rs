//! Instrument registry
//!
//! Read-only symbol lookup built once from a venue snapshot. Both the common
//! symbol ("BTC-PERP") and the venue symbol ("BTC", "BTC-USD-PERP") resolve to
//! the same descriptor.

use once_cell::sync::OnceCell;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::{Error, InstrumentKind, Result, Symbol, Venue};

/// Immutable instrument metadata
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentDescriptor {
    pub symbol: Symbol,
    pub venue_symbol: Symbol,
    pub venue: Venue,
    pub kind: InstrumentKind,
    /// Scale carries meaning: it drives allowed price decimals
    pub tick_size: Decimal,
    pub size_increment: Decimal,
    /// Venue-side numeric id (position in the venue universe)
    pub asset_index: u32,
    pub max_leverage: Option<u32>,
    pub max_funding_rate: Option<Decimal>,
    pub only_isolated: bool,
}

/// One row of a venue snapshot, before filtering.
#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    pub descriptor: InstrumentDescriptor,
    /// Delisted / restricted marker; any value excludes the entry
    pub restriction: Option<String>,
}

impl SnapshotEntry {
    pub fn listed(descriptor: InstrumentDescriptor) -> Self {
        Self { descriptor, restriction: None }
    }
}

#[derive(Debug, Default)]
pub struct InstrumentRegistry {
    venue: Option<Venue>,
    instruments: Vec<InstrumentDescriptor>,
    by_symbol: HashMap<String, usize>,
    by_venue_symbol: HashMap<String, usize>,
    excluded: usize,
}

impl InstrumentRegistry {
    /// Build from a snapshot. Restricted entries are dropped silently.
    pub fn build(venue: Venue, entries: impl IntoIterator<Item = SnapshotEntry>) -> Self {
        let mut registry = Self { venue: Some(venue), ..Self::default() };

        for entry in entries {
            let d = entry.descriptor;
            if let Some(marker) = entry.restriction {
                debug!(%venue, symbol = %d.venue_symbol, %marker, "excluding restricted instrument");
                registry.excluded += 1;
                continue;
            }
            if registry.by_symbol.contains_key(d.symbol.as_str())
                || registry.by_venue_symbol.contains_key(d.venue_symbol.as_str())
            {
                debug!(%venue, symbol = %d.symbol, "duplicate instrument in snapshot, keeping first");
                continue;
            }
            let idx = registry.instruments.len();
            registry.by_symbol.insert(d.symbol.as_str().to_string(), idx);
            registry.by_venue_symbol.insert(d.venue_symbol.as_str().to_string(), idx);
            registry.instruments.push(d);
        }

        info!(
            %venue,
            listed = registry.instruments.len(),
            excluded = registry.excluded,
            "📚 Instrument registry built"
        );
        registry
    }

    /// Resolve by common symbol first, then by venue symbol.
    pub fn resolve(&self, symbol: &str) -> Result<&InstrumentDescriptor> {
        self.get(symbol)
            .ok_or_else(|| Error::InstrumentNotFound(symbol.to_string()))
    }

    pub fn get(&self, symbol: &str) -> Option<&InstrumentDescriptor> {
        self.by_symbol
            .get(symbol)
            .or_else(|| self.by_venue_symbol.get(symbol))
            .map(|&idx| &self.instruments[idx])
    }

    pub fn venue(&self) -> Option<Venue> {
        self.venue
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn excluded(&self) -> usize {
        self.excluded
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstrumentDescriptor> {
        self.instruments.iter()
    }
}

/// Compute-once holder for a shared registry.
///
/// Concurrent first callers block until the single loader finishes; a failed
/// load leaves the cell empty so a later call can retry.
#[derive(Debug, Default)]
pub struct RegistryCell {
    cell: OnceCell<Arc<InstrumentRegistry>>,
}

impl RegistryCell {
    pub fn new() -> Self {
        Self { cell: OnceCell::new() }
    }

    pub fn get_or_try_init<F>(&self, load: F) -> Result<Arc<InstrumentRegistry>>
    where
        F: FnOnce() -> Result<InstrumentRegistry>,
    {
        self.cell
            .get_or_try_init(|| load().map(Arc::new))
            .map(Arc::clone)
    }

    pub fn get(&self) -> Option<Arc<InstrumentRegistry>> {
        self.cell.get().cloned()
    }
}
