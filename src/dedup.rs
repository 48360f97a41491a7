//! Fill deduplication
//!
//! Venues deliver fills at least once (reconnect snapshots replay recent
//! fills). `FillDedupCache::first_time` answers `true` exactly once per key
//! inside the retention window so downstream sees each fill once.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::core::config::DedupConfig;
use crate::core::{Error, Result};

struct Inner {
    seen: HashMap<String, Instant>,
    /// Insertion order, oldest first
    order: VecDeque<(String, Instant)>,
}

pub struct FillDedupCache {
    inner: Mutex<Inner>,
    ttl: Duration,
    max_entries: usize,
    duplicates: AtomicU64,
    evicted: AtomicU64,
}

impl FillDedupCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            inner: Mutex::new(Inner {
                seen: HashMap::with_capacity(max_entries.min(4096)),
                order: VecDeque::with_capacity(max_entries.min(4096)),
            }),
            ttl,
            max_entries,
            duplicates: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    pub fn from_config(cfg: &DedupConfig) -> Self {
        Self::new(cfg.ttl(), cfg.max_entries)
    }

    /// `true` the first time `key` is seen within the TTL window.
    pub fn first_time(&self, key: &str) -> bool {
        self.first_time_at(key, Instant::now())
    }

    /// Same as [`first_time`](Self::first_time) for keys that may be absent.
    pub fn try_first_time(&self, key: Option<&str>) -> Result<bool> {
        key.map(|k| self.first_time(k)).ok_or(Error::MissingFillKey)
    }

    /// Check-and-insert against an explicit clock reading.
    pub fn first_time_at(&self, key: &str, now: Instant) -> bool {
        let mut inner = self.inner.lock();
        self.purge_expired(&mut inner, now);

        if let Some(&inserted) = inner.seen.get(key) {
            if now.saturating_duration_since(inserted) < self.ttl {
                self.duplicates.fetch_add(1, Ordering::Relaxed);
                debug!(fill_key = key, "duplicate fill suppressed");
                return false;
            }
        }

        while inner.seen.len() >= self.max_entries {
            match inner.order.pop_front() {
                Some((old, at)) => {
                    // stale queue rows (key re-inserted later) are skipped
                    if inner.seen.get(&old) == Some(&at) {
                        inner.seen.remove(&old);
                        self.evicted.fetch_add(1, Ordering::Relaxed);
                    }
                }
                None => break,
            }
        }

        inner.seen.insert(key.to_string(), now);
        inner.order.push_back((key.to_string(), now));
        true
    }

    fn purge_expired(&self, inner: &mut Inner, now: Instant) {
        while let Some((key, at)) = inner.order.front() {
            if now.saturating_duration_since(*at) < self.ttl {
                break;
            }
            if inner.seen.get(key) == Some(at) {
                inner.seen.remove(key);
            }
            inner.order.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duplicates_suppressed(&self) -> u64 {
        self.duplicates.load(Ordering::Relaxed)
    }

    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}
