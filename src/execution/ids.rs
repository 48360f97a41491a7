//! Nonces and client order ids

use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Millisecond wall clock
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }
}

/// Strictly increasing nonce per signing key.
///
/// Follows the clock, but never repeats or goes backwards when the clock
/// stalls or several threads sign in the same millisecond.
pub struct NonceSource {
    clock: Arc<dyn Clock>,
    last: AtomicU64,
}

impl NonceSource {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, last: AtomicU64::new(0) }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    pub fn next(&self) -> u64 {
        let now = self.clock.now_ms();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }

    pub fn last(&self) -> u64 {
        self.last.load(Ordering::Acquire)
    }
}

/// Deterministic 128-bit client order ids derived from a counter.
///
/// The same counter value always yields the same id, so a retried
/// submission can reuse it.
pub struct ClientIdGenerator {
    counter: AtomicU64,
}

impl ClientIdGenerator {
    pub fn new(seed: u64) -> Self {
        Self { counter: AtomicU64::new(seed) }
    }

    pub fn next_id(&self) -> String {
        Self::for_counter(self.counter.fetch_add(1, Ordering::Relaxed))
    }

    /// `0x` + first 16 bytes of sha256(counter as big-endian u64)
    pub fn for_counter(counter: u64) -> String {
        let digest = Sha256::digest(counter.to_be_bytes());
        format!("0x{}", hex::encode(&digest[..16]))
    }
}
