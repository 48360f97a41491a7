//! Generic event dispatcher.
//!
//! One instance per logical stream (order status, account, fills) per venue
//! connection. `on_message` classifies raw text with the stream's parser,
//! filters duplicate fills and queues one job per (event, listener) on the
//! shared pool. It never waits for a listener.

use parking_lot::{Mutex, RwLock};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::pool::WorkerPool;
use crate::core::{Classified, Error, Listener, StreamEvent, StreamParser};
use crate::dedup::FillDedupCache;

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Connecting,
    Open,
    Error,
    Closed,
}

/// Terminal notification handed to the close observer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamClosed {
    pub code: u16,
    pub reason: String,
    pub remote: bool,
}

impl StreamClosed {
    pub const NORMAL: u16 = 1000;
    pub const ABNORMAL: u16 = 1006;
}

impl From<StreamClosed> for Error {
    fn from(c: StreamClosed) -> Self {
        Error::StreamClosed { code: c.code, reason: c.reason }
    }
}

pub type CloseObserver = Box<dyn FnOnce(StreamClosed) + Send + 'static>;

#[derive(Debug, Default)]
struct Counters {
    parsed: AtomicU64,
    ignored: AtomicU64,
    malformed: AtomicU64,
    duplicates: AtomicU64,
    delivered: AtomicU64,
    listener_failures: AtomicU64,
}

/// Point-in-time copy of a dispatcher's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub parsed: u64,
    pub ignored: u64,
    pub malformed: u64,
    pub duplicates: u64,
    pub delivered: u64,
    pub listener_failures: u64,
}

struct Registration<E: StreamEvent> {
    listener: Arc<dyn Listener<E>>,
    kinds: Option<Vec<E::Kind>>,
    active: AtomicBool,
}

impl<E: StreamEvent> Registration<E> {
    fn id(&self) -> *const () {
        Arc::as_ptr(&self.listener) as *const ()
    }

    fn wants(&self, kind: E::Kind) -> bool {
        self.kinds.as_ref().is_none_or(|k| k.contains(&kind))
    }
}

struct Lifecycle {
    state: StreamState,
    observer: Option<CloseObserver>,
    closed: Option<StreamClosed>,
}

pub struct EventDispatcher<P: StreamParser> {
    parser: P,
    pool: Arc<WorkerPool>,
    dedup: Option<Arc<FillDedupCache>>,
    listeners: RwLock<Vec<Arc<Registration<P::Event>>>>,
    lifecycle: Mutex<Lifecycle>,
    counters: Arc<Counters>,
}

impl<P: StreamParser> EventDispatcher<P> {
    pub fn new(parser: P, pool: Arc<WorkerPool>) -> Self {
        Self {
            parser,
            pool,
            dedup: None,
            listeners: RwLock::new(Vec::new()),
            lifecycle: Mutex::new(Lifecycle {
                state: StreamState::Connecting,
                observer: None,
                closed: None,
            }),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Route events carrying a dedup key through `cache`.
    pub fn with_dedup(mut self, cache: Arc<FillDedupCache>) -> Self {
        self.dedup = Some(cache);
        self
    }

    pub fn name(&self) -> &str {
        self.parser.name()
    }

    pub fn state(&self) -> StreamState {
        self.lifecycle.lock().state
    }

    // ---------------------------------------------------------------------
    // Listeners
    // ---------------------------------------------------------------------

    /// Subscribe to every event. Returns `false` if already registered.
    pub fn add_listener(&self, listener: Arc<dyn Listener<P::Event>>) -> bool {
        self.register(listener, None)
    }

    /// Subscribe to the given event kinds only.
    pub fn add_listener_for(
        &self,
        listener: Arc<dyn Listener<P::Event>>,
        kinds: &[<P::Event as StreamEvent>::Kind],
    ) -> bool {
        self.register(listener, Some(kinds.to_vec()))
    }

    fn register(
        &self,
        listener: Arc<dyn Listener<P::Event>>,
        kinds: Option<Vec<<P::Event as StreamEvent>::Kind>>,
    ) -> bool {
        let reg = Registration { listener, kinds, active: AtomicBool::new(true) };
        let mut listeners = self.listeners.write();
        if listeners.iter().any(|r| r.id() == reg.id()) {
            return false;
        }
        listeners.push(Arc::new(reg));
        true
    }

    /// Unsubscribe. Jobs already queued for this listener are skipped.
    pub fn remove_listener(&self, listener: &Arc<dyn Listener<P::Event>>) -> bool {
        let id = Arc::as_ptr(listener) as *const ();
        let mut listeners = self.listeners.write();
        match listeners.iter().position(|r| r.id() == id) {
            Some(pos) => {
                let reg = listeners.remove(pos);
                reg.active.store(false, Ordering::Release);
                true
            }
            None => false,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    // ---------------------------------------------------------------------
    // Inbound
    // ---------------------------------------------------------------------

    /// Classify one raw frame and dispatch whatever it yields.
    pub fn on_message(&self, raw: &str) {
        if self.state() == StreamState::Closed {
            self.counters.ignored.fetch_add(1, Ordering::Relaxed);
            return;
        }

        match self.parser.classify(raw) {
            Classified::NotApplicable => {
                self.counters.ignored.fetch_add(1, Ordering::Relaxed);
            }
            Classified::Malformed(reason) => {
                self.counters.malformed.fetch_add(1, Ordering::Relaxed);
                warn!(stream = self.name(), "Dropping malformed message: {}", reason);
            }
            Classified::Parsed(events) => {
                for event in events {
                    if !self.first_sight(&event) {
                        continue;
                    }
                    self.counters.parsed.fetch_add(1, Ordering::Relaxed);
                    self.dispatch(event);
                }
            }
        }
    }

    fn first_sight(&self, event: &P::Event) -> bool {
        let (Some(cache), Some(key)) = (&self.dedup, event.dedup_key()) else {
            return true;
        };
        if cache.first_time(key) {
            true
        } else {
            self.counters.duplicates.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Queue `event` for every listener registered right now.
    pub fn dispatch(&self, event: P::Event) {
        if self.state() == StreamState::Closed {
            return;
        }

        let kind = event.kind();
        let targets: Vec<_> = self
            .listeners
            .read()
            .iter()
            .filter(|r| r.wants(kind))
            .cloned()
            .collect();
        if targets.is_empty() {
            return;
        }

        let event = Arc::new(event);
        let stream: Arc<str> = Arc::from(self.name());
        for reg in targets {
            let event = event.clone();
            let counters = self.counters.clone();
            let stream = stream.clone();
            let queued = self.pool.submit(Box::new(move || {
                if !reg.active.load(Ordering::Acquire) {
                    return;
                }
                match catch_unwind(AssertUnwindSafe(|| reg.listener.on_event(&event))) {
                    Ok(Ok(())) => {
                        counters.delivered.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(Err(e)) => {
                        counters.listener_failures.fetch_add(1, Ordering::Relaxed);
                        error!(stream = &*stream, "Listener failed: {:#}", e);
                    }
                    Err(_) => {
                        counters.listener_failures.fetch_add(1, Ordering::Relaxed);
                        error!(stream = &*stream, "Listener panicked");
                    }
                }
            }));
            if !queued {
                debug!(stream = self.name(), "Dispatch pool is shut down, event dropped");
            }
        }
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Register the single close observer, replacing any previous one.
    ///
    /// If the stream already closed and nobody was told, it fires immediately.
    pub fn set_close_observer(&self, observer: impl FnOnce(StreamClosed) + Send + 'static) {
        let mut lc = self.lifecycle.lock();
        let missed = if lc.state == StreamState::Closed { lc.closed.take() } else { None };
        match missed {
            Some(closed) => {
                drop(lc);
                observer(closed);
            }
            None => lc.observer = Some(Box::new(observer)),
        }
    }

    pub fn on_open(&self) {
        let mut lc = self.lifecycle.lock();
        if lc.state == StreamState::Connecting {
            lc.state = StreamState::Open;
            info!(stream = self.name(), "🔌 Stream open");
        }
    }

    pub fn on_error(&self, cause: &str, fatal: bool) {
        {
            let mut lc = self.lifecycle.lock();
            if lc.state == StreamState::Closed {
                return;
            }
            lc.state = StreamState::Error;
        }
        if fatal {
            error!(stream = self.name(), "Stream error (fatal): {}", cause);
            self.on_close(StreamClosed::ABNORMAL, cause, false);
        } else {
            warn!(stream = self.name(), "Stream error: {}", cause);
        }
    }

    pub fn on_close(&self, code: u16, reason: &str, remote: bool) {
        self.close(StreamClosed { code, reason: reason.to_string(), remote });
    }

    /// Local shutdown: no new dispatch from this stream after this returns.
    pub fn stop(&self) {
        self.close(StreamClosed {
            code: StreamClosed::NORMAL,
            reason: "stopped".into(),
            remote: false,
        });
    }

    fn close(&self, closed: StreamClosed) {
        let observer = {
            let mut lc = self.lifecycle.lock();
            if lc.state == StreamState::Closed {
                return;
            }
            lc.state = StreamState::Closed;
            match lc.observer.take() {
                Some(observer) => Some(observer),
                None => {
                    lc.closed = Some(closed.clone());
                    None
                }
            }
        };

        info!(
            stream = self.name(),
            code = closed.code,
            remote = closed.remote,
            "Stream closed: {}",
            closed.reason
        );
        if let Some(observer) = observer {
            observer(closed);
        }
    }

    pub fn stats(&self) -> DispatchStats {
        let c = &self.counters;
        DispatchStats {
            parsed: c.parsed.load(Ordering::Relaxed),
            ignored: c.ignored.load(Ordering::Relaxed),
            malformed: c.malformed.load(Ordering::Relaxed),
            duplicates: c.duplicates.load(Ordering::Relaxed),
            delivered: c.delivered.load(Ordering::Relaxed),
            listener_failures: c.listener_failures.load(Ordering::Relaxed),
        }
    }
}
