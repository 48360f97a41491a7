//! Shared listener worker pool.
//!
//! Fixed number of OS threads draining one FIFO queue. Producers never block:
//! the queue is unbounded, the thread count is what bounds concurrency.

use parking_lot::{Mutex, RwLock};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info};

pub type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Default)]
struct PoolCounters {
    completed: AtomicU64,
    panicked: AtomicU64,
}

pub struct WorkerPool {
    tx: RwLock<Option<flume::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<PoolCounters>,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Arc<Self> {
        let threads = threads.max(1);
        let (tx, rx) = flume::unbounded::<Job>();
        let counters = Arc::new(PoolCounters::default());

        let workers = (0..threads)
            .filter_map(|i| {
                let rx = rx.clone();
                let counters = counters.clone();
                std::thread::Builder::new()
                    .name(format!("dispatch-{}", i))
                    .spawn(move || worker_loop(rx, counters))
                    .map_err(|e| error!("Failed to spawn dispatch worker {}: {}", i, e))
                    .ok()
            })
            .collect::<Vec<_>>();

        info!("🧵 Dispatch pool started with {} workers", workers.len());

        Arc::new(Self {
            tx: RwLock::new(Some(tx)),
            workers: Mutex::new(workers),
            counters,
        })
    }

    /// Queue a job. Returns `false` once the pool is shut down.
    pub fn submit(&self, job: Job) -> bool {
        match self.tx.read().as_ref() {
            Some(tx) => tx.send(job).is_ok(),
            None => false,
        }
    }

    pub fn queued(&self) -> usize {
        self.tx.read().as_ref().map_or(0, |tx| tx.len())
    }

    pub fn completed(&self) -> u64 {
        self.counters.completed.load(Ordering::Relaxed)
    }

    pub fn panicked(&self) -> u64 {
        self.counters.panicked.load(Ordering::Relaxed)
    }

    /// Stop accepting jobs, let queued ones drain, join the workers.
    pub fn shutdown(&self) {
        drop(self.tx.write().take());
        let workers = std::mem::take(&mut *self.workers.lock());
        let current = std::thread::current().id();
        for handle in workers {
            // a listener calling shutdown cannot join itself
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                error!("Dispatch worker exited abnormally");
            }
        }
        debug!("Dispatch pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(rx: flume::Receiver<Job>, counters: Arc<PoolCounters>) {
    while let Ok(job) = rx.recv() {
        match catch_unwind(AssertUnwindSafe(job)) {
            Ok(()) => {
                counters.completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                counters.panicked.fetch_add(1, Ordering::Relaxed);
                error!("Dispatch job panicked");
            }
        }
    }
}
