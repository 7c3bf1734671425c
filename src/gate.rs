//! Concurrency gate bounding in-flight probes.
//!
//! Backed by `tokio::sync::Semaphore`, which queues waiters in strict FIFO
//! order, matching the fairness contract.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Bounds the number of thunks in flight simultaneously. `limit <= 0`
/// (via [`ConcurrencyGate::unlimited`]) means no bound at all.
#[derive(Clone)]
pub struct ConcurrencyGate {
    semaphore: Option<Arc<Semaphore>>,
    pending: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
}

impl ConcurrencyGate {
    /// `limit` must be ≥ 1; use [`ConcurrencyGate::unlimited`] for no bound.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Some(Arc::new(Semaphore::new(limit))),
            pending: Arc::new(AtomicUsize::new(0)),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn unlimited() -> Self {
        Self { semaphore: None, pending: Arc::new(AtomicUsize::new(0)), active: Arc::new(AtomicUsize::new(0)) }
    }

    /// Runs `thunk`, queueing behind any callers already waiting when the
    /// gate is at capacity.
    pub async fn run<T, Fut, F>(&self, thunk: F) -> T
    where
        Fut: Future<Output = T>,
        F: FnOnce() -> Fut,
    {
        let _permit = match &self.semaphore {
            Some(sem) => {
                self.pending.fetch_add(1, Ordering::SeqCst);
                let permit = sem.clone().acquire_owned().await.expect("gate semaphore never closed");
                self.pending.fetch_sub(1, Ordering::SeqCst);
                Some(permit)
            }
            None => None,
        };
        self.active.fetch_add(1, Ordering::SeqCst);
        let result = thunk().await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}
