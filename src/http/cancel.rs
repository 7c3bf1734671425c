//! Cooperative per-request cancellation signal.
//!
//! Task-level cancellation (stopping the scheduler, aborting an in-flight
//! cycle) goes through Tokio's native task abort, which simply drops the
//! future — no plumbing needed. This type exists for the narrower contract
//! in the HTTP layer: an external caller handing [`http_request`] a reason
//! to cancel an in-flight request without losing that reason to a generic
//! timeout.
//!
//! [`http_request`]: super::request::http_request

use tokio::sync::watch;

/// The writable half. Dropping it without calling [`Self::cancel`] leaves
/// the paired [`CancelSignal`] pending forever.
#[derive(Clone)]
pub struct CancelHandle {
    tx: watch::Sender<Option<String>>,
}

/// The readable half, cloneable and cheap to hold across an `.await`.
#[derive(Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<Option<String>>,
}

impl CancelHandle {
    pub fn new() -> (Self, CancelSignal) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, CancelSignal { rx })
    }

    /// Idempotent; only the first reason sticks.
    pub fn cancel(&self, reason: impl Into<String>) {
        if self.tx.borrow().is_none() {
            let _ = self.tx.send(Some(reason.into()));
        }
    }
}

impl CancelSignal {
    /// Resolves with the cancellation reason once [`CancelHandle::cancel`]
    /// is called. Never resolves otherwise.
    pub async fn cancelled(&self) -> String {
        let mut rx = self.rx.clone();
        loop {
            if let Some(reason) = rx.borrow().clone() {
                return reason;
            }
            if rx.changed().await.is_err() {
                return "cancelled".to_string();
            }
        }
    }
}
