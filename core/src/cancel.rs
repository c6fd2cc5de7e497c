//! Cooperative cancellation for outbound calls.
//!
//! # Design
//! A `Canceller` owns a `watch` channel whose value is `None` until the
//! first `cancel` call stores a reason; later calls are ignored, so the
//! first source to fire decides the outcome. `CancelSignal` is the read
//! side handed to transports.
//!
//! `CancelScope` is the per-call composite: it owns a fresh `Canceller`,
//! and while the wrapped call runs it races an optional timer against the
//! caller's signal. The timer lives inside the future returned by
//! `CancelScope::run`, so it is dropped whenever that future finishes or is
//! dropped. Nothing is spawned.

use std::fmt;
use std::future::{self, Future};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

/// Why a call was cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The per-call or client default timeout elapsed.
    Timeout(Duration),
    /// The caller cancelled, with its own reason text.
    Caller(String),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Timeout(after) => {
                write!(f, "timed out after {} ms", after.as_millis())
            }
            AbortReason::Caller(reason) => f.write_str(reason),
        }
    }
}

/// Caller-side cancellation controller.
#[derive(Debug, Clone)]
pub struct Canceller {
    tx: Arc<watch::Sender<Option<AbortReason>>>,
}

impl Canceller {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Cancel with a caller-supplied reason.
    pub fn cancel(&self, reason: impl Into<String>) {
        self.abort(AbortReason::Caller(reason.into()));
    }

    /// Store `reason` unless a reason is already set. Returns whether this
    /// call was the one that fired.
    pub fn abort(&self, reason: AbortReason) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.tx.borrow().is_some()
    }
}

impl Default for Canceller {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of a `Canceller`.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<Option<AbortReason>>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(None);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.borrow().is_some()
    }

    pub fn reason(&self) -> Option<AbortReason> {
        self.rx.borrow().clone()
    }

    /// Resolve once the signal fires. Pends forever if the controller is
    /// dropped without cancelling.
    pub async fn cancelled(&self) -> AbortReason {
        let mut rx = self.rx.clone();
        let fired = match rx.wait_for(Option::is_some).await {
            Ok(reason) => reason.clone(),
            Err(_) => None,
        };
        match fired {
            Some(reason) => reason,
            None => future::pending().await,
        }
    }
}

/// Composite cancellation for a single call.
#[derive(Debug)]
pub struct CancelScope {
    controller: Canceller,
    parent: Option<CancelSignal>,
    timeout: Duration,
}

impl CancelScope {
    /// A zero `timeout` disables the timer.
    pub fn new(parent: Option<CancelSignal>, timeout: Duration) -> Self {
        let controller = Canceller::new();
        if let Some(reason) = parent.as_ref().and_then(CancelSignal::reason) {
            debug!(%reason, "caller signal already cancelled");
            controller.abort(reason);
        }
        Self {
            controller,
            parent,
            timeout,
        }
    }

    /// The composite signal. This is the only signal the transport sees.
    pub fn signal(&self) -> CancelSignal {
        self.controller.signal()
    }

    /// Drive `call` to completion while the timer and the caller signal
    /// race to cancel the composite.
    pub async fn run<F: Future>(self, call: F) -> F::Output {
        let Self {
            controller,
            parent,
            timeout,
        } = self;

        tokio::pin!(call);
        if controller.is_cancelled() {
            return call.await;
        }

        let fire = async {
            let reason = tokio::select! {
                () = tokio::time::sleep(timeout), if !timeout.is_zero() => {
                    AbortReason::Timeout(timeout)
                }
                reason = wait_parent(parent.as_ref()) => reason,
            };
            debug!(%reason, "cancelling request");
            controller.abort(reason);
        };

        tokio::select! {
            output = &mut call => return output,
            () = fire => {}
        }
        // The timer is gone; let the transport observe the composite.
        call.await
    }
}

async fn wait_parent(parent: Option<&CancelSignal>) -> AbortReason {
    match parent {
        Some(signal) => signal.cancelled().await,
        None => future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_reason_wins() {
        let canceller = Canceller::new();
        let signal = canceller.signal();
        assert!(!signal.is_cancelled());

        canceller.cancel("first");
        assert!(!canceller.abort(AbortReason::Caller("second".to_string())));
        assert_eq!(signal.reason(), Some(AbortReason::Caller("first".to_string())));
    }

    #[test]
    fn never_signal_is_not_cancelled() {
        assert!(!CancelSignal::never().is_cancelled());
    }

    #[test]
    fn precancelled_parent_cancels_composite_immediately() {
        let caller = Canceller::new();
        caller.cancel("user left the page");
        let scope = CancelScope::new(Some(caller.signal()), Duration::from_secs(30));
        assert_eq!(
            scope.signal().reason(),
            Some(AbortReason::Caller("user left the page".to_string()))
        );
    }

    #[tokio::test]
    async fn timeout_fires_composite() {
        let scope = CancelScope::new(None, Duration::from_millis(20));
        let signal = scope.signal();
        let reason = scope.run(async move { signal.cancelled().await }).await;
        assert_eq!(reason, AbortReason::Timeout(Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn caller_signal_propagates() {
        let caller = Canceller::new();
        let scope = CancelScope::new(Some(caller.signal()), Duration::from_secs(30));
        let signal = scope.signal();

        let trigger = caller.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel("stop");
        });

        let reason = scope.run(async move { signal.cancelled().await }).await;
        assert_eq!(reason, AbortReason::Caller("stop".to_string()));
    }

    #[tokio::test]
    async fn completed_call_leaves_composite_untouched() {
        let scope = CancelScope::new(None, Duration::from_millis(10));
        let signal = scope.signal();
        let value = scope.run(async { 42 }).await;
        assert_eq!(value, 42);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!signal.is_cancelled());
    }

    #[tokio::test]
    async fn zero_timeout_disables_timer() {
        let scope = CancelScope::new(None, Duration::ZERO);
        let signal = scope.signal();
        let value = scope
            .run(async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                "done"
            })
            .await;
        assert_eq!(value, "done");
        assert!(!signal.is_cancelled());
    }
}
