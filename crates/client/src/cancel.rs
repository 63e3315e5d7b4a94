//! Interrupt handling
//!
//! One coordinator per process. Every handle a transaction opens is
//! registered with it. The first interrupt disarms it, cancels every
//! registered handle and fires the [`CancelToken`]; any later interrupt
//! must force the process down.

use pkc_bus::{EventChannel, HandleId};
use pkc_errors::{Error, TransactionError};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, warn};

/// What the caller must do after an interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// First interrupt: outstanding handles were asked to cancel
    Graceful { cancelled: usize, failed: usize },
    /// A graceful attempt already happened; exit now
    Forced,
}

struct Inner {
    bus: Arc<dyn EventChannel>,
    armed: AtomicBool,
    handles: Mutex<BTreeSet<HandleId>>,
    token: watch::Sender<bool>,
}

#[derive(Clone)]
pub struct CancellationCoordinator {
    inner: Arc<Inner>,
}

impl CancellationCoordinator {
    #[must_use]
    pub fn new(bus: Arc<dyn EventChannel>) -> Self {
        let (token, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                bus,
                armed: AtomicBool::new(true),
                handles: Mutex::new(BTreeSet::new()),
                token,
            }),
        }
    }

    fn handles(&self) -> MutexGuard<'_, BTreeSet<HandleId>> {
        self.inner
            .handles
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn register(&self, handle: HandleId) {
        self.handles().insert(handle);
    }

    pub fn unregister(&self, handle: HandleId) {
        self.handles().remove(&handle);
    }

    /// Handles an interrupt would cancel
    #[must_use]
    pub fn outstanding(&self) -> Vec<HandleId> {
        self.handles().iter().copied().collect()
    }

    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        !self.inner.armed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn token(&self) -> CancelToken {
        CancelToken(self.inner.token.subscribe())
    }

    /// Handle one interrupt
    ///
    /// Only the first call cancels anything. Cancel failures are logged
    /// and counted, never retried.
    pub async fn interrupt(&self) -> Interrupt {
        if !self.inner.armed.swap(false, Ordering::SeqCst) {
            debug!("second interrupt, forcing exit");
            return Interrupt::Forced;
        }

        let handles = self.outstanding();
        debug!(count = handles.len(), "cancelling outstanding handles");
        let mut cancelled = 0;
        let mut failed = 0;
        for handle in handles {
            match self.inner.bus.cancel(handle).await {
                Ok(()) => cancelled += 1,
                Err(e) => {
                    warn!(%handle, error = %e, "failed to cancel handle");
                    failed += 1;
                }
            }
        }
        self.inner.token.send_replace(true);
        Interrupt::Graceful { cancelled, failed }
    }
}

impl std::fmt::Debug for CancellationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationCoordinator")
            .field("interrupted", &self.is_interrupted())
            .field("handles", &self.outstanding())
            .finish_non_exhaustive()
    }
}

/// Cooperative cancellation signal fired by the first interrupt
#[derive(Debug, Clone)]
pub struct CancelToken(watch::Receiver<bool>);

impl CancelToken {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolve once the token fires; never resolves if it cannot fire
    pub async fn cancelled(&mut self) {
        loop {
            if *self.0.borrow_and_update() {
                return;
            }
            if self.0.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Run `work` unless the token fires first
    ///
    /// # Errors
    ///
    /// Returns `Interrupted` when the token fires, otherwise whatever
    /// `work` returns.
    pub async fn guard<T, F>(mut self, work: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        tokio::select! {
            biased;
            () = self.cancelled() => Err(TransactionError::Interrupted.into()),
            result = work => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkc_bus::memory::MemoryBus;

    #[tokio::test]
    async fn test_first_interrupt_cancels_then_second_forces() {
        let bus = Arc::new(MemoryBus::default());
        let coordinator = CancellationCoordinator::new(bus.clone());
        let (a, _events_a) = bus.open().await.unwrap();
        let (b, _events_b) = bus.open().await.unwrap();
        coordinator.register(a);
        coordinator.register(b);

        let token = coordinator.token();
        assert!(!token.is_cancelled());

        assert_eq!(
            coordinator.interrupt().await,
            Interrupt::Graceful {
                cancelled: 2,
                failed: 0
            }
        );
        assert!(token.is_cancelled());
        assert_eq!(bus.cancelled(), vec![a, b]);

        for _ in 0..3 {
            assert_eq!(coordinator.interrupt().await, Interrupt::Forced);
        }
        assert_eq!(bus.cancelled().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_cancel_is_counted() {
        let bus = Arc::new(MemoryBus::default());
        let coordinator = CancellationCoordinator::new(bus.clone());
        let (handle, _events) = bus.open().await.unwrap();
        coordinator.register(handle);
        bus.disconnect();

        assert_eq!(
            coordinator.interrupt().await,
            Interrupt::Graceful {
                cancelled: 0,
                failed: 1
            }
        );
    }

    #[tokio::test]
    async fn test_guard_returns_interrupted() {
        let bus = Arc::new(MemoryBus::default());
        let coordinator = CancellationCoordinator::new(bus);
        let token = coordinator.token();

        let waiting = tokio::spawn(token.guard(std::future::pending::<Result<(), Error>>()));
        coordinator.interrupt().await;
        let result = waiting.await.unwrap();
        assert!(result.unwrap_err().is_interrupted());

        let done = coordinator.token().guard(async { Ok(5) }).await;
        assert!(done.unwrap_err().is_interrupted());
    }
}
