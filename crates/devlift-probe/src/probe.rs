//! Single-use, cancellable probes.
//!
//! A [`Probe`] wraps one [`Checker`] invocation. It may be run exactly
//! once; running it twice is a programming error and panics. Cancellation
//! is latched: a cancelled probe resolves to failure whether the cancel
//! arrived before `run` started or while the check was in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;
use tracing::debug;

use crate::checker::Checker;

struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cloneable handle that cancels a [`Probe`] from any task.
///
/// Used by the scheduler's watchdog to enforce the check timeout; callers
/// may also cancel directly. `cancel` is idempotent.
#[derive(Clone)]
pub struct CancelHandle {
    inner: Arc<CancelState>,
}

impl CancelHandle {
    fn new() -> Self {
        Self {
            inner: Arc::new(CancelState {
                cancelled: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Latches the cancellation flag and wakes the probe if it is running.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Resolves once the flag is latched. The notified future is created
    /// before the flag is read so a concurrent `cancel` cannot be missed.
    async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// A one-shot health check bound to a checker.
pub struct Probe {
    checker: Box<dyn Checker>,
    cancel: CancelHandle,
    ran: AtomicBool,
}

impl Probe {
    pub(crate) fn new(checker: Box<dyn Checker>) -> Self {
        Self {
            checker,
            cancel: CancelHandle::new(),
            ran: AtomicBool::new(false),
        }
    }

    /// Handle for cancelling this probe from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Executes the check once. Returns `true` on success, `false` on any
    /// check failure or cancellation. A cancelled check is abandoned by
    /// dropping its future, which tears down the underlying connection.
    ///
    /// # Panics
    ///
    /// Panics if called a second time on the same instance.
    pub async fn run(&self) -> bool {
        if self.ran.swap(true, Ordering::SeqCst) {
            panic!("Probe::run called twice on the same instance");
        }
        if self.cancel.is_cancelled() {
            return false;
        }
        tokio::select! {
            result = self.checker.check() => match result {
                Ok(()) => true,
                Err(error) => {
                    debug!(error = %error, "probe check failed");
                    false
                }
            },
            _ = self.cancel.cancelled() => {
                debug!("probe check cancelled");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    struct StaticChecker {
        ok: bool,
    }

    #[async_trait::async_trait]
    impl Checker for StaticChecker {
        async fn check(&self) -> anyhow::Result<()> {
            if self.ok {
                Ok(())
            } else {
                anyhow::bail!("server unreachable")
            }
        }
    }

    /// Never completes; stands in for a hung connection.
    struct StallChecker;

    #[async_trait::async_trait]
    impl Checker for StallChecker {
        async fn check(&self) -> anyhow::Result<()> {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    struct CountingChecker {
        calls: Arc<AtomicU32>,
    }

    #[async_trait::async_trait]
    impl Checker for CountingChecker {
        async fn check(&self) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn run_returns_true_on_success() {
        let probe = Probe::new(Box::new(StaticChecker { ok: true }));
        assert!(probe.run().await);
    }

    #[tokio::test]
    async fn run_returns_false_on_check_failure() {
        let probe = Probe::new(Box::new(StaticChecker { ok: false }));
        assert!(!probe.run().await);
    }

    #[tokio::test]
    #[should_panic(expected = "called twice")]
    async fn run_twice_panics() {
        let probe = Probe::new(Box::new(StaticChecker { ok: true }));
        probe.run().await;
        probe.run().await;
    }

    #[tokio::test]
    async fn cancel_before_run_skips_the_check() {
        let calls = Arc::new(AtomicU32::new(0));
        let probe = Probe::new(Box::new(CountingChecker {
            calls: calls.clone(),
        }));
        probe.cancel_handle().cancel();
        assert!(!probe.run().await);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancel_interrupts_in_flight_check() {
        let probe = Probe::new(Box::new(StallChecker));
        let cancel = probe.cancel_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });
        let passed = tokio::time::timeout(Duration::from_secs(2), probe.run())
            .await
            .expect("cancelled probe must resolve promptly");
        assert!(!passed);
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let probe = Probe::new(Box::new(StaticChecker { ok: true }));
        let cancel = probe.cancel_handle();
        cancel.cancel();
        cancel.cancel();
        assert!(cancel.is_cancelled());
        assert!(!probe.run().await);
    }
}
