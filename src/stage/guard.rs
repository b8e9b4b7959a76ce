//! Mutual exclusion around destructive and action-submitting sections
//!
//! One guard exists per firing. The scheduler never runs two firings of the
//! stage for the same node at once, so the lock is not contended across
//! threads; it does not protect against concurrent writers. What it provides
//! is the pairing of every guarded operation with the settle delay and a
//! release that happens on every exit path.

use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::interrupt::InterruptSignal;

pub struct MutualExclusionGuard {
    lock: Mutex<()>,
    settle_delay: Duration,
    interrupt: InterruptSignal,
}

impl MutualExclusionGuard {
    pub fn new(settle_delay: Duration, interrupt: InterruptSignal) -> Self {
        Self {
            lock: Mutex::new(()),
            settle_delay,
            interrupt,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.lock.try_lock().is_err()
    }

    /// Run `operation` while holding the lock, then wait out the settle delay
    /// before releasing it.
    ///
    /// Returns `None` without running anything when the lock is already held.
    pub async fn run<F, T>(&self, section: &str, operation: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        let _held = match self.lock.try_lock() {
            Ok(held) => held,
            Err(_) => {
                warn!("{} skipped: guard already held", section);
                return None;
            }
        };

        let output = operation.await;
        self.settle(section).await;
        Some(output)
    }

    async fn settle(&self, section: &str) {
        if self.settle_delay.is_zero() {
            return;
        }

        debug!("{}: settling for {:?}", section, self.settle_delay);
        tokio::select! {
            _ = sleep(self.settle_delay) => {}
            _ = self.interrupt.wait() => {
                warn!("{}: settle delay interrupted, releasing guard", section);
            }
        }
    }
}
