use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepOutcome {
    Elapsed,
    Cancelled,
}

/// Cooperative stop signal shared between the interrupt handler and the poll loop.
///
/// Set once, never cleared. Triggering again is a no-op.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Trigger on the first Ctrl-C.
    pub fn install_ctrl_c(&self) {
        let shutdown = self.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("interrupt received, shutting down");
                    shutdown.trigger();
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to listen for interrupt signal");
                }
            }
        });
    }

    /// Sleep for `total` in slices of at most `slice`, checking the flag
    /// between slices.
    pub async fn sleep_sliced(&self, total: Duration, slice: Duration) -> SleepOutcome {
        let slice = if slice.is_zero() { Duration::from_secs(1) } else { slice };
        let deadline = Instant::now() + total;

        loop {
            if self.is_triggered() {
                return SleepOutcome::Cancelled;
            }
            let now = Instant::now();
            if now >= deadline {
                return SleepOutcome::Elapsed;
            }
            let step = (deadline - now).min(slice);
            tokio::select! {
                _ = self.token.cancelled() => return SleepOutcome::Cancelled,
                _ = tokio::time::sleep(step) => {}
            }
        }
    }
}
