//! Timer seam for retry back-off and batch pacing.
//!
//! Every deliberate wait in a cycle goes through a [`Sleeper`] so tests can
//! substitute a virtual clock and assert on the requested durations.

use std::time::Duration;

#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeper backed by `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
