//! Poll-until-true primitive.
//!
//! Callers use this to wait out eventually-consistent provider state after
//! a mutating call ("list size has changed", "interface is up"). It knows
//! nothing about the invocation engine; the predicate is an opaque
//! boolean-returning operation.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Evaluates a predicate on a fixed interval until it holds or attempts run
/// out.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    interval: Duration,
    max_attempts: u32,
}

impl Poller {
    /// `max_attempts` counts total evaluations, including the immediate
    /// first one.
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Evaluate the predicate immediately, then on each interval. Returns
    /// true on the first true evaluation, false once attempts are
    /// exhausted.
    pub async fn apply<F, Fut>(&self, mut predicate: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        for attempt in 0..self.max_attempts {
            if predicate().await {
                return true;
            }
            if attempt + 1 < self.max_attempts {
                sleep(self.interval).await;
            }
        }
        false
    }

    /// Synchronous-predicate convenience wrapper.
    pub async fn apply_fn<F>(&self, mut predicate: F) -> bool
    where
        F: FnMut() -> bool,
    {
        self.apply(|| std::future::ready(predicate())).await
    }
}
