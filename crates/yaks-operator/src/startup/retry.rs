//! Bounded retry for startup calls against the API server
//!
//! The API server may still be coming up when the operator starts, so the
//! few calls made before the controller runs are retried with a doubling,
//! jittered delay. Reconciliation never goes through here.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{error, warn};

/// How often and how patiently a startup call is retried
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Backoff {
    /// Calls made before giving up, at least one
    pub attempts: u32,
    /// Delay after the first failure
    pub initial: Duration,
    /// Upper bound for any single delay
    pub max: Duration,
}

impl Backoff {
    /// Schedule used for installing the Test CRD
    pub const CRD_INSTALL: Backoff = Backoff {
        attempts: 5,
        initial: Duration::from_millis(500),
        max: Duration::from_secs(8),
    };

    /// Delay after `failures` consecutive failures, before jitter
    pub fn delay(&self, failures: u32) -> Duration {
        let factor = 1u32
            .checked_shl(failures.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial.saturating_mul(factor).min(self.max)
    }

    /// [`Backoff::delay`] scaled by a random factor in `[0.5, 1.0]`
    fn jittered(&self, failures: u32) -> Duration {
        self.delay(failures)
            .mul_f64(rand::thread_rng().gen_range(0.5..=1.0))
    }
}

/// Call `op` until it succeeds or `backoff.attempts` calls have failed
///
/// The error of the last call is returned.
pub async fn with_backoff<T, E, F, Fut>(backoff: &Backoff, what: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = backoff.attempts.max(1);
    let mut failures = 0;

    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        failures += 1;
        if failures >= attempts {
            error!(what, failures, error = %err, "giving up");
            return Err(err);
        }

        let delay = backoff.jittered(failures);
        warn!(what, failures, delay_ms = delay.as_millis() as u64, error = %err, "retrying");
        tokio::time::sleep(delay).await;
    }
}
