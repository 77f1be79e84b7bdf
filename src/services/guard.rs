// Per-call timeout and bounded retry for external collaborators.
//
// Geocoding and topic-model calls are blocking I/O against services we
// don't control. Every call goes through a ServiceGuard: each attempt is
// bounded by a timeout, a failed or timed-out attempt is retried a fixed
// number of times, and exhaustion comes back as an ordinary error. Callers
// turn that error into their "unknown" sentinel; nothing here decides
// sentinel semantics.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, warn};

/// Timeout + retry policy for one class of external calls.
#[derive(Debug, Clone, Copy)]
pub struct ServiceGuard {
    /// Upper bound for a single attempt
    pub timeout: Duration,
    /// Extra attempts after the first one fails
    pub retries: u32,
}

impl Default for ServiceGuard {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retries: 1,
        }
    }
}

impl ServiceGuard {
    pub fn new(timeout: Duration, retries: u32) -> Self {
        Self { timeout, retries }
    }

    /// Run `attempt` until it succeeds or the retry budget is spent.
    ///
    /// `service` and `op` only label log lines and the final error.
    pub async fn call<T, F, Fut>(&self, service: &str, op: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.retries + 1;
        let mut last_error = None;

        for n in 1..=attempts {
            match tokio::time::timeout(self.timeout, attempt()).await {
                Ok(Ok(value)) => {
                    if n > 1 {
                        debug!(service, op, attempt = n, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Ok(Err(e)) => {
                    warn!(service, op, attempt = n, error = %e, "External call failed");
                    last_error = Some(e);
                }
                Err(_) => {
                    warn!(
                        service,
                        op,
                        attempt = n,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "External call timed out"
                    );
                    last_error = Some(anyhow::anyhow!(
                        "{service} {op} timed out after {:?}",
                        self.timeout
                    ));
                }
            }
        }

        let e = last_error.unwrap_or_else(|| anyhow::anyhow!("{service} {op} was never attempted"));
        Err(e.context(format!("{service} {op} failed after {attempts} attempt(s)")))
    }
}
