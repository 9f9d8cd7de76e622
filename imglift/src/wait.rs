//! Convergence waiting on eventually-consistent engine state.
//!
//! The engine mutates disks and transfers asynchronously; the orchestrator can
//! only poll until the remote object reaches the state it needs. [`wait_for`]
//! is that primitive: a fixed-interval poll loop with an injected cancellation
//! token and an optional elapsed-time budget. The default is an unbounded
//! wait, so callers that need a ceiling must set one.

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

use crate::errors::{UploadError, UploadResult};

/// Interval between poll attempts unless overridden.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Poll-loop parameters shared by all convergence waits of one orchestration.
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Sleep between probe attempts. No backoff, no jitter.
    pub interval: Duration,
    /// Abort with [`UploadError::Timeout`] once this much time has elapsed.
    pub max_wait: Option<Duration>,
    /// Externally injected cancellation signal.
    pub cancel: CancellationToken,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_wait: None,
            cancel: CancellationToken::new(),
        }
    }
}

/// One probe outcome: either the awaited state, or keep polling.
pub enum Wait<T> {
    Done(T),
    Pending,
}

/// Poll `probe` until it reports [`Wait::Done`].
///
/// A probe error aborts the wait immediately; probes that want to tolerate
/// transient failures map them to [`Wait::Pending`] themselves. `what` names
/// the awaited condition in log lines and in the `Cancelled`/`Timeout` errors.
pub async fn wait_for<T, F>(what: &str, opts: &WaitOptions, mut probe: F) -> UploadResult<T>
where
    F: AsyncFnMut() -> UploadResult<Wait<T>>,
{
    let started = Instant::now();
    loop {
        if opts.cancel.is_cancelled() {
            return Err(UploadError::Cancelled(what.to_string()));
        }

        if let Wait::Done(value) = probe().await? {
            return Ok(value);
        }

        if let Some(max) = opts.max_wait
            && started.elapsed() >= max
        {
            return Err(UploadError::Timeout(what.to_string()));
        }

        tracing::debug!("waiting for {}", what);
        tokio::select! {
            _ = sleep(opts.interval) => {}
            _ = opts.cancel.cancelled() => {
                return Err(UploadError::Cancelled(what.to_string()));
            }
        }
    }
}
