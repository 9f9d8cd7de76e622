//! Upload configuration.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::wait::{DEFAULT_POLL_INTERVAL, WaitOptions};

/// Parameters for one upload orchestration.
///
/// `source` and `storage_domain_id` are the two required inputs; everything
/// else has a default that mirrors the classic behavior: 5 s polling, no wait
/// ceiling, downloaded images left on disk for reuse.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Image location: a local path, a `file://` URI, or an `http(s)://` URL.
    pub source: String,
    /// Storage domain the disk is created in.
    pub storage_domain_id: String,
    /// Disk alias. Randomized when absent; the engine-assigned disk id is the
    /// authoritative identifier either way.
    pub alias: Option<String>,
    /// Keep the downloaded spool file after the run so a later invocation can
    /// reuse it. Local sources are never deleted regardless of this flag.
    pub cache_download: bool,
    /// Interval between engine status polls.
    pub poll_interval: Duration,
    /// Upper bound on each convergence wait. `None` waits forever.
    pub max_wait: Option<Duration>,
    /// Cancellation signal checked between polls.
    pub cancel: CancellationToken,
}

impl UploadOptions {
    pub fn new(source: impl Into<String>, storage_domain_id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            storage_domain_id: storage_domain_id.into(),
            alias: None,
            cache_download: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn keep_download(mut self, cache: bool) -> Self {
        self.cache_download = cache;
        self
    }

    pub(crate) fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            interval: self.poll_interval,
            max_wait: self.max_wait,
            cancel: self.cancel.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = UploadOptions::new("/tmp/image.qcow2", "sd-1");
        assert_eq!(opts.source, "/tmp/image.qcow2");
        assert_eq!(opts.storage_domain_id, "sd-1");
        assert!(opts.alias.is_none());
        assert!(opts.cache_download);
        assert_eq!(opts.poll_interval, DEFAULT_POLL_INTERVAL);
        assert!(opts.max_wait.is_none());
    }

    #[test]
    fn test_builders() {
        let opts = UploadOptions::new("https://host/image", "sd-2")
            .with_alias("golden-image")
            .with_poll_interval(Duration::from_secs(1))
            .with_max_wait(Duration::from_secs(600))
            .keep_download(false);
        assert_eq!(opts.alias.as_deref(), Some("golden-image"));
        assert_eq!(opts.poll_interval, Duration::from_secs(1));
        assert_eq!(opts.max_wait, Some(Duration::from_secs(600)));
        assert!(!opts.cache_download);
    }

    #[test]
    fn test_wait_options_share_cancel() {
        let opts = UploadOptions::new("/a", "sd-1");
        let wait = opts.wait_options();
        opts.cancel.cancel();
        assert!(wait.cancel.is_cancelled());
    }
}
