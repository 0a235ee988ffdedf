//! Installer configuration.
//!
//! Built once at process start and shared read-only for the rest of the run.

use std::path::PathBuf;
use std::time::Duration;

use crate::paths;

/// How often a transient download failure is retried.
///
/// Only transport errors and 5xx/429 responses count as transient.
/// Checksum mismatches are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each attempt after.
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
        }
    }

    /// Total attempts allowed, at least one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// Everything the pipeline needs to know about the local environment.
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Directory the binary is copied into.
    pub bin_dir: PathBuf,
    /// Parent of the per-run staging directory.
    pub tmp_dir: PathBuf,
    /// Download retry policy.
    pub retry: RetryPolicy,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl InstallerConfig {
    /// Default layout under the given tapbin home.
    pub fn for_home(home: &std::path::Path) -> Self {
        Self {
            bin_dir: paths::bin_path(home),
            tmp_dir: paths::tmp_path(home),
            retry: RetryPolicy::default(),
            user_agent: crate::USER_AGENT.to_string(),
        }
    }

    /// Default layout under `TAPBIN_HOME` or `~/.tapbin`.
    ///
    /// Returns `None` if no home directory can be determined.
    pub fn from_env() -> Option<Self> {
        paths::try_tapbin_home().map(|home| Self::for_home(&home))
    }

    /// Install into a different directory.
    pub fn with_bin_dir(mut self, bin_dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = bin_dir.into();
        self
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(100),
        };
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(400));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            initial_backoff: Duration::ZERO,
        };
        assert_eq!(policy.attempts(), 1);
        assert_eq!(RetryPolicy::none().attempts(), 1);
    }

    #[test]
    fn overrides_apply() {
        let cfg = InstallerConfig::for_home(std::path::Path::new("/h"))
            .with_bin_dir("/usr/local/bin")
            .with_retry(RetryPolicy::none());
        assert_eq!(cfg.bin_dir, PathBuf::from("/usr/local/bin"));
        assert_eq!(cfg.tmp_dir, PathBuf::from("/h/tmp"));
        assert_eq!(cfg.retry.max_attempts, 1);
    }
}
