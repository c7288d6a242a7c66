use std::time::Duration;

use super::error::{JwksError, Result};

// Defaults for the optional settings
const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300); // 5 minutes
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024; // 1 MB
// Stands in for a zero interval so the loop never spins
const ZERO_INTERVAL_FLOOR: Duration = Duration::from_millis(1);

/// Settings for a `KeyRotator`.
///
/// Only the endpoint is mandatory. Every other parameter is `None` until set
/// explicitly and falls back to its default through the `effective_*` getters.
#[derive(Debug, Clone)]
pub struct RotatorConfig {
    endpoint: String,

    /// Interval used by `start_default_rotation` (None = use default)
    refresh_interval: Option<Duration>,

    /// Upper bound on a single fetch (None = use default)
    fetch_timeout: Option<Duration>,

    /// Largest accepted response body (None = use default)
    max_body_size: Option<usize>,

    /// Floor applied to any rotation interval (None = no floor)
    min_refresh_interval: Option<Duration>,
}

impl RotatorConfig {
    /// Creates a config for `endpoint` with all optional parameters unset.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            refresh_interval: None,
            fetch_timeout: None,
            max_body_size: None,
            min_refresh_interval: None,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = Some(size);
        self
    }

    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = Some(interval);
        self
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout
    }

    pub fn max_body_size(&self) -> Option<usize> {
        self.max_body_size
    }

    pub fn min_refresh_interval(&self) -> Option<Duration> {
        self.min_refresh_interval
    }

    pub fn effective_refresh_interval(&self) -> Duration {
        self.refresh_interval.unwrap_or(DEFAULT_REFRESH_INTERVAL)
    }

    pub fn effective_fetch_timeout(&self) -> Duration {
        self.fetch_timeout.unwrap_or(DEFAULT_FETCH_TIMEOUT)
    }

    pub fn effective_max_body_size(&self) -> usize {
        self.max_body_size.unwrap_or(DEFAULT_MAX_BODY_SIZE)
    }

    pub fn effective_min_refresh_interval(&self) -> Duration {
        self.min_refresh_interval.unwrap_or(ZERO_INTERVAL_FLOOR)
    }

    /// Raises `interval` to the configured floor. Without one, only a zero
    /// interval is changed.
    pub fn clamp_interval(&self, interval: Duration) -> Duration {
        interval.max(self.effective_min_refresh_interval())
    }

    /// Rejects an empty endpoint and zero-valued limits.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(JwksError::Config("endpoint must not be empty".into()));
        }
        let durations = [
            ("refresh_interval", self.refresh_interval),
            ("fetch_timeout", self.fetch_timeout),
            ("min_refresh_interval", self.min_refresh_interval),
        ];
        for (name, value) in durations {
            if value == Some(Duration::ZERO) {
                return Err(JwksError::Config(format!("{} must be greater than zero", name)));
            }
        }
        if self.max_body_size == Some(0) {
            return Err(JwksError::Config("max_body_size must be greater than zero".into()));
        }
        Ok(())
    }
}
