//! Configuration for the dispatcher and the relay coordinator

use std::time::Duration;

use rand::Rng;
use url::Url;

use crate::error::{
    Error,
    Result,
};

pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(2);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_millis(9);
pub const DEFAULT_BACKOFF_FACTOR: u32 = 2;
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(2);
pub const DEFAULT_MAX_BODY_SIZE: usize = 8 * 1024 * 1024;

/// Retry, timeout and backoff policy of the HTTP client.
///
/// `retries` counts extra attempts, so a request is sent at most
/// `retries + 1` times. Answers with a body larger than `max_body_size`
/// bytes fail as transport errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_factor: u32,
    pub max_jitter: Duration,
    pub max_body_size: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            timeout: DEFAULT_TIMEOUT,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            max_jitter: DEFAULT_MAX_JITTER,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl RetryPolicy {
    /// Default policy with the retry count and timeout replaced.
    pub fn with_request_config(retries: u32, timeout: Duration) -> Self {
        Self {
            retries,
            timeout,
            ..Default::default()
        }
    }

    /// Delay before retry number `attempt` (zero based), without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let growth = self.backoff_factor.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(growth)
            .min(self.max_backoff)
    }

    /// [`Self::backoff`] plus a uniform jitter in `[0, max_jitter)`.
    pub(crate) fn backoff_with_jitter(&self, attempt: u32) -> Duration {
        let jitter_micros = u64::try_from(self.max_jitter.as_micros()).unwrap_or(u64::MAX);
        let jitter = if jitter_micros == 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(rand::rng().random_range(0..jitter_micros))
        };
        self.backoff(attempt) + jitter
    }
}

/// Configuration owned by one [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Default node URL, used when a call names no other target.
    pub rpc_url: Url,
    /// Bootstrap nodes asked for new sessions.
    pub dispatchers: Vec<Url>,
    pub retry: RetryPolicy,
}

impl DispatcherConfig {
    pub fn new(rpc_url: &str) -> Result<Self> {
        Ok(Self {
            rpc_url: Url::parse(rpc_url)?,
            dispatchers: Vec::new(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_dispatchers<I, S>(mut self, dispatchers: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.dispatchers = dispatchers
            .into_iter()
            .map(|url| Url::parse(url.as_ref()))
            .collect::<std::result::Result<_, _>>()?;
        Ok(self)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Checks that every configured URL is an http(s) URL with a host.
    pub fn validate(&self) -> Result<()> {
        validate_http_url("rpc_url", &self.rpc_url)?;
        for dispatcher in &self.dispatchers {
            validate_http_url("dispatcher", dispatcher)?;
        }
        Ok(())
    }
}

fn validate_http_url(name: &str, url: &Url) -> Result<()> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "{name} must use http or https, got '{url}'"
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(Error::Config(format!("{name} has no host: '{url}'")));
    }
    Ok(())
}

/// Behavior switches of the [`Relayer`](crate::Relayer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayerConfig {
    /// Reject sessions without a header before any network call.
    pub require_session_header: bool,
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            require_session_header: true,
        }
    }
}
