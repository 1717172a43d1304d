use std::{collections::HashMap, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{Client, Error, Result};

/// Configuration for [`Client`].
///
/// # Examples
/// ```no_run
/// # use featuregate::{ClientConfig, Environment};
/// let client = ClientConfig::from_secret_key("secret-key")
///     .environment(Environment::tier("staging"))
///     .to_client()
///     .expect("valid configuration");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub(crate) secret_key: String,
    pub(crate) api_base_url: String,
    pub(crate) environment: Environment,
    pub(crate) sync_interval: Duration,
    pub(crate) sync_jitter: Duration,
    pub(crate) flush_interval: Duration,
    pub(crate) max_buffered_events: usize,
    pub(crate) request_timeout: Duration,
    pub(crate) retry: RetryPolicy,
    pub(crate) sdk_metadata: SdkMetadata,
}

impl ClientConfig {
    /// Default base URL for API calls.
    pub const DEFAULT_API_BASE_URL: &'static str = "https://api.featuregate.dev/v1";
    /// Default value for [`ClientConfig::sync_interval`].
    pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(10);
    /// Default value for [`ClientConfig::flush_interval`].
    pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(60);
    /// Default value for [`ClientConfig::max_buffered_events`].
    pub const DEFAULT_MAX_BUFFERED_EVENTS: usize = 500;
    /// Default value for [`ClientConfig::request_timeout`].
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

    /// Create a default configuration using the specified server secret key.
    ///
    /// ```
    /// # use featuregate::ClientConfig;
    /// ClientConfig::from_secret_key("secret-key");
    /// ```
    pub fn from_secret_key(secret_key: impl Into<String>) -> Self {
        ClientConfig {
            secret_key: secret_key.into(),
            api_base_url: ClientConfig::DEFAULT_API_BASE_URL.to_owned(),
            environment: Environment::default(),
            sync_interval: ClientConfig::DEFAULT_SYNC_INTERVAL,
            sync_jitter: Duration::ZERO,
            flush_interval: ClientConfig::DEFAULT_FLUSH_INTERVAL,
            max_buffered_events: ClientConfig::DEFAULT_MAX_BUFFERED_EVENTS,
            request_timeout: ClientConfig::DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
            sdk_metadata: SdkMetadata::default(),
        }
    }

    /// Override base URL for API calls. Clients should use the default setting in most cases.
    pub fn api_base_url(mut self, api_base_url: impl Into<String>) -> Self {
        self.api_base_url = api_base_url.into();
        self
    }

    /// Set the environment merged into every evaluated user.
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Interval between background spec syncs.
    ///
    /// The cadence is fixed: a cached snapshot may be up to one interval stale.
    pub fn sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Randomized amount subtracted from each sync interval. Defaults to zero.
    pub fn sync_jitter(mut self, jitter: Duration) -> Self {
        self.sync_jitter = jitter;
        self
    }

    /// Interval between background exposure flushes.
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Number of buffered events that triggers an early flush.
    pub fn max_buffered_events(mut self, max: usize) -> Self {
        self.max_buffered_events = max.max(1);
        self
    }

    /// Per-request timeout for every call to the server.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Override retry backoff parameters.
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Identify a wrapping SDK in request metadata.
    pub fn sdk_metadata(mut self, sdk_metadata: SdkMetadata) -> Self {
        self.sdk_metadata = sdk_metadata;
        self
    }

    /// Create a new [`Client`] using this configuration.
    ///
    /// Blocks for the initial spec download. See [`Client::new`].
    pub fn to_client(self) -> Result<Client> {
        Client::new(self)
    }

    /// Check the parts of the configuration that make the client unusable when wrong.
    pub(crate) fn validate(&self) -> Result<url::Url> {
        if !self.secret_key.starts_with("secret-") {
            return Err(Error::InvalidSecretKey);
        }
        let base = self.api_base_url.trim_end_matches('/');
        url::Url::parse(base).map_err(Error::InvalidBaseUrl)
    }
}

/// Environment the SDK runs in. Merged into every user before evaluation so that rules can
/// target `environment_field` conditions (e.g., `tier`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Environment tier, e.g. `production`, `staging`, `development`.
    pub tier: Option<String>,
    /// Additional environment parameters.
    pub params: HashMap<String, String>,
}

impl Environment {
    /// Environment with just a tier set.
    pub fn tier(tier: impl Into<String>) -> Environment {
        Environment {
            tier: Some(tier.into()),
            params: HashMap::new(),
        }
    }
}

/// Exponential backoff parameters for retried requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Factor applied to the delay after each retry.
    pub multiplier: u32,
    /// Upper bound for a single delay.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Number of retries for the spec download.
    pub(crate) const FETCH_SPECS_RETRIES: u32 = 2;
    /// Number of retries for a remote evaluation. Kept low as it runs on the caller's thread.
    pub(crate) const REMOTE_EVALUATE_RETRIES: u32 = 1;
    /// Number of retries for an event batch.
    pub(crate) const SEND_EVENTS_RETRIES: u32 = 4;

    /// Delay before retry number `attempt` (zero-based), without jitter.
    pub(crate) fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> RetryPolicy {
        RetryPolicy {
            initial_backoff: Duration::from_millis(100),
            multiplier: 10,
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// SDK identification sent along with every request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkMetadata {
    /// SDK name, e.g. `rust-sdk`.
    pub sdk_type: String,
    /// SDK version.
    pub sdk_version: String,
}

impl Default for SdkMetadata {
    fn default() -> SdkMetadata {
        SdkMetadata {
            sdk_type: "rust-sdk".to_owned(),
            sdk_version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}
