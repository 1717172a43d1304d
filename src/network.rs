//! Communication with the control plane.
//!
//! [`Network`] is the seam between the evaluation core and the transport. [`HttpNetwork`] is the
//! production implementation; alternative transports (proxies, test doubles) implement the trait
//! and are passed to [`Client::with_network`](crate::Client::with_network).
use std::time::Duration;

use rand::{thread_rng, Rng};
use reqwest::{header::CONTENT_TYPE, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    config::{RetryPolicy, SdkMetadata},
    exposure_logger::Event,
    snapshot::SpecKind,
    spec::DownloadConfigSpecsResponse,
    ClientConfig, Error, Result, User,
};

/// Header carrying the server secret key.
pub const API_KEY_HEADER: &str = "FEATUREGATE-API-KEY";
/// Header carrying the client wall-clock time in epoch milliseconds.
pub const CLIENT_TIME_HEADER: &str = "FEATUREGATE-CLIENT-TIME";

const DOWNLOAD_CONFIG_SPECS_ENDPOINT: &str = "/download_config_specs";
const CHECK_GATE_ENDPOINT: &str = "/check_gate";
const GET_CONFIG_ENDPOINT: &str = "/get_config";
const LOG_EVENT_ENDPOINT: &str = "/log_event";

/// Calls the evaluation core makes to the control plane.
///
/// Implementations are responsible for authentication and retries. They are called from the
/// background sync thread, the background flush thread, and (for [`Network::remote_evaluate`])
/// from the thread of the caller whose evaluation could not be decided locally.
pub trait Network: Send + Sync {
    /// Download specs changed since `since_time` (epoch milliseconds, `0` for everything).
    fn fetch_specs(&self, since_time: i64) -> Result<DownloadConfigSpecsResponse>;

    /// Ask the server to evaluate a gate or config for `user`.
    fn remote_evaluate(&self, user: &User, name: &str, kind: SpecKind)
        -> Result<RemoteEvaluation>;

    /// Deliver a batch of exposure events.
    fn send_events(&self, events: &[Event]) -> Result<()>;
}

/// Authoritative decision returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEvaluation {
    /// `true`/`false` for gates, a JSON object for configs.
    #[serde(default)]
    pub value: serde_json::Value,
    /// Id of the rule that produced `value`. Empty when the server does not report one.
    #[serde(default)]
    pub rule_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DownloadConfigSpecsRequest<'a> {
    since_time: i64,
    metadata: &'a SdkMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckGateRequest<'a> {
    gate_name: &'a str,
    user: &'a User,
    metadata: &'a SdkMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetConfigRequest<'a> {
    config_name: &'a str,
    user: &'a User,
    metadata: &'a SdkMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LogEventRequest<'a> {
    events: &'a [Event],
    metadata: &'a SdkMetadata,
}

/// [`Network`] implementation over HTTP.
///
/// Every call is a JSON `POST` carrying the secret key and client time headers. Transient
/// failures (connection errors, gateway statuses) are retried with exponential backoff.
pub struct HttpNetwork {
    // Client holds a connection pool internally, so we're reusing the client between requests.
    client: reqwest::blocking::Client,
    api_base_url: String,
    secret_key: String,
    metadata: SdkMetadata,
    retry: RetryPolicy,
}

impl HttpNetwork {
    /// Create an HTTP transport from client configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSecretKey`] or [`Error::InvalidBaseUrl`] for invalid configuration.
    /// - [`Error::Network`] if the HTTP client could not be initialized.
    pub fn new(config: &ClientConfig) -> Result<HttpNetwork> {
        let api_base_url = config.validate()?;
        let client = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(HttpNetwork {
            client,
            api_base_url: api_base_url.as_str().trim_end_matches('/').to_owned(),
            secret_key: config.secret_key.clone(),
            metadata: config.sdk_metadata.clone(),
            retry: config.retry,
        })
    }

    fn post<O: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &impl Serialize,
        retries: u32,
    ) -> Result<O> {
        let bytes = self.post_with_retries(endpoint, body, retries)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn post_with_retries(
        &self,
        endpoint: &str,
        body: &impl Serialize,
        retries: u32,
    ) -> Result<Vec<u8>> {
        let body = serde_json::to_vec(body)?;

        let mut attempt = 0;
        loop {
            match self.post_once(endpoint, &body) {
                Err(err) if err.is_retryable() && attempt < retries => {
                    let backoff = with_jitter(self.retry.backoff(attempt));
                    log::debug!(target: "featuregate",
                                endpoint,
                                attempt,
                                backoff_ms = backoff.as_millis() as u64;
                                "retrying request after error: {err}");
                    std::thread::sleep(backoff);
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn post_once(&self, endpoint: &str, body: &[u8]) -> Result<Vec<u8>> {
        let url = reqwest::Url::parse(&format!("{}{}", self.api_base_url, endpoint))
            .map_err(Error::InvalidBaseUrl)?;

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.secret_key)
            .header(
                CLIENT_TIME_HEADER,
                chrono::Utc::now().timestamp_millis().to_string(),
            )
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_vec())
            .send()?;

        match response.status() {
            status if status.is_success() => Ok(response.bytes()?.to_vec()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                log::warn!(target: "featuregate", endpoint; "client is not authorized. Check your secret key");
                Err(Error::Unauthorized)
            }
            status => Err(Error::HttpStatus(status.as_u16())),
        }
    }
}

impl Network for HttpNetwork {
    fn fetch_specs(&self, since_time: i64) -> Result<DownloadConfigSpecsResponse> {
        self.post(
            DOWNLOAD_CONFIG_SPECS_ENDPOINT,
            &DownloadConfigSpecsRequest {
                since_time,
                metadata: &self.metadata,
            },
            RetryPolicy::FETCH_SPECS_RETRIES,
        )
    }

    fn remote_evaluate(
        &self,
        user: &User,
        name: &str,
        kind: SpecKind,
    ) -> Result<RemoteEvaluation> {
        let retries = RetryPolicy::REMOTE_EVALUATE_RETRIES;
        match kind {
            SpecKind::Gate => self.post(
                CHECK_GATE_ENDPOINT,
                &CheckGateRequest {
                    gate_name: name,
                    user,
                    metadata: &self.metadata,
                },
                retries,
            ),
            SpecKind::Config => self.post(
                GET_CONFIG_ENDPOINT,
                &GetConfigRequest {
                    config_name: name,
                    user,
                    metadata: &self.metadata,
                },
                retries,
            ),
        }
    }

    fn send_events(&self, events: &[Event]) -> Result<()> {
        // The acknowledgement carries nothing we act on.
        self.post_with_retries(
            LOG_EVENT_ENDPOINT,
            &LogEventRequest {
                events,
                metadata: &self.metadata,
            },
            RetryPolicy::SEND_EVENTS_RETRIES,
        )?;
        Ok(())
    }
}

/// Add up to 10% of random jitter to `backoff`.
fn with_jitter(backoff: Duration) -> Duration {
    backoff + thread_rng().gen_range(Duration::ZERO..=backoff / 10)
}
