//! Buffering and delivery of exposure and custom events.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    eval::{Decision, DecisionValue},
    network::Network,
    poller_thread::{PollerThread, PollerThreadConfig},
    Result, User,
};

/// Event name of gate exposures.
pub const GATE_EXPOSURE_EVENT: &str = "featuregate::gate_exposure";
/// Event name of config exposures.
pub const CONFIG_EXPOSURE_EVENT: &str = "featuregate::config_exposure";

/// An event delivered to the control plane for analysis.
///
/// Exposures are created by the client for every decision. Custom events can be logged with
/// [`Client::log_event`](crate::Client::log_event).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Name of the event.
    pub event_name: String,
    /// User the event belongs to. Private attributes are removed before buffering.
    pub user: User,
    /// Optional value, e.g. a purchase amount or a search term.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Additional string metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Epoch milliseconds when the event was created.
    pub time: i64,
}

impl Event {
    /// Create a custom event.
    ///
    /// ```
    /// # use featuregate::{Event, User};
    /// let event = Event::new("add_to_cart", User::new("user-42"))
    ///     .with_value(19.99)
    ///     .with_metadata("sku", "sku-123");
    /// ```
    pub fn new(event_name: impl Into<String>, user: User) -> Event {
        Event {
            event_name: event_name.into(),
            user,
            value: None,
            metadata: HashMap::new(),
            time: chrono::Utc::now().timestamp_millis(),
        }
    }

    #[allow(missing_docs)]
    pub fn with_value(mut self, value: impl Into<serde_json::Value>) -> Event {
        self.value = Some(value.into());
        self
    }

    #[allow(missing_docs)]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Event {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Exposure of a gate or config decision.
    ///
    /// `degraded` marks a decision that is a safe default standing in for a remote evaluation
    /// that failed, so operators can see evaluation gaps.
    pub(crate) fn exposure(user: &User, name: &str, decision: &Decision, degraded: bool) -> Event {
        let event = match &decision.value {
            DecisionValue::Gate(passed) => Event::new(GATE_EXPOSURE_EVENT, user.clone())
                .with_metadata("gate", name)
                .with_metadata("gateValue", passed.to_string()),
            DecisionValue::Config(_) => {
                Event::new(CONFIG_EXPOSURE_EVENT, user.clone()).with_metadata("config", name)
            }
        };
        let event = event
            .with_metadata("ruleID", decision.rule_id.as_str())
            .with_metadata("source", decision.source.as_str());
        if degraded {
            event.with_metadata("degraded", "true")
        } else {
            event
        }
    }
}

/// Configuration for [`ExposureLogger`].
#[derive(Debug, Clone)]
pub(crate) struct ExposureLoggerConfig {
    pub flush_interval: Duration,
    /// Buffer size that triggers an early flush.
    pub max_buffered_events: usize,
}

/// Pending events. Producers append under the lock, the flusher detaches the whole buffer under
/// the lock and sends it in batches after releasing it.
struct EventBuffer {
    events: Mutex<Vec<Event>>,
    network: Arc<dyn Network>,
    max_buffered_events: usize,
}

impl EventBuffer {
    /// Append `event`, returning `true` if the buffer reached its flush threshold.
    fn push(&self, event: Event) -> bool {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.push(event);
        events.len() >= self.max_buffered_events
    }

    fn take(&self) -> Vec<Event> {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *events)
    }

    /// Detach the current buffer and deliver it in requests of at most `max_buffered_events`.
    /// Never holds the lock across the network call.
    ///
    /// The first failed request drops everything not yet delivered.
    fn flush(&self) {
        let pending = self.take();
        if pending.is_empty() {
            return;
        }

        log::debug!(target: "featuregate", count = pending.len(); "flushing events");
        for (index, batch) in pending.chunks(self.max_buffered_events).enumerate() {
            if let Err(err) = self.network.send_events(batch) {
                let undelivered = pending.len() - index * self.max_buffered_events;
                log::warn!(target: "featuregate",
                           count = undelivered;
                           "failed to deliver events, dropping them: {err}");
                return;
            }
        }
    }
}

/// Records exposures and custom events and delivers them in batches from a background thread.
pub(crate) struct ExposureLogger {
    buffer: Arc<EventBuffer>,
    /// `None` once shut down.
    flusher: Mutex<Option<PollerThread>>,
}

impl ExposureLogger {
    /// Start the logger and its background flush thread.
    pub fn start(network: Arc<dyn Network>, config: ExposureLoggerConfig) -> Result<ExposureLogger> {
        let buffer = Arc::new(EventBuffer {
            events: Mutex::new(Vec::new()),
            network,
            max_buffered_events: config.max_buffered_events.max(1),
        });

        let flusher = {
            let buffer = Arc::clone(&buffer);
            PollerThread::start(
                PollerThreadConfig {
                    name: "featuregate-flush".to_owned(),
                    interval: config.flush_interval,
                    jitter: Duration::ZERO,
                },
                move || buffer.flush(),
            )?
        };

        Ok(ExposureLogger {
            buffer,
            flusher: Mutex::new(Some(flusher)),
        })
    }

    /// Buffer `event`. Never performs network I/O on the caller's thread.
    pub fn log(&self, mut event: Event) {
        event.user = event.user.without_private_attributes();
        log::trace!(target: "featuregate", event:serde; "buffering event");

        if self.buffer.push(event) {
            let flusher = self.flusher.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(flusher) = flusher.as_ref() {
                flusher.wake();
            }
        }
    }

    /// Deliver buffered events on the current thread.
    pub fn flush(&self) {
        self.buffer.flush();
    }

    /// Stop the background flush and deliver whatever is still buffered. Idempotent.
    pub fn shutdown(&self) {
        let flusher = self
            .flusher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(flusher) = flusher {
            if let Err(err) = flusher.shutdown() {
                log::error!(target: "featuregate", "failed to stop flush thread: {err}");
            }
        }
        self.buffer.flush();
    }
}
