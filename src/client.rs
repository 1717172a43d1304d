use std::{sync::Arc, time::Duration};

use crate::{
    dynamic_config::DynamicConfig,
    eval::{self, Decision, Evaluation},
    exposure_logger::{Event, ExposureLogger, ExposureLoggerConfig},
    network::{HttpNetwork, Network},
    remote::{self, RemoteDecision},
    snapshot::SpecKind,
    spec_cache::{SpecCache, SpecCacheConfig},
    ClientConfig, Environment, Error, Result, User,
};

/// A client for evaluating feature gates and dynamic configs.
///
/// Lookups are evaluated against a locally cached snapshot of the specs, which is kept fresh by a
/// background thread. Lookups the snapshot cannot decide are sent to the server. Every decision is
/// recorded as an exposure and delivered in batches by another background thread.
///
/// `Client` is `Send + Sync` and is meant to be shared (e.g., in an `Arc`) by all request handlers.
///
/// # Examples
/// ```no_run
/// # use featuregate::{ClientConfig, User};
/// let client = ClientConfig::from_secret_key("secret-key").to_client()?;
///
/// let user = User::new("user-42").with_email("jane@example.com");
/// if client.check_gate(&user, "new_checkout")? {
///     // ...
/// }
///
/// client.shutdown();
/// # Ok::<(), featuregate::Error>(())
/// ```
pub struct Client {
    environment: Environment,
    network: Arc<dyn Network>,
    spec_cache: SpecCache,
    exposure_logger: ExposureLogger,
}

impl Client {
    /// Create a new `Client` talking to the server over HTTP.
    ///
    /// Blocks for the initial spec download. If the download fails, the client still starts: every
    /// lookup is evaluated remotely until a background sync succeeds.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSecretKey`] if the key is not a server secret key.
    /// - [`Error::InvalidBaseUrl`] if the API base URL does not parse.
    /// - [`Error::Network`] if the HTTP client could not be initialized.
    /// - [`Error::Io`] if a background thread could not be started.
    pub fn new(config: ClientConfig) -> Result<Client> {
        let network = Arc::new(HttpNetwork::new(&config)?);
        Client::with_network(config, network)
    }

    /// Create a new `Client` using a custom [`Network`] implementation.
    pub fn with_network(config: ClientConfig, network: Arc<dyn Network>) -> Result<Client> {
        config.validate()?;

        let spec_cache = SpecCache::initialize(
            Arc::clone(&network),
            SpecCacheConfig {
                sync_interval: config.sync_interval,
                sync_jitter: config.sync_jitter,
            },
        )?;
        let exposure_logger = match ExposureLogger::start(
            Arc::clone(&network),
            ExposureLoggerConfig {
                flush_interval: config.flush_interval,
                max_buffered_events: config.max_buffered_events,
            },
        ) {
            Ok(logger) => logger,
            Err(err) => {
                spec_cache.stop();
                return Err(err);
            }
        };

        Ok(Client {
            environment: config.environment,
            network,
            spec_cache,
            exposure_logger,
        })
    }

    /// Check whether `user` passes the gate `gate_name`.
    ///
    /// Unknown gates and server failures evaluate to `false`.
    ///
    /// # Errors
    ///
    /// [`Error::MissingUserId`] if `user.user_id` is empty.
    pub fn check_gate(&self, user: &User, gate_name: &str) -> Result<bool> {
        Ok(self.evaluate(user, gate_name, SpecKind::Gate)?.passed())
    }

    /// Get the value of the dynamic config `config_name` for `user`.
    ///
    /// # Errors
    ///
    /// [`Error::MissingUserId`] if `user.user_id` is empty.
    pub fn get_config(&self, user: &User, config_name: &str) -> Result<DynamicConfig> {
        let decision = self.evaluate(user, config_name, SpecKind::Config)?;
        Ok(DynamicConfig::from_decision(config_name, decision))
    }

    /// Get the value of the experiment `experiment_name` for `user`.
    ///
    /// Experiments are dynamic configs, see [`Client::get_config`].
    pub fn get_experiment(&self, user: &User, experiment_name: &str) -> Result<DynamicConfig> {
        self.get_config(user, experiment_name)
    }

    /// Evaluate a gate or config and return the full decision.
    ///
    /// The lookup is evaluated against the current snapshot. If the snapshot cannot decide it, the
    /// server is asked on the current thread. The decision is recorded as an exposure.
    ///
    /// # Errors
    ///
    /// [`Error::MissingUserId`] if `user.user_id` is empty.
    pub fn evaluate(&self, user: &User, name: &str, kind: SpecKind) -> Result<Decision> {
        if user.user_id.is_empty() {
            log::warn!(target: "featuregate", name, kind:serde; "evaluating without a user id");
            return Err(Error::MissingUserId);
        }

        let user = user.normalized(&self.environment);

        // The snapshot is released before a remote call.
        let local = {
            let snapshot = self.spec_cache.current_snapshot();
            eval::evaluate(&snapshot, &user, name, kind)
        };

        let RemoteDecision { decision, degraded } = match local {
            Evaluation::Decided(decision) => RemoteDecision {
                decision,
                degraded: false,
            },
            Evaluation::NeedsRemote(_) => {
                remote::evaluate_remotely(self.network.as_ref(), &user, name, kind)
            }
        };

        self.exposure_logger
            .log(Event::exposure(&user, name, &decision, degraded));

        Ok(decision)
    }

    /// Record a custom event. Events with an empty name are ignored.
    ///
    /// ```no_run
    /// # use featuregate::{ClientConfig, Event, User};
    /// # let client = ClientConfig::from_secret_key("secret-key").to_client()?;
    /// client.log_event(Event::new("purchase", User::new("user-42")).with_value(19.99));
    /// # Ok::<(), featuregate::Error>(())
    /// ```
    pub fn log_event(&self, mut event: Event) {
        if event.event_name.is_empty() {
            log::debug!(target: "featuregate", "ignoring event without a name");
            return;
        }
        event.user = event.user.normalized(&self.environment);
        self.exposure_logger.log(event);
    }

    /// Time since the server last confirmed the cached specs, or since the client was created if
    /// it never did.
    pub fn current_snapshot_age(&self) -> Duration {
        self.spec_cache.snapshot_age()
    }

    /// Deliver buffered events now, on the current thread.
    pub fn flush(&self) {
        self.exposure_logger.flush();
    }

    /// Stop background work and deliver buffered events.
    ///
    /// Blocks until in-flight background requests complete. Lookups after shutdown keep working
    /// against the last snapshot, but their exposures are only delivered by an explicit
    /// [`Client::flush`]. Idempotent.
    pub fn shutdown(&self) {
        log::debug!(target: "featuregate", "shutting down");
        self.spec_cache.stop();
        self.exposure_logger.shutdown();
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.shutdown();
    }
}
