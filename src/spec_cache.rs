//! Keeps the local [`Snapshot`] in sync with the control plane.
use std::{
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use crate::{
    network::Network,
    poller_thread::{PollerThread, PollerThreadConfig},
    snapshot::Snapshot,
    spec_store::SpecStore,
    Error, Result,
};

#[derive(Debug, Clone)]
pub(crate) struct SpecCacheConfig {
    pub sync_interval: Duration,
    pub sync_jitter: Duration,
}

/// State shared between the cache and its background sync thread.
struct SpecSyncer {
    network: Arc<dyn Network>,
    store: SpecStore,
    /// Server time of the last successful sync, sent as `sinceTime`. Zero before the first one.
    last_sync_time: AtomicI64,
    /// Local epoch milliseconds of the last successful fetch, or of construction.
    last_confirmed_at: AtomicI64,
}

impl SpecSyncer {
    /// Fetch specs changed since the last sync and install them if there are any.
    ///
    /// Called once from [`SpecCache::initialize`] and then only from the sync thread, so syncs
    /// never overlap.
    fn sync(&self) -> Result<()> {
        let since_time = self.last_sync_time.load(Ordering::SeqCst);
        log::debug!(target: "featuregate", since_time; "fetching specs");
        let response = self.network.fetch_specs(since_time)?;

        self.last_confirmed_at
            .store(chrono::Utc::now().timestamp_millis(), Ordering::SeqCst);
        if response.time > 0 {
            self.last_sync_time.store(response.time, Ordering::SeqCst);
        }

        if !response.has_updates {
            log::debug!(target: "featuregate", since_time; "specs are up to date");
            return Ok(());
        }

        let snapshot = Snapshot::from_response(response);
        log::info!(target: "featuregate",
                   gates = snapshot.gates.len(),
                   configs = snapshot.configs.len(),
                   sync_time = snapshot.sync_time;
                   "installing new specs");
        self.store.set_snapshot(snapshot);

        Ok(())
    }

    /// Sync, keeping the current snapshot on failure.
    fn sync_logging_errors(&self) {
        match self.sync() {
            Ok(()) => {}
            Err(Error::Unauthorized) => {
                log::error!(target: "featuregate", "failed to sync specs: client is not authorized. Check your secret key");
            }
            Err(err) => {
                log::warn!(target: "featuregate", "failed to sync specs, keeping the current ones: {err}");
            }
        }
    }
}

/// Local copy of the control plane specs, refreshed in the background.
pub(crate) struct SpecCache {
    syncer: Arc<SpecSyncer>,
    /// `None` once stopped.
    poller: Mutex<Option<PollerThread>>,
}

impl SpecCache {
    /// Perform the initial download and start periodic sync.
    ///
    /// A failed initial download is not an error: the cache starts with an empty snapshot, so
    /// every lookup goes to the server until a sync succeeds.
    ///
    /// # Errors
    ///
    /// Only if the sync thread could not be started.
    pub fn initialize(network: Arc<dyn Network>, config: SpecCacheConfig) -> Result<SpecCache> {
        let syncer = Arc::new(SpecSyncer {
            network,
            store: SpecStore::new(),
            last_sync_time: AtomicI64::new(0),
            last_confirmed_at: AtomicI64::new(chrono::Utc::now().timestamp_millis()),
        });

        if let Err(err) = syncer.sync() {
            log::warn!(target: "featuregate", "initial spec download failed, all lookups will be evaluated remotely until the next sync: {err}");
        }

        let poller = {
            let syncer = Arc::clone(&syncer);
            PollerThread::start(
                PollerThreadConfig {
                    name: "featuregate-spec-sync".to_owned(),
                    interval: config.sync_interval,
                    jitter: config.sync_jitter,
                },
                move || syncer.sync_logging_errors(),
            )?
        };

        Ok(SpecCache {
            syncer,
            poller: Mutex::new(Some(poller)),
        })
    }

    /// The snapshot installed right now.
    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        self.syncer.store.get_snapshot()
    }

    /// Time since the specs were last confirmed fresh by the server.
    pub fn snapshot_age(&self) -> Duration {
        let confirmed_at = self.syncer.last_confirmed_at.load(Ordering::SeqCst);
        let age = chrono::Utc::now().timestamp_millis() - confirmed_at;
        Duration::from_millis(age.max(0) as u64)
    }

    /// Stop the periodic sync and wait for an in-flight sync to finish. Idempotent.
    pub fn stop(&self) {
        let poller = self
            .poller
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(poller) = poller {
            if let Err(err) = poller.shutdown() {
                log::error!(target: "featuregate", "failed to stop spec sync thread: {err}");
            }
        }
    }
}
