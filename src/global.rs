//! A process-wide [`Client`] for applications that prefer not to pass one around.
//!
//! The client itself never depends on this module. Libraries should take a `&Client` instead.
use std::sync::{Arc, RwLock};

use crate::{Client, ClientConfig, Network, Result};

static INSTANCE: RwLock<Option<Arc<Client>>> = RwLock::new(None);

/// Initialize the global client.
///
/// If called more than once, the previous client is shut down and replaced.
///
/// # Errors
///
/// Same as [`Client::new`].
pub fn init(config: ClientConfig) -> Result<Arc<Client>> {
    install(Client::new(config)?)
}

/// Initialize the global client with a custom [`Network`].
pub fn init_with_network(config: ClientConfig, network: Arc<dyn Network>) -> Result<Arc<Client>> {
    install(Client::with_network(config, network)?)
}

/// The global client, if [`init`] was called.
pub fn instance() -> Option<Arc<Client>> {
    INSTANCE
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Shut down and remove the global client. Does nothing if there is none.
pub fn shutdown() {
    let existing = INSTANCE
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take();
    if let Some(existing) = existing {
        existing.shutdown();
    }
}

fn install(client: Client) -> Result<Arc<Client>> {
    let client = Arc::new(client);

    // Minimizing the scope of holding the write lock.
    let existing = {
        let mut instance = INSTANCE
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *instance, Some(Arc::clone(&client)))
    };
    if let Some(existing) = existing {
        log::debug!(target: "featuregate", "replacing global client");
        existing.shutdown();
    }

    Ok(client)
}
