//! Configuration file watcher for config store reload.
//!
//! Only the dynamic [`ConfigStore`] is refreshed. The typed bootstrap
//! config, the route table and the controller registry stay as they were at
//! startup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::store::ConfigStore;

/// A watcher that re-loads a config file into the store when it changes.
pub struct ConfigWatcher {
    path: PathBuf,
    store: Arc<ConfigStore>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    pub fn new(path: &Path, store: Arc<ConfigStore>) -> Self {
        Self {
            path: path.to_path_buf(),
            store,
        }
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for events to be delivered.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let store = self.store.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!(path = ?path, "Config file change detected, reloading...");
                        if let Err(e) = store.load(path.as_path()) {
                            tracing::error!(
                                "Failed to reload config: {}. Keeping current configuration.",
                                e
                            );
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}
