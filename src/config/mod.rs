use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::store::{Patch, Store};

/// Persisted launcher settings. One instance per installation; loaded from
/// disk at startup, written back after every accepted change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct LauncherConfig {
    pub initialized: bool,
    pub launcher_kind: String,
    pub install_path: String,
    pub is_custom_path: bool,
    pub check_for_app_updates: bool,
    pub max_concurrent_downloads: usize,
    pub use_bleeding_edge_updates: bool,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        LauncherConfig {
            initialized: false,
            launcher_kind: String::new(),
            install_path: String::new(),
            is_custom_path: false,
            check_for_app_updates: true,
            max_concurrent_downloads: 4,
            use_bleeding_edge_updates: false,
        }
    }
}

impl LauncherConfig {
    /// Reject combinations the rest of the launcher cannot act on.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_downloads == 0 {
            return Err("maxConcurrentDownloads must be at least 1".to_owned());
        }
        if self.is_custom_path && self.install_path.trim().is_empty() {
            return Err("a custom install path is selected but empty".to_owned());
        }
        Ok(())
    }
}

/// Partial [`LauncherConfig`]. Unknown fields in a patch coming over the
/// settings UI bridge are a deserialization error, not a silent merge.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct ConfigPatch {
    pub initialized: Option<bool>,
    pub launcher_kind: Option<String>,
    pub install_path: Option<String>,
    pub is_custom_path: Option<bool>,
    pub check_for_app_updates: Option<bool>,
    pub max_concurrent_downloads: Option<usize>,
    pub use_bleeding_edge_updates: Option<bool>,
}

impl Patch<LauncherConfig> for ConfigPatch {
    fn apply_to(self, config: &mut LauncherConfig) {
        if let Some(value) = self.initialized {
            config.initialized = value;
        }
        if let Some(value) = self.launcher_kind {
            config.launcher_kind = value;
        }
        if let Some(value) = self.install_path {
            config.install_path = value;
        }
        if let Some(value) = self.is_custom_path {
            config.is_custom_path = value;
        }
        if let Some(value) = self.check_for_app_updates {
            config.check_for_app_updates = value;
        }
        if let Some(value) = self.max_concurrent_downloads {
            config.max_concurrent_downloads = value;
        }
        if let Some(value) = self.use_bleeding_edge_updates {
            config.use_bleeding_edge_updates = value;
        }
    }
}

/// Store for persisted settings: validates the merged result, publishes it
/// to subscribers, then queues the snapshot for the persistence task.
pub struct ConfigStore {
    inner: Store<LauncherConfig>,
    persist: mpsc::UnboundedSender<LauncherConfig>,
}

impl ConfigStore {
    /// Returns the store and the receiving end of the persistence queue;
    /// whoever owns durable storage drains it.
    pub fn new(initial: LauncherConfig) -> (Self, mpsc::UnboundedReceiver<LauncherConfig>) {
        let (persist, persist_rx) = mpsc::unbounded_channel();
        (
            ConfigStore {
                inner: Store::new(initial),
                persist,
            },
            persist_rx,
        )
    }

    pub fn get(&self) -> LauncherConfig {
        self.inner.get()
    }

    /// Merge `patch` into the current settings.
    ///
    /// # Errors
    /// Returns an error string if the merged settings fail validation; the
    /// store keeps its previous value and nothing is published.
    pub fn set(&self, patch: ConfigPatch) -> Result<(), String> {
        let mut merged = self.inner.get();
        patch.apply_to(&mut merged);
        merged.validate()?;

        let snapshot = self.inner.set_value(merged);
        debug!("settings updated: {snapshot:?}");
        self.persist.send(snapshot).ok();
        Ok(())
    }

    pub fn subscribe(&self, observer: impl Fn(&LauncherConfig) + Send + Sync + 'static) -> u64 {
        self.inner.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: u64) {
        self.inner.unsubscribe(id);
    }
}
