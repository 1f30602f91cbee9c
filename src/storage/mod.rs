use std::path::PathBuf;

use log::warn;
use tokio::fs;

use crate::config::LauncherConfig;
use crate::env;

const CONFIG_FILE: &str = "config.json";

/// Owns the on-disk layout: persisted settings and the update cache.
#[derive(Clone)]
pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    pub fn new() -> Self {
        let base_dir = env::default_app_dir();
        // Best-effort directory creation; failures are surfaced on write.
        let _ = env::ensure_base_dirs();
        Self { base_dir }
    }

    #[cfg(test)]
    pub(crate) fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Stored settings, or `None` when there is nothing usable on disk.
    pub async fn read_config(&self) -> Option<LauncherConfig> {
        let path = self.base_dir.join(CONFIG_FILE);
        let contents = fs::read_to_string(&path).await.ok()?;
        match serde_json::from_str(&contents) {
            Ok(config) => Some(config),
            Err(err) => {
                warn!("stored settings are unreadable, falling back to defaults: {err}");
                None
            }
        }
    }

    pub async fn write_config(&self, config: &LauncherConfig) -> Result<(), String> {
        let path = self.base_dir.join(CONFIG_FILE);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("unable to create settings dir: {e}"))?;
        }
        let contents = serde_json::to_string_pretty(config)
            .map_err(|e| format!("unable to serialize settings: {e}"))?;
        fs::write(&path, contents)
            .await
            .map_err(|e| format!("unable to persist settings: {e}"))
    }

    /// Where the downloaded artifact for update `version` is staged.
    pub fn update_artifact_path(&self, version: &str) -> PathBuf {
        self.base_dir
            .join("cache")
            .join(format!("launcher-update-{version}.bin"))
    }
}
