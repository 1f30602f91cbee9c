use std::sync::{Arc, Mutex};

use log::{debug, error, info, warn};

use crate::config::ConfigStore;
use crate::networking::{DownloadJob, NetworkClient};
use crate::notify::{Notification, Notifier};
use crate::state::{StatePatch, StateStore, UpdatePopup};
use crate::storage::StorageManager;
use crate::updater::{self, UpdateRelease};

const DOWNLOADING_LABEL: &str = "downloading update";
const INSTALLING_LABEL: &str = "installing update";

/// Handle tying progress and terminal events to one update cycle. Events
/// reported against an older cycle are dropped.
#[derive(Clone, Debug)]
pub struct AcceptedUpdate {
    cycle: u64,
    pub version: String,
    pub download_url: String,
    pub checksum_url: Option<String>,
}

struct UpdateCycle {
    id: u64,
    terminal: bool,
    pending: Option<UpdateRelease>,
}

/// Drives the update lifecycle: offers detected releases, applies accepted
/// ones, and reflects every step into the session state store.
///
/// All transitions land in the state store as single published updates, so
/// observers never see the popup and an active download at the same time.
pub struct UpdateEngine {
    config: Arc<ConfigStore>,
    state: Arc<StateStore>,
    notifier: Notifier,
    storage: StorageManager,
    cycle: Mutex<UpdateCycle>,
}

impl UpdateEngine {
    pub fn new(
        config: Arc<ConfigStore>,
        state: Arc<StateStore>,
        notifier: Notifier,
        storage: StorageManager,
    ) -> Self {
        Self {
            config,
            state,
            notifier,
            storage,
            cycle: Mutex::new(UpdateCycle {
                id: 0,
                terminal: true,
                pending: None,
            }),
        }
    }

    /// Startup sequence: the settings-gated update check, then the session
    /// becomes interactive whether or not the check succeeded.
    pub async fn bootstrap(&self, current_version: &str) {
        self.run_update_check(current_version).await;
        self.mark_ready();
    }

    /// Clear the bootstrap flag; the UI is free to render.
    pub fn mark_ready(&self) {
        self.state.set(StatePatch {
            is_loading: Some(false),
            ..Default::default()
        });
    }

    /// Ask the update checker for a newer release and offer it if found.
    /// Suppressed entirely when update checks are disabled in settings.
    pub async fn run_update_check(&self, current_version: &str) {
        let config = self.config.get();
        if !config.check_for_app_updates {
            debug!("update check disabled in settings");
            return;
        }

        let result =
            updater::check_for_updates(current_version, config.use_bleeding_edge_updates).await;
        self.handle_check_result(result);
    }

    /// Fold a check outcome into session state. A failed check surfaces as
    /// a single toast and leaves the session idle.
    pub fn handle_check_result(&self, result: Result<Option<UpdateRelease>, String>) {
        match result {
            Ok(Some(release)) => self.offer_update(release),
            Ok(None) => debug!("no launcher update available"),
            Err(err) => {
                warn!("update check failed: {err}");
                self.notifier
                    .send(Notification::error("update check failed", &err));
            }
        }
    }

    /// Surface a detected release in the update popup. A no-op while a
    /// previous cycle is still on screen or downloading.
    pub fn offer_update(&self, release: UpdateRelease) {
        let current = self.state.get();
        if current.is_updating || current.update_popup.is_shown {
            debug!(
                "ignoring detected release {}: an update cycle is already active",
                release.version
            );
            return;
        }

        let popup = UpdatePopup {
            is_shown: true,
            version: release.version.clone(),
            release_notes: release.release_notes.clone(),
            published_at: release.published_at.clone(),
            download_url: release.download_url.clone(),
        };
        {
            let mut cycle = self.cycle.lock().unwrap();
            cycle.id += 1;
            cycle.terminal = false;
            cycle.pending = Some(release);
        }

        info!("offering launcher update {}", popup.version);
        self.state.set(StatePatch {
            update_popup: Some(popup),
            ..Default::default()
        });
    }

    /// Close the popup without updating. The offered release is forgotten;
    /// a later check may offer it again.
    pub fn dismiss_update(&self) {
        if !self.state.get().update_popup.is_shown {
            return;
        }
        {
            let mut cycle = self.cycle.lock().unwrap();
            cycle.terminal = true;
            cycle.pending = None;
        }

        info!("launcher update dismissed");
        self.state.set(StatePatch {
            update_popup: Some(UpdatePopup::cleared()),
            ..Default::default()
        });
    }

    /// Accept the offered update. The popup closes and the downloading
    /// state begins in the same published change.
    pub fn accept_update(&self) -> Option<AcceptedUpdate> {
        if !self.state.get().update_popup.is_shown {
            warn!("accept_update called with no update on offer");
            return None;
        }

        let accepted = {
            let mut cycle = self.cycle.lock().unwrap();
            let release = cycle.pending.take()?;
            AcceptedUpdate {
                cycle: cycle.id,
                version: release.version,
                download_url: release.download_url,
                checksum_url: release.checksum_url,
            }
        };

        info!("launcher update {} accepted", accepted.version);
        self.state.set(StatePatch {
            is_updating: Some(true),
            update_progress: Some(0.0),
            update_state_label: Some(DOWNLOADING_LABEL.to_owned()),
            update_popup: Some(UpdatePopup::cleared()),
            ..Default::default()
        });
        Some(accepted)
    }

    /// Write a download progress tick through to the session state. Ticks
    /// from a finished or superseded cycle are dropped.
    pub fn report_progress(&self, update: &AcceptedUpdate, percent: f32) {
        {
            let cycle = self.cycle.lock().unwrap();
            if update.cycle != cycle.id || cycle.terminal {
                debug!("dropping stale progress tick ({percent:.0}%)");
                return;
            }
        }

        let label = if percent >= 100.0 {
            INSTALLING_LABEL
        } else {
            DOWNLOADING_LABEL
        };
        self.state.set(StatePatch {
            update_progress: Some(percent.clamp(0.0, 100.0)),
            update_state_label: Some(label.to_owned()),
            ..Default::default()
        });
    }

    /// Record the terminal outcome of a cycle: exactly one toast, the label
    /// set to the outcome, and the session back to idle.
    pub fn finish_update(&self, update: &AcceptedUpdate, result: Result<(), String>) {
        {
            let mut cycle = self.cycle.lock().unwrap();
            if update.cycle != cycle.id || cycle.terminal {
                debug!("dropping duplicate terminal event for {}", update.version);
                return;
            }
            cycle.terminal = true;
        }

        match result {
            Ok(()) => {
                info!("launcher update {} installed", update.version);
                self.state.set(StatePatch {
                    is_updating: Some(false),
                    update_progress: Some(100.0),
                    update_state_label: Some(format!(
                        "updated to {}! restart to apply",
                        update.version
                    )),
                    ..Default::default()
                });
                self.notifier.send(Notification::success(
                    "launcher updated",
                    &format!("version {} is ready, restart to apply it", update.version),
                ));
            }
            Err(err) => {
                error!("launcher update {} failed: {err}", update.version);
                self.state.set(StatePatch {
                    is_updating: Some(false),
                    update_state_label: Some(format!("update failed: {err}")),
                    ..Default::default()
                });
                self.notifier
                    .send(Notification::error("update failed", &err));
            }
        }
    }

    /// Full acceptance path: close the popup, download the artifact with
    /// the configured concurrency limit, verify it when the release ships
    /// a checksum, and record the terminal outcome.
    pub async fn apply_update(&self) {
        let Some(accepted) = self.accept_update() else {
            return;
        };
        let result = self.download_artifact(&accepted).await;
        self.finish_update(&accepted, result);
    }

    async fn download_artifact(&self, accepted: &AcceptedUpdate) -> Result<(), String> {
        let network = NetworkClient::new(self.config.get().max_concurrent_downloads);
        let dest = self.storage.update_artifact_path(&accepted.version);
        let jobs = vec![DownloadJob {
            url: accepted.download_url.clone(),
            dest: dest.clone(),
        }];

        network
            .download_all(jobs, |percent| self.report_progress(accepted, percent))
            .await?;

        if let Some(checksum_url) = &accepted.checksum_url {
            network.verify_checksum(&dest, checksum_url).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use tokio::sync::mpsc::UnboundedReceiver;

    use crate::config::{ConfigPatch, LauncherConfig};
    use crate::notify::Severity;
    use crate::state::{IDLE_LABEL, SessionState};

    fn release(version: &str) -> UpdateRelease {
        UpdateRelease {
            version: version.to_owned(),
            release_notes: "bug fixes".to_owned(),
            published_at: "2026-08-01T12:00:00Z".to_owned(),
            download_url: "https://example.invalid/update.bin".to_owned(),
            checksum_url: None,
        }
    }

    fn engine() -> (UpdateEngine, UnboundedReceiver<Notification>) {
        let (config, _persist_rx) = ConfigStore::new(LauncherConfig::default());
        let (notifier, notifications) = Notifier::new();
        let engine = UpdateEngine::new(
            Arc::new(config),
            Arc::new(StateStore::new(SessionState::default())),
            notifier,
            StorageManager::with_base_dir(PathBuf::from("/tmp/lodestar-engine-test")),
        );
        (engine, notifications)
    }

    #[test]
    fn detected_release_populates_the_popup() {
        let (engine, mut notifications) = engine();
        engine.handle_check_result(Ok(Some(release("2.0.0"))));

        let state = engine.state.get();
        assert!(state.update_popup.is_shown);
        assert_eq!(state.update_popup.version, "2.0.0");
        assert_eq!(state.update_popup.release_notes, "bug fixes");
        assert!(!state.is_updating);
        assert_eq!(state.update_state_label, IDLE_LABEL);
        assert!(notifications.try_recv().is_err());
    }

    #[test]
    fn failed_check_toasts_once_and_stays_idle() {
        let (engine, mut notifications) = engine();
        engine.handle_check_result(Err("connection refused".to_owned()));

        let state = engine.state.get();
        assert!(!state.update_popup.is_shown);
        assert!(!state.is_updating);

        let toast = notifications.try_recv().expect("one error toast");
        assert_eq!(toast.severity, Severity::Error);
        assert!(toast.message.contains("connection refused"));
        assert!(notifications.try_recv().is_err());
    }

    #[test]
    fn dismiss_clears_the_popup_without_a_toast() {
        let (engine, mut notifications) = engine();
        engine.offer_update(release("2.0.0"));
        engine.dismiss_update();

        let state = engine.state.get();
        assert_eq!(state.update_popup, UpdatePopup::cleared());
        assert_eq!(state.update_state_label, IDLE_LABEL);
        assert!(!state.is_updating);
        assert!(notifications.try_recv().is_err());

        // Back to idle: the same release may be offered again.
        engine.offer_update(release("2.0.0"));
        assert!(engine.state.get().update_popup.is_shown);
    }

    #[test]
    fn accepting_swaps_popup_for_download_in_one_published_change() {
        let (engine, _notifications) = engine();
        let snapshots = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&snapshots);
        engine.state.subscribe(move |state: &SessionState| {
            seen.lock().unwrap().push(state.clone());
        });

        engine.offer_update(release("2.0.0"));
        engine.accept_update().expect("an update was on offer");

        let snapshots = snapshots.lock().unwrap();
        for state in snapshots.iter() {
            assert!(
                !(state.is_updating && state.update_popup.is_shown),
                "popup and download visible at once"
            );
        }
        let first_downloading = snapshots
            .iter()
            .position(|state| state.is_updating)
            .expect("downloading state published");
        assert!(!snapshots[first_downloading].update_popup.is_shown);
        assert_eq!(
            snapshots[first_downloading].update_state_label,
            DOWNLOADING_LABEL
        );
        // The update immediately before still showed the popup: no hidden
        // intermediate state in between.
        assert!(snapshots[first_downloading - 1].update_popup.is_shown);
    }

    #[test]
    fn detection_is_a_noop_while_a_cycle_is_active() {
        let (engine, _notifications) = engine();
        engine.offer_update(release("2.0.0"));
        engine.offer_update(release("2.1.0"));
        assert_eq!(engine.state.get().update_popup.version, "2.0.0");

        let accepted = engine.accept_update().expect("accept 2.0.0");
        engine.handle_check_result(Ok(Some(release("2.1.0"))));

        let state = engine.state.get();
        assert!(state.is_updating);
        assert!(!state.update_popup.is_shown);

        engine.finish_update(&accepted, Ok(()));
    }

    #[test]
    fn progress_ticks_write_through_in_order() {
        let (engine, _notifications) = engine();
        engine.offer_update(release("2.0.0"));
        let accepted = engine.accept_update().expect("accepted");

        for percent in [10.0, 50.0] {
            engine.report_progress(&accepted, percent);
            let state = engine.state.get();
            assert_eq!(state.update_progress, percent);
            assert_eq!(state.update_state_label, DOWNLOADING_LABEL);
        }

        engine.report_progress(&accepted, 100.0);
        assert_eq!(engine.state.get().update_state_label, INSTALLING_LABEL);
    }

    #[test]
    fn full_cycle_ends_idle_with_one_success_toast() {
        let (engine, mut notifications) = engine();
        engine.handle_check_result(Ok(Some(release("2.0.0"))));
        let accepted = engine.accept_update().expect("accepted");

        for percent in [10.0, 50.0, 100.0] {
            engine.report_progress(&accepted, percent);
        }
        engine.finish_update(&accepted, Ok(()));

        let state = engine.state.get();
        assert!(!state.is_updating);
        assert!(!state.update_popup.is_shown);
        assert_eq!(state.update_progress, 100.0);
        assert!(state.update_state_label.contains("restart to apply"));

        let toast = notifications.try_recv().expect("one success toast");
        assert_eq!(toast.severity, Severity::Success);
        assert!(toast.message.contains("2.0.0"));
        assert!(notifications.try_recv().is_err());
    }

    #[test]
    fn failure_carries_the_error_detail_verbatim() {
        let (engine, mut notifications) = engine();
        engine.offer_update(release("2.0.0"));
        let accepted = engine.accept_update().expect("accepted");

        engine.finish_update(&accepted, Err("disk full".to_owned()));

        let state = engine.state.get();
        assert!(!state.is_updating);
        assert_eq!(state.update_state_label, "update failed: disk full");

        let toast = notifications.try_recv().expect("one error toast");
        assert_eq!(toast.severity, Severity::Error);
        assert_eq!(toast.message, "disk full");
        assert!(notifications.try_recv().is_err());
    }

    #[test]
    fn stale_events_after_the_terminal_outcome_are_dropped() {
        let (engine, mut notifications) = engine();
        engine.offer_update(release("2.0.0"));
        let accepted = engine.accept_update().expect("accepted");
        engine.report_progress(&accepted, 50.0);
        engine.finish_update(&accepted, Ok(()));

        let settled = engine.state.get();
        let _ = notifications.try_recv();

        // A late tick and a duplicate terminal event change nothing.
        engine.report_progress(&accepted, 75.0);
        engine.finish_update(&accepted, Err("late failure".to_owned()));

        let state = engine.state.get();
        assert_eq!(state.update_progress, settled.update_progress);
        assert_eq!(state.update_state_label, settled.update_state_label);
        assert!(notifications.try_recv().is_err());
    }

    #[test]
    fn accept_without_an_offer_does_nothing() {
        let (engine, _notifications) = engine();
        assert!(engine.accept_update().is_none());
        assert!(!engine.state.get().is_updating);
    }

    #[tokio::test]
    async fn disabled_checks_never_reach_the_network() {
        let (engine, mut notifications) = engine();
        engine
            .config
            .set(ConfigPatch {
                check_for_app_updates: Some(false),
                ..Default::default()
            })
            .expect("valid patch");

        engine.run_update_check("0.1.0").await;

        assert!(!engine.state.get().update_popup.is_shown);
        assert!(notifications.try_recv().is_err());
    }
}
