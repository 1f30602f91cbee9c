use std::sync::Arc;

use clap::Parser;
use env_logger::Env;
use log::{debug, error, info, warn};
use tokio::runtime::Builder;

mod config;
mod engine;
mod env;
mod networking;
mod notify;
mod state;
mod storage;
mod store;
mod updater;
mod util;

use crate::config::{ConfigStore, LauncherConfig};
use crate::engine::UpdateEngine;
use crate::notify::{Notifier, Severity};
use crate::state::{SessionState, StateStore};
use crate::storage::StorageManager;

#[derive(Parser, Debug)]
#[command(
    name = "Lodestar Launcher",
    author,
    version,
    about = "Modpack launcher core: session state, settings, and self-updates"
)]
struct Cli {
    /// Print launcher version and exit.
    #[arg(long)]
    version_only: bool,

    /// Apply a detected launcher update without prompting.
    #[arg(long)]
    apply_update: bool,

    /// Skip the startup update check for this run only.
    #[arg(long)]
    no_update_check: bool,
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if cli.version_only {
        println!("Lodestar Launcher {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let runtime = match Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("unable to start async runtime: {err}");
            std::process::exit(1);
        }
    };
    runtime.block_on(run(cli));
}

async fn run(cli: Cli) {
    let storage = StorageManager::new();

    let initial = match storage.read_config().await {
        Some(config) => config,
        None => {
            info!("no stored settings found, starting with defaults");
            let defaults = LauncherConfig::default();
            if let Err(err) = storage.write_config(&defaults).await {
                warn!("unable to persist default settings: {err}");
            }
            defaults
        }
    };

    let (config, mut persist_rx) = ConfigStore::new(initial);
    let config = Arc::new(config);
    {
        let storage = storage.clone();
        tokio::spawn(async move {
            while let Some(snapshot) = persist_rx.recv().await {
                if let Err(err) = storage.write_config(&snapshot).await {
                    warn!("unable to persist settings: {err}");
                }
            }
        });
    }

    let state = Arc::new(StateStore::new(SessionState::default()));
    state.subscribe(|snapshot: &SessionState| {
        debug!(
            "session: updating={} progress={:.0}% label={:?}",
            snapshot.is_updating, snapshot.update_progress, snapshot.update_state_label
        );
    });

    let (notifier, mut notifications) = Notifier::new();
    tokio::spawn(async move {
        // Headless toast surface: notifications land in the log.
        while let Some(toast) = notifications.recv().await {
            match toast.severity {
                Severity::Error => error!("{}: {}", toast.title, toast.message),
                Severity::Warning => warn!("{}: {}", toast.title, toast.message),
                _ => info!("{}: {}", toast.title, toast.message),
            }
        }
    });

    let engine = UpdateEngine::new(
        Arc::clone(&config),
        Arc::clone(&state),
        notifier,
        storage,
    );

    if cli.no_update_check {
        info!("startup update check skipped");
        engine.mark_ready();
    } else {
        engine.bootstrap(env!("CARGO_PKG_VERSION")).await;
    }

    let snapshot = state.get();
    if snapshot.update_popup.is_shown {
        info!(
            "launcher update {} available (published {})",
            snapshot.update_popup.version,
            published_ago(&snapshot.update_popup.published_at)
        );
        if cli.apply_update {
            engine.apply_update().await;
        } else {
            info!("run again with --apply-update to install it");
        }
    }

    // Let the toast drain task flush anything still queued.
    tokio::task::yield_now().await;
}

/// Render a release timestamp as a short "ago" label for the log.
fn published_ago(published_at: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(published_at)
        .map(|published| util::time_since_now(published.timestamp() as f64))
        .unwrap_or_else(|_| "recently".to_owned())
}
