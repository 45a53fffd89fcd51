//! Periodic staleness scanner.
//!
//! Walks a directory tree on a fixed interval and records the latest file
//! modification time. The local adapters compare a compiled JSON file
//! against this value to decide whether its DSL source must be re-parsed.
//!
//! The comparison is window based: a write landing between two scans can be
//! classified either way until the next scan.

use crate::storage::filesystem::{
    WORKSPACE_DSL_FILENAME, WORKSPACE_JSON_FILENAME, system_time_millis,
};
use archway_core::config::CONFIG_FILENAME;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Default scan period.
pub const SCAN_INTERVAL: Duration = Duration::from_secs(1);

/// A cancellable background task tracking the newest modification time
/// under a directory.
#[derive(Debug)]
pub struct StalenessScanner {
    root: PathBuf,
    last_modified: Arc<AtomicI64>,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl StalenessScanner {
    /// Scans `root` once synchronously, then every [`SCAN_INTERVAL`].
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(root: impl Into<PathBuf>) -> Self {
        Self::start_with_interval(root, SCAN_INTERVAL)
    }

    pub fn start_with_interval(root: impl Into<PathBuf>, period: Duration) -> Self {
        let root = root.into();
        let last_modified = Arc::new(AtomicI64::new(find_latest_last_modified(&root)));
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run(
            root.clone(),
            period,
            Arc::clone(&last_modified),
            cancel.clone(),
        ));

        Self {
            root,
            last_modified,
            cancel,
            handle: Mutex::new(Some(handle)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Latest modification time seen by the most recent scan (epoch millis).
    pub fn last_modified(&self) -> i64 {
        self.last_modified.load(Ordering::Acquire)
    }

    /// Runs a scan now instead of waiting for the next tick.
    pub async fn refresh(&self) -> i64 {
        scan(&self.root, &self.last_modified).await;
        self.last_modified()
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .map(|handle| handle.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Cancels the periodic task and waits for it to finish.
    pub async fn stop(&self) {
        self.cancel.cancel();

        let handle = match self.handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Staleness scanner for {} ended abnormally: {}", self.root.display(), e);
            }
        }
    }
}

impl Drop for StalenessScanner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(root: PathBuf, period: Duration, last_modified: Arc<AtomicI64>, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    debug!("Staleness scanner started for {}", root.display());
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => scan(&root, &last_modified).await,
        }
    }
    debug!("Staleness scanner stopped for {}", root.display());
}

async fn scan(root: &Path, last_modified: &AtomicI64) {
    let root = root.to_path_buf();
    match tokio::task::spawn_blocking(move || find_latest_last_modified(&root)).await {
        Ok(latest) => last_modified.store(latest, Ordering::Release),
        Err(e) => warn!("Staleness scan failed: {}", e),
    }
}

/// Newest file modification time under `root`, in epoch millis (`0` if none).
///
/// Skips hidden entries, the configuration file, and `workspace.json` when a
/// sibling `workspace.dsl` exists (the JSON is a build artifact there).
pub fn find_latest_last_modified(root: &Path) -> i64 {
    let mut latest = 0;

    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let missing = e
                    .io_error()
                    .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound);
                if !missing {
                    warn!("Could not scan {}: {}", root.display(), e);
                }
                continue;
            }
        };

        if !entry.file_type().is_file() || is_ignored(&entry) {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if let Ok(modified) = metadata.modified() {
            latest = latest.max(system_time_millis(modified));
        }
    }

    latest
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn is_ignored(entry: &DirEntry) -> bool {
    match entry.file_name().to_str() {
        Some(CONFIG_FILENAME) => true,
        Some(WORKSPACE_JSON_FILENAME) => entry
            .path()
            .parent()
            .is_some_and(|dir| dir.join(WORKSPACE_DSL_FILENAME).is_file()),
        _ => false,
    }
}
