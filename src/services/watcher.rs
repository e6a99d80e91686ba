use crate::models::WorkshopRecord;
use crate::paths;
use crate::services::log_parser::{analyze_log, read_log_lines};
use camino::Utf8PathBuf;
use std::fs;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Interval between two detection cycles
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Callback invoked with the new snapshot whenever the parsed log content changes.
///
/// `None` means the log could not be read at all. The callback runs while the watcher's
/// lock is held and must not call back into the watcher.
pub type ChangeCallback = Arc<dyn Fn(Option<Vec<WorkshopRecord>>) + Send + Sync>;

/// Errors returned by the watcher's public operations
#[derive(Error, Debug, PartialEq, Eq)]
pub enum WatcherError {
    #[error("Steam path must not be empty")]
    EmptySteamPath,
}

/// Mutable state shared between the public operations and the polling task
#[derive(Default)]
struct WatcherState {
    steam_path: Option<Utf8PathBuf>,
    start_time: Option<String>,
    last_modified: Option<SystemTime>,
    cached: Option<Vec<WorkshopRecord>>,
    running: bool,

    /// Bumped on every start so a cycle from a previous run never acts after a restart
    generation: u64,

    cancel_tx: Option<watch::Sender<bool>>,
}

impl WatcherState {
    fn invalidate(&mut self) {
        self.last_modified = None;
        self.cached = None;
    }
}

struct Inner {
    state: Mutex<WatcherState>,
    on_change: ChangeCallback,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, WatcherState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// One detection cycle, run entirely under the state lock
    fn detect(&self, generation: Option<u64>) {
        let mut state = self.lock();

        if !state.running || generation.is_some_and(|g| g != state.generation) {
            return;
        }
        let Some(steam_path) = state.steam_path.clone() else {
            return;
        };

        let log_path = paths::workshop_log_path(&steam_path);

        let modified = match fs::metadata(&log_path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                tracing::warn!("Cannot read modification time of {}: {}", log_path, e);
                return;
            }
        };

        if state.last_modified == Some(modified) {
            return;
        }
        state.last_modified = Some(modified);

        let snapshot = read_log_lines(&log_path)
            .map(|lines| analyze_log(&lines, state.start_time.as_deref()));

        if snapshot == state.cached {
            tracing::trace!("Workshop log touched but parsed content unchanged");
            return;
        }

        tracing::debug!(
            "Workshop log changed: {} records",
            snapshot.as_ref().map_or(0, Vec::len)
        );
        state.cached = snapshot.clone();

        // Still under the lock: a filter update cannot interleave with this notification
        (self.on_change)(snapshot);
    }
}

/// Polling watcher for the Steam workshop log.
///
/// While running, a tokio task checks the modification time of
/// `{steam}/logs/workshop_log.txt` every [`POLL_INTERVAL`]. When it changes the file is
/// re-read and re-parsed with the current start-time filter, and the change callback is
/// invoked only if the parsed records differ from the last ones reported.
///
/// Starting, stopping, updating the filter and each detection cycle all take the same
/// lock, so no cycle ever parses with a half-applied filter change.
pub struct LogWatcher {
    inner: Arc<Inner>,
    runtime: tokio::runtime::Handle,
}

impl LogWatcher {
    /// Create a stopped watcher.
    ///
    /// # Arguments
    /// * `on_change` - Receives every changed snapshot, on the polling task
    /// * `start_time` - Initial filter in `yyyy-MM-dd HH:mm:ss`; empty disables it
    /// * `runtime` - Runtime the polling task is spawned on
    pub fn new(
        on_change: ChangeCallback,
        start_time: impl Into<String>,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        let state = WatcherState {
            start_time: non_empty(start_time.into()),
            ..WatcherState::default()
        };

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                on_change,
            }),
            runtime,
        }
    }

    /// Start polling the log under `steam_path`, restarting if already running.
    ///
    /// # Errors
    /// [`WatcherError::EmptySteamPath`] if the path is blank; the watcher is left untouched.
    pub fn start_watching(&self, steam_path: &str) -> Result<(), WatcherError> {
        let steam_path = steam_path.trim();
        if steam_path.is_empty() {
            return Err(WatcherError::EmptySteamPath);
        }

        let mut state = self.inner.lock();
        Self::stop_locked(&mut state);

        let (cancel_tx, cancel_rx) = watch::channel(false);
        state.steam_path = Some(Utf8PathBuf::from(steam_path));
        state.running = true;
        state.generation += 1;
        state.cancel_tx = Some(cancel_tx);

        let generation = state.generation;
        let inner = Arc::clone(&self.inner);
        self.runtime.spawn(Self::poll_loop(inner, generation, cancel_rx));

        tracing::info!("Watching workshop log under {}", steam_path);
        Ok(())
    }

    /// Stop polling and forget the cached snapshot. No-op when already stopped.
    pub fn stop_watching(&self) {
        let mut state = self.inner.lock();
        if state.running {
            Self::stop_locked(&mut state);
            tracing::info!("Stopped watching workshop log");
        }
    }

    fn stop_locked(state: &mut WatcherState) {
        if !state.running {
            return;
        }

        state.running = false;
        if let Some(cancel_tx) = state.cancel_tx.take() {
            let _ = cancel_tx.send(true);
        }
        state.invalidate();
    }

    /// Replace the start-time filter and force a full re-check on the next cycle.
    ///
    /// The file may not have changed, but the records that pass the filter can have, so
    /// the modification-time marker and cached snapshot are both dropped.
    pub fn update_start_time(&self, start_time: impl Into<String>) {
        let mut state = self.inner.lock();
        state.start_time = non_empty(start_time.into());
        state.invalidate();

        tracing::info!("Start time filter set to {:?}", state.start_time);
    }

    /// Run one detection cycle right now, outside the timer.
    ///
    /// Does nothing while stopped.
    pub fn poll_once(&self) {
        self.inner.detect(None);
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().running
    }

    pub fn start_time(&self) -> Option<String> {
        self.inner.lock().start_time.clone()
    }

    /// Path of the watched log, if a Steam path has been set
    pub fn log_path(&self) -> Option<Utf8PathBuf> {
        self.inner
            .lock()
            .steam_path
            .as_deref()
            .map(paths::workshop_log_path)
    }

    async fn poll_loop(inner: Arc<Inner>, generation: u64, mut cancel_rx: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(POLL_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = cancel_rx.changed() => break,
            }

            let cycle_inner = Arc::clone(&inner);
            let result =
                tokio::task::spawn_blocking(move || cycle_inner.detect(Some(generation))).await;

            if let Err(e) = result {
                tracing::error!("Workshop log detection cycle failed: {}", e);
            }

            if *cancel_rx.borrow() {
                break;
            }
        }

        tracing::debug!("Workshop log polling task {} exited", generation);
    }
}

impl Drop for LogWatcher {
    fn drop(&mut self) {
        let mut state = self.inner.lock();
        Self::stop_locked(&mut state);
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
