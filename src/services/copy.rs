use crate::models::{CopyJobConfig, CopyMode, CopyOutcome, CopyStatus};
use crate::paths;
use crate::services::fs_ops;
use crate::state::ItemRegistry;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

/// Errors that can occur while preparing or running a copy job
#[derive(Error, Debug)]
pub enum CopyError {
    #[error("Please configure the Steam path first")]
    SteamPathNotConfigured,

    #[error("No workshop items to copy")]
    NoWorkshopItems,

    #[error("Please enter a copy destination")]
    CopyPathEmpty,

    #[error("Failed to create directory {path}: {source}")]
    CreateDestination {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("A copy job is already running")]
    JobAlreadyRunning,

    #[error("Source directory does not exist: {0}")]
    SourceMissing(Utf8PathBuf),

    #[error("No video file found in {0}")]
    NoVideoFile(Utf8PathBuf),

    #[error("Failed to copy {from} to {to}: {source}")]
    CopyFailed {
        from: String,
        to: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to traverse {path}: {source}")]
    Traverse {
        path: String,
        #[source]
        source: walkdir::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Filesystem side of the copy pipeline
///
/// The pipeline only decides *which* items to copy and records their outcome; the actual
/// I/O goes through this trait so it can be swapped out (tests count calls on a mock).
#[cfg_attr(test, mockall::automock)]
pub trait ItemCopier: Send + Sync {
    /// Copy one item's content directory into `destination` according to `mode`
    fn copy_item(
        &self,
        source_dir: &Utf8Path,
        destination: &Utf8Path,
        mode: CopyMode,
    ) -> Result<(), CopyError>;

    /// Remove the source directory after a successful copy; best-effort
    fn remove_source(&self, source_dir: &Utf8Path) -> bool;
}

/// [`ItemCopier`] backed by [`fs_ops`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FsCopier;

impl ItemCopier for FsCopier {
    fn copy_item(
        &self,
        source_dir: &Utf8Path,
        destination: &Utf8Path,
        mode: CopyMode,
    ) -> Result<(), CopyError> {
        match mode {
            CopyMode::VideoFile => fs_ops::copy_video_file(source_dir, destination)?,
            CopyMode::FullDirectory => fs_ops::copy_directory(source_dir, destination)?,
        };
        Ok(())
    }

    fn remove_source(&self, source_dir: &Utf8Path) -> bool {
        fs_ops::delete_directory(source_dir)
    }
}

/// Handle to a running copy job
#[derive(Debug)]
pub struct CopyJobHandle {
    task: JoinHandle<CopyOutcome>,
}

impl CopyJobHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the job to finish and return its outcome
    pub async fn wait(self) -> Result<CopyOutcome, JoinError> {
        self.task.await
    }
}

/// Clears the pipeline's running flag even if the job panics
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Batch copy of tracked workshop items
///
/// A job walks the items the [`ItemRegistry`] holds when the job starts, strictly one
/// at a time, and for each item not already copied:
/// 1. marks it [`CopyStatus::Copying`]
/// 2. copies `{steam}/steamapps/workshop/content/431960/{id}` per the [`CopyMode`]
/// 3. on success removes the source directory and marks it [`CopyStatus::Success`]
/// 4. on failure marks it [`CopyStatus::Failed`] with the error message and moves on
///
/// At most one job runs per pipeline. Cancellation is checked between items, so the item
/// being copied always finishes first. There is no per-item timeout: a hung filesystem
/// call stalls the job.
pub struct CopyPipeline {
    registry: ItemRegistry,
    copier: Arc<dyn ItemCopier>,
    runtime: tokio::runtime::Handle,
    running: Arc<AtomicBool>,

    /// Cancellation sender of the current job
    cancel_tx: Mutex<Option<watch::Sender<bool>>>,
}

impl CopyPipeline {
    /// Create a pipeline that copies with the real filesystem
    pub fn new(registry: ItemRegistry, runtime: tokio::runtime::Handle) -> Self {
        Self::with_copier(registry, Arc::new(FsCopier), runtime)
    }

    pub fn with_copier(
        registry: ItemRegistry,
        copier: Arc<dyn ItemCopier>,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        Self {
            registry,
            copier,
            runtime,
            running: Arc::new(AtomicBool::new(false)),
            cancel_tx: Mutex::new(None),
        }
    }

    /// Check the preconditions of a job and prepare its destination.
    ///
    /// # Errors
    /// - [`CopyError::SteamPathNotConfigured`] if no Steam path is set
    /// - [`CopyError::NoWorkshopItems`] if the registry is empty
    /// - [`CopyError::CopyPathEmpty`] if the destination is blank
    /// - [`CopyError::CreateDestination`] if the destination tree cannot be created
    pub fn validate_job(
        &self,
        steam_root: Option<&str>,
        destination: &str,
        mode: CopyMode,
    ) -> Result<CopyJobConfig, CopyError> {
        let steam_root = steam_root
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(CopyError::SteamPathNotConfigured)?;

        if self.registry.total_count() == 0 {
            return Err(CopyError::NoWorkshopItems);
        }

        let destination = destination.trim();
        if destination.is_empty() {
            return Err(CopyError::CopyPathEmpty);
        }

        let destination_root = Utf8PathBuf::from(destination);
        fs::create_dir_all(&destination_root).map_err(|source| CopyError::CreateDestination {
            path: destination_root.to_string(),
            source,
        })?;

        Ok(CopyJobConfig {
            mode,
            destination_root,
            steam_root: Utf8PathBuf::from(steam_root),
        })
    }

    /// Start a job in the background and return immediately.
    ///
    /// Once the job is accepted, every item that is not yet [`CopyStatus::Success`] is
    /// reset to [`CopyStatus::NotCopied`] so earlier failures are retried. A rejected
    /// call leaves the registry untouched.
    ///
    /// `on_complete` runs exactly once on the worker when the job ends, including after a
    /// cancellation. The pipeline already reports idle by then.
    ///
    /// # Errors
    /// [`CopyError::JobAlreadyRunning`] if another job has not finished yet
    pub fn start_job<F>(&self, config: CopyJobConfig, on_complete: F) -> Result<CopyJobHandle, CopyError>
    where
        F: FnOnce(CopyOutcome) + Send + 'static,
    {
        // Held until the new sender is in place so cancel_job never reaches a stale one
        let mut cancel_slot = self.cancel_tx.lock().unwrap_or_else(PoisonError::into_inner);

        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CopyError::JobAlreadyRunning);
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        *cancel_slot = Some(cancel_tx);
        drop(cancel_slot);

        // Failed or interrupted items are retried, successes are skipped
        self.registry.reset_non_success_statuses();

        // Items added after this point belong to the next job
        let items: Vec<String> = self
            .registry
            .items()
            .into_iter()
            .map(|item| item.record.id)
            .collect();

        let registry = self.registry.clone();
        let copier = Arc::clone(&self.copier);
        let guard = RunningGuard(Arc::clone(&self.running));

        tracing::info!(
            "Starting copy job: {} items, mode={}, destination={}",
            items.len(),
            config.mode,
            config.destination_root
        );

        let task = self.runtime.spawn_blocking(move || {
            let outcome = run_job(&registry, copier.as_ref(), &config, &items, &cancel_rx);
            drop(guard);

            tracing::info!("{}", outcome.summary());
            on_complete(outcome);
            outcome
        });

        Ok(CopyJobHandle { task })
    }

    /// Request cancellation of the running job
    ///
    /// # Returns
    /// `true` if a job was running and has been asked to stop
    pub fn cancel_job(&self) -> bool {
        let cancel_tx = self.cancel_tx.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.is_running() {
            return false;
        }

        match cancel_tx.as_ref() {
            Some(tx) => {
                tracing::info!("Copy job cancellation requested");
                let _ = tx.send(true);
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn registry(&self) -> &ItemRegistry {
        &self.registry
    }
}

fn run_job(
    registry: &ItemRegistry,
    copier: &dyn ItemCopier,
    config: &CopyJobConfig,
    ids: &[String],
    cancel_rx: &watch::Receiver<bool>,
) -> CopyOutcome {
    let mut outcome = CopyOutcome::default();

    for id in ids {
        if *cancel_rx.borrow() {
            tracing::warn!("Copy job cancelled before item {}", id);
            outcome.cancelled = true;
            break;
        }

        match registry.item(id) {
            None => {
                tracing::debug!("Item {} no longer tracked, skipping", id);
                continue;
            }
            Some(item) if item.is_copied() => {
                tracing::debug!("Item {} already copied, skipping", id);
                continue;
            }
            Some(_) => {}
        }

        registry.set_item_status(id, CopyStatus::Copying, None);

        let source_dir = paths::workshop_item_dir(&config.steam_root, id);
        match copier.copy_item(&source_dir, &config.destination_root, config.mode) {
            Ok(()) => {
                if !copier.remove_source(&source_dir) {
                    tracing::warn!("Source directory {} could not be removed", source_dir);
                }
                outcome.succeeded += 1;
                registry.set_item_status(id, CopyStatus::Success, None);
                tracing::info!("Copied item {}", id);
            }
            Err(e) => {
                outcome.failed += 1;
                tracing::error!("Copy of item {} failed: {}", id, e);
                registry.set_item_status(id, CopyStatus::Failed, Some(e.to_string()));
            }
        }
    }

    // A cancellation that arrived during the last item still counts
    if !outcome.cancelled && *cancel_rx.borrow() {
        tracing::warn!("Copy job cancelled after its last item");
        outcome.cancelled = true;
    }

    outcome
}
