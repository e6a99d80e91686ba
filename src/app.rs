// Application controller
//
// Coordinates between:
// - ItemRegistry (tracked workshop items)
// - LogWatcher (feeds parsed snapshots into the registry)
// - CopyPipeline (batch extraction)
// - ConfigManager (persisted settings)
//
// The CLI in main.rs talks only to this type.

use crate::config::ConfigManager;
use crate::models::{CopyMode, CopyOutcome, Settings, TrackedItem, WorkshopRecord};
use crate::paths;
use crate::services::copy::{CopyError, CopyJobHandle, CopyPipeline, FsCopier, ItemCopier};
use crate::services::desktop;
use crate::services::log_parser::{analyze_log, read_log_lines};
use crate::services::watcher::LogWatcher;
use crate::state::{ItemRegistry, RegistryChange};
use anyhow::{Context, Result, anyhow, bail};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDateTime;
use std::sync::{Arc, PoisonError, RwLock};

/// Timestamp layout used in the workshop log and by the start-time filter
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The current local time in [`TIME_FORMAT`], the default start-time filter
pub fn default_start_time() -> String {
    chrono::Local::now().format(TIME_FORMAT).to_string()
}

/// Owner of the registry, watcher and copy pipeline
///
/// # Example
/// ```ignore
/// let runtime = tokio::runtime::Runtime::new()?;
/// let config_manager = ConfigManager::new("WallpaperExtractor Data")?;
/// let app = AppController::new(config_manager, runtime.handle().clone())?;
///
/// app.start_watching()?;
/// let handle = app.start_copy(None, CopyMode::VideoFile, |outcome| {
///     println!("{}", outcome.summary());
/// })?;
/// ```
pub struct AppController {
    registry: ItemRegistry,
    watcher: LogWatcher,
    pipeline: CopyPipeline,
    config_manager: ConfigManager,
    settings: RwLock<Settings>,
}

impl AppController {
    /// Create a controller with the settings stored by `config_manager`.
    ///
    /// The start-time filter defaults to the current local time, so only events logged
    /// from now on are tracked.
    pub fn new(config_manager: ConfigManager, runtime: tokio::runtime::Handle) -> Result<Self> {
        Self::with_start_time(config_manager, runtime, default_start_time())
    }

    /// Create a controller with an explicit start-time filter; empty disables it
    pub fn with_start_time(
        config_manager: ConfigManager,
        runtime: tokio::runtime::Handle,
        start_time: impl Into<String>,
    ) -> Result<Self> {
        Self::with_copier(config_manager, runtime, start_time, Arc::new(FsCopier))
    }

    /// Create a controller whose copy jobs go through `copier`
    pub fn with_copier(
        config_manager: ConfigManager,
        runtime: tokio::runtime::Handle,
        start_time: impl Into<String>,
        copier: Arc<dyn ItemCopier>,
    ) -> Result<Self> {
        let start_time = start_time.into();
        validate_start_time(&start_time)?;

        let settings = config_manager.load_settings()?;
        let registry = ItemRegistry::new();

        let watched = registry.clone();
        let watcher = LogWatcher::new(
            Arc::new(move |snapshot: Option<Vec<WorkshopRecord>>| {
                watched.reconcile(snapshot.as_deref());
            }),
            start_time,
            runtime.clone(),
        );

        let pipeline = CopyPipeline::with_copier(registry.clone(), copier, runtime);

        tracing::info!("Application controller initialized");

        Ok(Self {
            registry,
            watcher,
            pipeline,
            config_manager,
            settings: RwLock::new(settings),
        })
    }

    /// Current settings
    pub fn settings(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update_settings<F>(&self, update_fn: F) -> Result<()>
    where
        F: FnOnce(&mut Settings),
    {
        let mut settings = self.settings.write().unwrap_or_else(PoisonError::into_inner);
        update_fn(&mut settings);
        self.config_manager.save_settings(&settings)
    }

    /// Store and persist a new Steam path; blank input is ignored.
    ///
    /// A running watcher is restarted on the new path.
    pub fn set_steam_path(&self, path: &str) -> Result<bool> {
        if path.trim().is_empty() {
            return Ok(false);
        }
        self.update_settings(|s| {
            s.set_steam_path(path);
        })?;

        if self.watcher.is_running() {
            self.start_watching()?;
        }
        Ok(true)
    }

    fn steam_root(&self) -> Result<Utf8PathBuf> {
        self.settings()
            .steam_path()
            .map(Utf8PathBuf::from)
            .ok_or_else(|| anyhow!(CopyError::SteamPathNotConfigured))
    }

    /// Start polling the workshop log under the configured Steam path.
    ///
    /// # Returns
    /// A status line naming the watched file
    pub fn start_watching(&self) -> Result<String> {
        let steam_root = self.steam_root()?;
        self.watcher.start_watching(steam_root.as_str())?;
        Ok(format!(
            "Watching {}",
            paths::workshop_log_path(&steam_root)
        ))
    }

    pub fn stop_watching(&self) {
        self.watcher.stop_watching();
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_running()
    }

    /// Replace the start-time filter.
    ///
    /// # Errors
    /// If `start_time` is neither empty nor a `yyyy-MM-dd HH:mm:ss` timestamp; the
    /// current filter is kept.
    pub fn update_start_time(&self, start_time: &str) -> Result<()> {
        validate_start_time(start_time)?;
        self.watcher.update_start_time(start_time);
        Ok(())
    }

    pub fn start_time(&self) -> Option<String> {
        self.watcher.start_time()
    }

    /// Parse the log once and merge the result into the registry, without the watcher
    pub fn scan_once(&self) -> Result<RegistryChange> {
        let log_path = paths::workshop_log_path(&self.steam_root()?);
        let snapshot = read_log_lines(&log_path)
            .map(|lines| analyze_log(&lines, self.watcher.start_time().as_deref()));

        if snapshot.is_none() {
            tracing::warn!("Workshop log not readable: {}", log_path);
        }
        Ok(self.registry.reconcile(snapshot.as_deref()))
    }

    /// Snapshot of the tracked items, in first-seen order
    pub fn items(&self) -> Vec<TrackedItem> {
        self.registry.items()
    }

    pub fn registry(&self) -> &ItemRegistry {
        &self.registry
    }

    /// Validate and start a copy job over the tracked items, then persist the choices.
    ///
    /// `destination` falls back to the saved copy path, then to
    /// `~/Desktop/WallpaperExtractor`. While a job is running the call is rejected with
    /// [`CopyError::JobAlreadyRunning`] before anything is touched.
    pub fn start_copy<F>(
        &self,
        destination: Option<&str>,
        mode: CopyMode,
        on_complete: F,
    ) -> Result<CopyJobHandle>
    where
        F: FnOnce(CopyOutcome) + Send + 'static,
    {
        if self.pipeline.is_running() {
            return Err(CopyError::JobAlreadyRunning.into());
        }

        let settings = self.settings();
        let destination = match destination.map(str::trim).filter(|d| !d.is_empty()) {
            Some(destination) => destination.to_string(),
            None => settings
                .copy_path_or_default()
                .map(Utf8PathBuf::into_string)
                .unwrap_or_default(),
        };

        let config = self
            .pipeline
            .validate_job(settings.steam_path(), &destination, mode)?;
        let handle = self.pipeline.start_job(config, on_complete)?;

        // The job is already running, a failed save is only logged
        if let Err(e) = self.update_settings(|s| {
            s.set_copy_path(&destination);
            s.set_mode(mode);
        }) {
            tracing::warn!("Failed to save copy settings: {:#}", e);
        }

        Ok(handle)
    }

    /// Ask the running copy job to stop after its current item
    pub fn cancel_copy(&self) -> bool {
        self.pipeline.cancel_job()
    }

    pub fn is_copy_running(&self) -> bool {
        self.pipeline.is_running()
    }

    /// Content directory of a workshop item
    ///
    /// # Errors
    /// If no Steam path is configured or the directory does not exist
    pub fn workshop_folder(&self, id: &str) -> Result<Utf8PathBuf> {
        let folder = paths::workshop_item_dir(&self.steam_root()?, id);
        if !folder.is_dir() {
            bail!("Workshop folder does not exist: {}", folder);
        }
        Ok(folder)
    }

    pub fn open_workshop_folder(&self, id: &str) -> Result<Utf8PathBuf> {
        let folder = self.workshop_folder(id)?;
        desktop::open(folder.as_str())?;
        Ok(folder)
    }

    pub fn workshop_page_url(&self, id: &str) -> String {
        paths::workshop_page_url(id)
    }

    pub fn open_workshop_page(&self, id: &str) -> Result<String> {
        let url = self.workshop_page_url(id);
        desktop::open(&url)?;
        Ok(url)
    }

    pub fn config_dir(&self) -> &Utf8Path {
        self.config_manager.config_dir()
    }
}

fn validate_start_time(start_time: &str) -> Result<()> {
    let start_time = start_time.trim();
    if start_time.is_empty() {
        return Ok(());
    }
    NaiveDateTime::parse_from_str(start_time, TIME_FORMAT)
        .with_context(|| format!("Invalid start time '{}', expected yyyy-MM-dd HH:mm:ss", start_time))?;
    Ok(())
}
