use crate::models::Settings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

/// Default directory holding the settings file
pub const DEFAULT_CONFIG_DIR: &str = "WallpaperExtractor Data";

/// Prefix of environment variables overriding settings, e.g. `WPEX_STEAM_PATH`
pub const ENV_PREFIX: &str = "WPEX";

/// Configuration manager for loading and saving the settings file.
///
/// Settings live in `Settings.yaml` inside the configuration directory. Loading layers
/// `WPEX_*` environment variables over the file; saving writes the file only.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// The directory is created if it does not exist.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join("Settings.yaml"),
            config_dir,
        })
    }

    /// Load the settings.
    ///
    /// # Returns
    /// The file's settings with environment overrides applied, or defaults if neither
    /// the file nor any override exists
    pub fn load_settings(&self) -> Result<Settings> {
        if !self.settings_path.exists() {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
        }

        let settings = Config::builder()
            .add_source(
                File::new(self.settings_path.as_str(), FileFormat::Yaml).required(false),
            )
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?
            .try_deserialize::<Settings>()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::info!(
            "Loaded settings: steam_path={:?}, copy_path={:?}, copy_mode={}",
            settings.steam_path(),
            settings.copy_path(),
            settings.mode()
        );
        Ok(settings)
    }

    /// Save the settings file.
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Load, modify and save the settings in one step
    pub fn update_settings<F>(&self, update_fn: F) -> Result<Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let mut settings = self.load_settings()?;
        update_fn(&mut settings);
        self.save_settings(&settings)?;
        Ok(settings)
    }

    /// Persist a new Steam path. Blank input is ignored and nothing is written.
    ///
    /// # Returns
    /// `true` if the path was stored
    pub fn save_steam_path(&self, path: &str) -> Result<bool> {
        self.save_path(path, Settings::set_steam_path)
    }

    /// Persist a new copy destination. Blank input is ignored and nothing is written.
    pub fn save_copy_path(&self, path: &str) -> Result<bool> {
        self.save_path(path, Settings::set_copy_path)
    }

    fn save_path(&self, path: &str, set: fn(&mut Settings, &str) -> bool) -> Result<bool> {
        let mut settings = self.load_settings()?;
        if !set(&mut settings, path) {
            tracing::debug!("Ignoring blank path");
            return Ok(false);
        }
        self.save_settings(&settings)?;
        Ok(true)
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }
}
