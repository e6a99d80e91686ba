use crate::models::CopyMode;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// User settings persisted in `Settings.yaml`.
///
/// These are the only values the application keeps between runs: where Steam lives,
/// where extracted content goes, and which copy mode was last used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Steam installation root (the directory containing `logs/` and `steamapps/`)
    #[serde(default)]
    pub steam_path: Option<String>,

    /// Destination directory for copied content
    #[serde(default)]
    pub copy_path: Option<String>,

    /// `true` copies single video files, `false` copies whole item directories
    #[serde(default = "default_copy_mode")]
    pub copy_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            steam_path: None,
            copy_path: None,
            copy_mode: default_copy_mode(),
        }
    }
}

fn default_copy_mode() -> bool {
    true
}

impl Settings {
    /// Configured Steam path, if set and not blank
    pub fn steam_path(&self) -> Option<&str> {
        non_blank(self.steam_path.as_deref())
    }

    /// Configured copy destination, if set and not blank
    pub fn copy_path(&self) -> Option<&str> {
        non_blank(self.copy_path.as_deref())
    }

    pub fn mode(&self) -> CopyMode {
        CopyMode::from_video_flag(self.copy_mode)
    }

    /// Store a Steam path; blank input leaves the current value alone
    pub fn set_steam_path(&mut self, path: &str) -> bool {
        store_trimmed(&mut self.steam_path, path)
    }

    /// Store a copy destination; blank input leaves the current value alone
    pub fn set_copy_path(&mut self, path: &str) -> bool {
        store_trimmed(&mut self.copy_path, path)
    }

    pub fn set_mode(&mut self, mode: CopyMode) {
        self.copy_mode = mode.is_video();
    }

    /// The copy destination, falling back to `~/Desktop/WallpaperExtractor`
    pub fn copy_path_or_default(&self) -> Option<Utf8PathBuf> {
        if let Some(path) = self.copy_path() {
            return Some(Utf8PathBuf::from(path));
        }

        home_dir().map(|home| default_copy_path(&home))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn store_trimmed(slot: &mut Option<String>, value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }
    *slot = Some(value.to_string());
    true
}

fn home_dir() -> Option<Utf8PathBuf> {
    dirs::home_dir().and_then(|home| Utf8PathBuf::try_from(home).ok())
}

fn default_copy_path(home: &Utf8Path) -> Utf8PathBuf {
    home.join("Desktop").join("WallpaperExtractor")
}
