// Steam directory layout used by the watcher and the copy pipeline

use camino::{Utf8Path, Utf8PathBuf};

/// Steam AppID of Wallpaper Engine
pub const WALLPAPER_ENGINE_APP_ID: &str = "431960";

/// Directory under the Steam root holding the workshop log
pub const LOG_DIRECTORY: &str = "logs";

/// File name of the workshop log
pub const LOG_FILENAME: &str = "workshop_log.txt";

/// Extensions recognised by the video copy mode (compared case-insensitively)
pub const VIDEO_EXTENSIONS: [&str; 6] = [".mp4", ".avi", ".mov", ".wmv", ".flv", ".mkv"];

/// Workshop web page for an item
pub const WORKSHOP_PAGE_URL: &str = "https://steamcommunity.com/sharedfiles/filedetails/?id=";

/// `{steam}/logs/workshop_log.txt`
pub fn workshop_log_path(steam_root: &Utf8Path) -> Utf8PathBuf {
    steam_root.join(LOG_DIRECTORY).join(LOG_FILENAME)
}

/// `{steam}/steamapps/workshop/content/431960`
pub fn workshop_content_root(steam_root: &Utf8Path) -> Utf8PathBuf {
    steam_root
        .join("steamapps")
        .join("workshop")
        .join("content")
        .join(WALLPAPER_ENGINE_APP_ID)
}

/// `{steam}/steamapps/workshop/content/431960/{id}`
pub fn workshop_item_dir(steam_root: &Utf8Path, id: &str) -> Utf8PathBuf {
    workshop_content_root(steam_root).join(id)
}

pub fn workshop_page_url(id: &str) -> String {
    format!("{}{}", WORKSHOP_PAGE_URL, id)
}

/// Whether a file name carries one of the [`VIDEO_EXTENSIONS`]
pub fn is_video_file_name(name: &str) -> bool {
    let name = name.to_lowercase();
    VIDEO_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}
