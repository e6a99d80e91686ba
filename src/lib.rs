// Wallpaper Extractor - Wallpaper Engine workshop tracker and extractor
//
// This is the library crate containing the log parsing, item tracking and copy logic.
// The binary crate (main.rs) provides the command-line entry point.

pub mod app;
pub mod config;
pub mod logging;
pub mod models;
pub mod paths;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use app::AppController;
pub use config::ConfigManager;
pub use models::{CopyMode, CopyOutcome, CopyStatus, Settings, TrackedItem, WorkshopRecord};
pub use state::{ItemRegistry, RegistryChange};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
