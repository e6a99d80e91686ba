//! Data models for the Wallpaper Extractor.
//!
//! - [`WorkshopRecord`]: one item's subscription state as parsed from the workshop log
//! - [`TrackedItem`]: a record plus its [`CopyStatus`], as held by the
//!   [`ItemRegistry`](crate::state::ItemRegistry)
//! - [`CopyJobConfig`] / [`CopyMode`] / [`CopyOutcome`]: parameters and result of a batch copy
//! - [`Settings`]: the persisted user settings loaded by
//!   [`ConfigManager`](crate::config::ConfigManager)

pub mod config;
pub mod copy_job;
pub mod workshop;

pub use config::Settings;
pub use copy_job::{CopyJobConfig, CopyMode, CopyOutcome};
pub use workshop::{CopyStatus, TrackedItem, WorkshopRecord};
