//! Services module - the workshop tracking and extraction logic.
//!
//! The services have no dependency on any presentation layer; they communicate through
//! callbacks, the [`ItemRegistry`](crate::state::ItemRegistry), and return values.
//!
//! # Components
//!
//! - [`LogParser`] / [`analyze_log`]: turns the lines of `workshop_log.txt` into the
//!   de-duplicated subscription state, honouring an inclusive start-time filter
//! - [`LogWatcher`]: polls the log's modification time once per second and reports a new
//!   snapshot only when the parsed records actually change
//! - [`CopyPipeline`]: runs one batch copy job at a time over the tracked items, recording
//!   a status per item and never letting one failure abort the batch
//! - [`fs_ops`]: the video-file / full-directory copy and recursive delete primitives used
//!   by the default [`ItemCopier`]
//! - [`desktop`]: opens workshop folders and pages with the platform's default handler
//!
//! # Flow
//!
//! ```text
//! LogWatcher --(snapshot)--> ItemRegistry::reconcile --> presentation layer
//!                                   ^
//!                                   | set_item_status
//! CopyPipeline ---------------------+
//! ```

pub mod copy;
pub mod desktop;
pub mod fs_ops;
pub mod log_parser;
pub mod watcher;

pub use copy::{CopyError, CopyJobHandle, CopyPipeline, FsCopier, ItemCopier};
pub use log_parser::{LogParser, analyze_log, read_log_lines};
pub use watcher::{ChangeCallback, LogWatcher, POLL_INTERVAL, WatcherError};
