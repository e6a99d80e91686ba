use camino::Utf8PathBuf;
use std::fmt;
use std::str::FromStr;

/// What gets copied out of a workshop item's content directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyMode {
    /// Only the first video file found in the item directory
    #[default]
    VideoFile,
    /// The whole item directory, recreated under the destination
    FullDirectory,
}

impl CopyMode {
    /// Map the persisted `copy_mode` flag (true = video) to a mode
    pub fn from_video_flag(video: bool) -> Self {
        if video {
            CopyMode::VideoFile
        } else {
            CopyMode::FullDirectory
        }
    }

    pub fn is_video(&self) -> bool {
        matches!(self, CopyMode::VideoFile)
    }
}

impl fmt::Display for CopyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyMode::VideoFile => f.write_str("video"),
            CopyMode::FullDirectory => f.write_str("directory"),
        }
    }
}

impl FromStr for CopyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" | "video-file" => Ok(CopyMode::VideoFile),
            "directory" | "dir" | "full-directory" => Ok(CopyMode::FullDirectory),
            other => Err(format!("unknown copy mode '{}' (expected video or directory)", other)),
        }
    }
}

/// Validated parameters of one batch copy run.
///
/// Built by [`CopyPipeline::validate_job`](crate::services::CopyPipeline::validate_job),
/// which also makes sure `destination_root` exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyJobConfig {
    pub mode: CopyMode,
    pub destination_root: Utf8PathBuf,
    pub steam_root: Utf8PathBuf,
}

/// Aggregate result of a copy job, counting only items handled during that run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CopyOutcome {
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: bool,
}

impl CopyOutcome {
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Copy finished: {} succeeded, {} failed",
            self.succeeded, self.failed
        );
        if self.cancelled {
            summary.push_str(" (cancelled)");
        }
        summary
    }
}
