//! Hand a folder or URL to the platform's default handler.

use anyhow::{Context, Result};
use std::process::{Command, Stdio};

/// Program used to open files, folders and URLs on this platform
fn opener() -> &'static str {
    if cfg!(target_os = "windows") {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    }
}

/// Open `target` (a path or URL) without waiting for the handler to exit
pub fn open(target: &str) -> Result<()> {
    let program = opener();
    tracing::debug!("Opening {} with {}", target, program);

    Command::new(program)
        .arg(target)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to launch {} for {}", program, target))?;

    Ok(())
}
