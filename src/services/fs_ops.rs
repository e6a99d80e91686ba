//! Filesystem operations behind the copy pipeline.
//!
//! All three functions work on a single workshop item directory:
//! - [`copy_video_file`]: copy the first video file into the destination root
//! - [`copy_directory`]: recreate the whole item directory under the destination root
//! - [`delete_directory`]: best-effort recursive removal of the source afterwards

use crate::paths::is_video_file_name;
use crate::services::copy::CopyError;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

fn ensure_source_dir(source_dir: &Utf8Path) -> Result<(), CopyError> {
    if !source_dir.is_dir() {
        return Err(CopyError::SourceMissing(source_dir.to_path_buf()));
    }
    Ok(())
}

fn copy_file(from: &Path, to: &Path) -> Result<(), CopyError> {
    fs::copy(from, to).map_err(|source| CopyError::CopyFailed {
        from: from.display().to_string(),
        to: to.display().to_string(),
        source,
    })?;
    Ok(())
}

fn create_dir(path: &Path) -> Result<(), CopyError> {
    fs::create_dir_all(path).map_err(|source| CopyError::CreateDestination {
        path: path.display().to_string(),
        source,
    })
}

/// Copy the first video file found directly inside `source_dir` into `target_dir`.
///
/// Only regular entries of the top level are considered, in directory-listing order, so
/// with several videos present the one chosen depends on the filesystem. An existing file
/// of the same name in `target_dir` is replaced.
///
/// # Returns
/// Path of the copied file
///
/// # Errors
/// - [`CopyError::SourceMissing`] if `source_dir` is not a directory
/// - [`CopyError::NoVideoFile`] if no file carries a video extension
pub fn copy_video_file(
    source_dir: &Utf8Path,
    target_dir: &Utf8Path,
) -> Result<Utf8PathBuf, CopyError> {
    ensure_source_dir(source_dir)?;
    create_dir(target_dir.as_std_path())?;

    for entry in fs::read_dir(source_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !is_video_file_name(&file_name) {
            continue;
        }

        let target = target_dir.join(&file_name);
        copy_file(&path, target.as_std_path())?;

        tracing::debug!("Copied video {} to {}", path.display(), target);
        return Ok(target);
    }

    Err(CopyError::NoVideoFile(source_dir.to_path_buf()))
}

/// Copy `source_dir` recursively into `target_dir/<source dir name>`.
///
/// The relative layout is preserved and existing files are overwritten.
///
/// # Returns
/// The directory the content was copied into
pub fn copy_directory(
    source_dir: &Utf8Path,
    target_dir: &Utf8Path,
) -> Result<Utf8PathBuf, CopyError> {
    ensure_source_dir(source_dir)?;

    let dir_name = source_dir
        .file_name()
        .ok_or_else(|| CopyError::SourceMissing(source_dir.to_path_buf()))?;
    let target_root = target_dir.join(dir_name);
    create_dir(target_root.as_std_path())?;

    for entry in WalkDir::new(source_dir).min_depth(1) {
        let entry = entry.map_err(|source| CopyError::Traverse {
            path: source_dir.to_string(),
            source,
        })?;

        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|_| CopyError::SourceMissing(source_dir.to_path_buf()))?;
        let destination = target_root.as_std_path().join(relative);

        if entry.file_type().is_dir() {
            create_dir(&destination)?;
        } else {
            if let Some(parent) = destination.parent() {
                create_dir(parent)?;
            }
            copy_file(entry.path(), &destination)?;
        }
    }

    tracing::debug!("Copied directory {} to {}", source_dir, target_root);
    Ok(target_root)
}

/// Recursively delete a directory, children before parents.
///
/// Individual failures are logged and skipped so as much as possible is removed.
///
/// # Returns
/// `true` if `dir` existed and was a directory when deletion began, regardless of
/// whether every entry could be removed
pub fn delete_directory(dir: &Utf8Path) -> bool {
    if !dir.is_dir() {
        return false;
    }

    for entry in WalkDir::new(dir).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Failed to traverse {} during deletion: {}", dir, e);
                continue;
            }
        };

        let result = if entry.file_type().is_dir() {
            fs::remove_dir(entry.path())
        } else {
            fs::remove_file(entry.path())
        };

        if let Err(e) = result {
            tracing::warn!("Failed to delete {}: {}", entry.path().display(), e);
        }
    }

    true
}
