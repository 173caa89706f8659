//! Input Listing
//!
//! Builds the task list from a folder:
//!
//! - Regular files whose extension matches (case-insensitive)
//! - Optional regex filter on the file name
//!
//! Ordering: files are sorted by name so the submission order, and with it
//! every `sequence_index`, is the same on every run.

use dataload_core::LoadTask;
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why no task list could be built
#[derive(Debug, Error)]
pub enum InputError {
    /// Folder is missing or not a directory
    #[error("Folder does not exist or is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Folder contains no matching file
    #[error("No .{extension} files found in {}", .folder.display())]
    NoInputs {
        /// Folder that was searched
        folder: PathBuf,
        /// Extension that was looked for
        extension: String,
    },

    /// Folder could not be listed
    #[error("Failed to list {}: {source}", .folder.display())]
    Io {
        /// Folder that was searched
        folder: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// List matching files in `folder` as load tasks
pub fn collect_inputs(
    folder: &Path,
    extension: &str,
    filter: Option<&Regex>,
) -> Result<Vec<LoadTask>, InputError> {
    if !folder.is_dir() {
        return Err(InputError::NotADirectory(folder.to_path_buf()));
    }
    let extension = extension.trim_start_matches('.');
    let io_err = |source| InputError::Io {
        folder: folder.to_path_buf(),
        source,
    };

    let mut selected: Vec<(String, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(folder).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let matches_extension = path
            .extension()
            .map(|e| e.to_string_lossy().eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if !matches_extension {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(re) = filter {
            if !re.is_match(&name) {
                continue;
            }
        }
        selected.push((name, path));
    }

    if selected.is_empty() {
        return Err(InputError::NoInputs {
            folder: folder.to_path_buf(),
            extension: extension.to_string(),
        });
    }

    // Sort by name for deterministic order
    selected.sort_by(|a, b| a.0.cmp(&b.0));
    tracing::debug!(files = selected.len(), folder = %folder.display(), "inputs collected");

    Ok(LoadTask::from_paths(selected.into_iter().map(|(_, path)| path)))
}
