use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::hash::short_hash;

/// Longest file name produced by [`safe_file_name`].
const MAX_SAFE_NAME_LEN: usize = 64;

/// Walk up from `start` looking for a file named `filename`.
/// Returns the path to the directory containing the file, or `None`.
pub fn find_ancestor_with(start: &Path, filename: &str) -> Option<PathBuf> {
    let mut current = start;
    loop {
        let candidate = current.join(filename);
        if candidate.is_file() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

/// Ensure a directory exists, creating it and any parents if needed.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Ensure the parent directory of `file` exists.
pub fn ensure_parent(file: &Path) -> std::io::Result<()> {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}

/// Turn an arbitrary identifier (typically a test name) into a portable file name.
///
/// Characters outside `[A-Za-z0-9._-]` become `_`. When anything was replaced,
/// or the name is too long, a short hash of the original identifier is appended
/// so two different identifiers never map to the same name.
pub fn safe_file_name(id: &str) -> String {
    let mut name: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let lossy = name != id || name.is_empty() || name.chars().all(|c| c == '.');
    if lossy || name.len() > MAX_SAFE_NAME_LEN {
        name.truncate(MAX_SAFE_NAME_LEN - 9);
        name.push('-');
        name.push_str(&short_hash(id.as_bytes(), 8));
    }
    name
}

/// How hard to try when a directory tree refuses to go away.
///
/// On some platforms a child process that has just exited (or a daemon it
/// left behind) may still hold handles inside the tree for a short while.
#[derive(Debug, Clone, Copy)]
pub struct RemovalPolicy {
    /// Total number of attempts, including the first one.
    pub attempts: u32,
    /// Delay before attempt `n` is `step * n`.
    pub step: Duration,
}

impl Default for RemovalPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            step: Duration::from_millis(50),
        }
    }
}

/// Recursively remove `path`, retrying with linear backoff.
///
/// A path that does not exist counts as removed. The error from the last
/// attempt is returned once all attempts are exhausted.
pub fn remove_dir_all_with_retry(path: &Path, policy: RemovalPolicy) -> std::io::Result<()> {
    let attempts = policy.attempts.max(1);
    let mut last_err = None;

    for attempt in 0..attempts {
        if attempt > 0 {
            std::thread::sleep(policy.step * attempt);
        }
        match std::fs::remove_dir_all(path) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                tracing::debug!(
                    "Removal of {} failed (attempt {}/{attempts}): {e}",
                    path.display(),
                    attempt + 1
                );
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| std::io::Error::other("directory removal failed")))
}
