//! Atomic file replacement.
//!
//! All loop control files are written tmp-then-rename so a concurrent
//! reader (or a hook killed mid-write by the host timeout) observes either
//! the prior document or the new one, never a partial write.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Write `content` to `path` atomically, creating parent directories.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let tmp_path = tmp_sibling(path);
    fs::write(&tmp_path, content)
        .with_context(|| format!("Failed to write temporary file: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| {
        format!(
            "Failed to atomically replace {} from {}",
            path.display(),
            tmp_path.display()
        )
    })?;
    Ok(())
}

/// Read a file, retrying once on a transient miss.
///
/// A concurrent atomic replace can make the path vanish for an instant on
/// some filesystems; one re-read covers that. Returns `None` when the file
/// is genuinely absent.
pub fn read_with_retry(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read file: {}", path.display()))
            }
        },
        Err(e) => Err(e).with_context(|| format!("Failed to read file: {}", path.display())),
    }
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
