//! Write-then-rename file replacement.
//!
//! Data goes to `{path}.tmp`, is synced, and is then renamed over the final
//! path. A crash mid-write leaves any previous file at `path` intact.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Replace the contents of `path` with `data`, creating parent directories.
pub fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = tmp_path(path);
    let result = write_and_rename(&tmp, path, data);
    match &result {
        Ok(()) => {
            tracing::debug!(path = %path.display(), bytes = data.len(), "file written");
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "write failed");
            // The tmp file may not exist if creating it failed.
            let _ = fs::remove_file(&tmp);
        }
    }
    result
}

fn write_and_rename(tmp: &Path, path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(tmp, path)
}
