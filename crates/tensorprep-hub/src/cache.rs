//! Local data directory management.
//!
//! Dataset files live in a single project-relative directory so repeated
//! runs never re-download what is already on disk.

use std::path::{Path, PathBuf};
use tensorprep_core::Result;

/// Environment variable overriding the data directory location.
pub const DATA_DIR_ENV: &str = "TENSORPREP_DATA_DIR";

/// Get the data directory.
///
/// Resolution order: explicit override, `TENSORPREP_DATA_DIR`, then the
/// sibling `data/` directory relative to the working directory.
pub fn data_dir(override_dir: Option<&str>) -> PathBuf {
    if let Some(dir) = override_dir {
        return PathBuf::from(dir);
    }
    std::env::var(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

/// Get the data directory, creating it if necessary.
pub fn ensure_data_dir(override_dir: Option<&str>) -> Result<PathBuf> {
    let dir = data_dir(override_dir);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

/// Resolve a file name inside the data directory.
pub fn data_file(override_dir: Option<&str>, file_name: &str) -> PathBuf {
    data_dir(override_dir).join(file_name)
}

/// Total size of the data directory in bytes.
pub fn data_dir_size(dir: &Path) -> Result<u64> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut size = 0u64;
    for entry in walkdir::WalkDir::new(dir).into_iter().flatten() {
        if entry.file_type().is_file() {
            if let Ok(metadata) = entry.metadata() {
                size += metadata.len();
            }
        }
    }
    Ok(size)
}

/// Remove every file in the data directory.
pub fn clear_data_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir)?;
    }
    Ok(())
}
