//! Output naming: the target sits next to the source with a `.mkv` extension,
//! and originals are parked in a `Duplicates` directory beside it.

use shared_utils::{ArchiveError, Result};
use std::path::{Path, PathBuf};

pub const TARGET_EXTENSION: &str = "mkv";
pub const DUPLICATES_DIR: &str = "Duplicates";

/// Replace the final extension (ASCII letters and digits only) with `.mkv`.
/// `clip.backup.avi` becomes `clip.backup.mkv`.
pub fn target_filename(source: &Path) -> Result<PathBuf> {
    let name = source
        .file_name()
        .ok_or_else(|| ArchiveError::NoExtension(source.to_path_buf()))?
        .to_str()
        .ok_or_else(|| ArchiveError::InvalidPath(source.to_path_buf()))?;

    let stem = match name.rfind('.') {
        Some(dot)
            if dot + 1 < name.len()
                && name[dot + 1..].bytes().all(|b| b.is_ascii_alphanumeric()) =>
        {
            &name[..dot]
        }
        _ => return Err(ArchiveError::NoExtension(source.to_path_buf())),
    };

    Ok(source.with_file_name(format!("{}.{}", stem, TARGET_EXTENSION)))
}

/// `Duplicates/<source name>` in the target's directory.
pub fn duplicate_destination(source: &Path, target: &Path) -> Result<PathBuf> {
    let name = source
        .file_name()
        .ok_or_else(|| ArchiveError::InvalidPath(source.to_path_buf()))?;
    Ok(duplicates_dir(target).join(name))
}

pub fn duplicates_dir(target: &Path) -> PathBuf {
    target
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(DUPLICATES_DIR)
}
