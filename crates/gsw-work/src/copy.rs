use std::fs;
use std::path::Path;

use gsw_core::errors::{ErrorInfo, GswError};
use walkdir::WalkDir;

fn copy_error(src: &Path, dest: &Path, err: impl ToString) -> GswError {
    GswError::Provisioning(
        ErrorInfo::new("gsw_work.copy", "failed to copy template")
            .with_context("src", src.display().to_string())
            .with_context("dest", dest.display().to_string())
            .with_hint(err.to_string()),
    )
}

/// Recursively copies `src` into the not-yet-existing directory `dest`.
///
/// Symlinks are followed and their targets copied as regular files or
/// directories; a symlink loop surfaces as a provisioning error.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<u64, GswError> {
    let mut copied = 0u64;
    fs::create_dir(dest).map_err(|err| copy_error(src, dest, err))?;
    for entry in WalkDir::new(src).follow_links(true).min_depth(1) {
        let entry = entry.map_err(|err| copy_error(src, dest, err))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|err| copy_error(src, dest, err))?;
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|err| copy_error(entry.path(), &target, err))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|err| copy_error(entry.path(), &target, err))?;
            copied += 1;
        }
    }
    Ok(copied)
}
