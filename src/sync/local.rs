//! Local directory scan.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FnshipError, Result, SyncError};

/// A file found under the local sync directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Absolute or workdir-relative path on disk.
    pub path: PathBuf,
    /// Hex sha256 of the contents.
    pub sha256: String,
}

/// Scans `dir` recursively, keyed by `/`-separated relative path.
///
/// # Errors
///
/// Returns an error if `dir` is missing or a file cannot be read.
pub fn scan_local(dir: &Path) -> Result<BTreeMap<String, LocalFile>> {
    if !dir.is_dir() {
        return Err(FnshipError::Sync(SyncError::LocalDirMissing {
            path: dir.to_path_buf(),
        }));
    }

    let mut files = BTreeMap::new();
    walk(dir, dir, &mut files)?;
    Ok(files)
}

fn walk(root: &Path, dir: &Path, files: &mut BTreeMap<String, LocalFile>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(root, &path, files)?;
        } else if path.is_file() {
            let Some(key) = object_key(root, &path) else {
                continue;
            };
            let sha256 = hash_file(&path)?;
            files.insert(key, LocalFile { path, sha256 });
        }
    }
    Ok(())
}

/// Relative path of `path` under `root`, joined with `/`.
fn object_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

/// Hex sha256 of a file's contents.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn hash_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
