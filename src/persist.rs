//! Durable file writes used to commit a page store image.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

/// How a file image is written to its final path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveMode {
    /// Write a temporary file beside the target, sync it and rename it over
    /// the target. Readers see either the old or the new content.
    Atomic,
    /// Truncate and overwrite the target. A crash mid-write leaves it
    /// partially written.
    InPlace,
}

pub fn save(path: &Path, data: &[u8], mode: SaveMode) -> io::Result<()> {
    match mode {
        SaveMode::Atomic => atomic_save(path, data),
        SaveMode::InPlace => in_place_save(path, data),
    }
}

/// Replaces `path` with `data` all at once. On failure the temporary file is
/// removed and `path` is left untouched.
pub fn atomic_save(path: &Path, data: &[u8]) -> io::Result<()> {
    let tmp = temp_path(path)?;
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp)?;

    let result = write_and_sync(file, data).and_then(|_| fs::rename(&tmp, path));
    if let Err(e) = result {
        remove_partial(&tmp);
        return Err(e);
    }
    sync_parent(path)
}

/// Overwrites `path` with `data`. A failed write removes the partial file.
pub fn in_place_save(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    if let Err(e) = file.write_all(data) {
        drop(file);
        remove_partial(path);
        return Err(e);
    }
    Ok(())
}

// Removes a file left behind by a failed save, logging when that fails too.
fn remove_partial(path: &Path) {
    if let Err(cleanup) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %cleanup, "failed to remove partial file");
    }
}

fn write_and_sync(mut file: File, data: &[u8]) -> io::Result<()> {
    file.write_all(data)?;
    file.sync_all()
}

fn temp_path(path: &Path) -> io::Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "path has no file name")
    })?;
    let mut tmp_name = name.to_os_string();
    tmp_name.push(format!(".tmp.{}", Uuid::new_v4()));
    Ok(path.with_file_name(tmp_name))
}

// The rename is only durable once the directory entry is.
#[cfg(unix)]
fn sync_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => File::open(dir)?.sync_all(),
        _ => File::open(".")?.sync_all(),
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> io::Result<()> {
    Ok(())
}
