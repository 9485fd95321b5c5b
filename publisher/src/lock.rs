//! Run lock.
//!
//! Two publish runs for the same project must not interleave: both would
//! upload into the same release and garbage-collect each other's state. Each
//! run takes an exclusive advisory lock on `{dir}/{group}.lock` and holds it
//! until the [`RunLock`] is dropped. A held lock fails the run immediately.

use crate::error::{PublisherError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use fs2::FileExt;
use log::debug;
use std::fs::{self, File, OpenOptions};
use std::io;

/// Lock group used when `--lock-group` is not given.
pub const DEFAULT_LOCK_GROUP: &str = "release-publisher";

/// An exclusive lock held for the lifetime of the value.
#[derive(Debug)]
pub struct RunLock {
    _file: File,
    path: Utf8PathBuf,
}

impl RunLock {
    /// Take the lock for `group` inside `dir`, creating `dir` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::RunLocked`] when another process holds the
    /// lock, or an I/O error if the lock file cannot be opened.
    pub fn acquire(dir: &Utf8Path, group: &str) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = lock_path(dir, group);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!("acquired run lock {path}");
                Ok(Self { _file: file, path })
            }
            Err(err) if is_contended(&err) => Err(PublisherError::RunLocked { path }),
            Err(err) => Err(PublisherError::Io(err)),
        }
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

/// The system temporary directory, used when `--lock-dir` is not given.
///
/// # Errors
///
/// Returns an I/O error when the temporary directory is not valid UTF-8.
pub fn default_lock_dir() -> Result<Utf8PathBuf> {
    Utf8PathBuf::try_from(std::env::temp_dir()).map_err(|err| {
        PublisherError::Io(io::Error::new(io::ErrorKind::InvalidData, err.to_string()))
    })
}

/// Path of the lock file for `group` inside `dir`.
#[must_use]
pub fn lock_path(dir: &Utf8Path, group: &str) -> Utf8PathBuf {
    dir.join(lock_file_name(group))
}

fn is_contended(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Lock file name for `group`, with path-hostile characters replaced.
fn lock_file_name(group: &str) -> String {
    let sanitised: String = group
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{sanitised}.lock")
}
