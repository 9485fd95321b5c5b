//! SHA-256 checksum manifest.
//!
//! The manifest lists one `<digest>  <filename>` line per file, in the
//! format `sha256sum` and `shasum -a 256` emit, so downstream consumers can
//! verify with either tool.

use crate::error::{PublisherError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::Read;

/// Expected length of a hex-encoded SHA-256 digest.
const DIGEST_HEX_LEN: usize = 64;

/// A validated, lowercase hex-encoded SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Return the digest as a hex string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Sha256Digest {
    type Error = PublisherError;

    fn try_from(value: String) -> Result<Self> {
        let well_formed = value.len() == DIGEST_HEX_LEN
            && value
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        if well_formed {
            Ok(Self(value))
        } else {
            Err(PublisherError::BuildFailed {
                reason: format!("checksum tool produced an invalid SHA-256 digest \"{value}\""),
            })
        }
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes file digests.
#[cfg_attr(test, mockall::automock)]
pub trait Checksummer {
    /// Digest the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    fn digest(&self, path: &Utf8Path) -> Result<Sha256Digest>;
}

/// In-process SHA-256 via the `sha2` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Checksummer;

impl Checksummer for Sha256Checksummer {
    fn digest(&self, path: &Utf8Path) -> Result<Sha256Digest> {
        let mut file = fs::File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 8192];
        loop {
            let bytes_read = file.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }
        Sha256Digest::try_from(format!("{:x}", hasher.finalize()))
    }
}

/// One line of the checksum manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumEntry {
    /// The file's name, without directories.
    pub filename: String,
    /// The file's SHA-256 digest.
    pub digest: Sha256Digest,
}

/// Ordered list of file digests.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChecksumManifest {
    entries: Vec<ChecksumEntry>,
}

impl ChecksumManifest {
    /// Digest every file in `files`, ordered by file name.
    ///
    /// # Errors
    ///
    /// Returns an error if a path has no file name or cannot be digested.
    pub fn compute(checksummer: &dyn Checksummer, files: &[Utf8PathBuf]) -> Result<Self> {
        let mut entries = files
            .iter()
            .map(|path| {
                let filename = path.file_name().ok_or_else(|| PublisherError::BuildFailed {
                    reason: format!("cannot checksum {path}: no file name"),
                })?;
                Ok(ChecksumEntry {
                    filename: filename.to_owned(),
                    digest: checksummer.digest(path)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        entries.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(Self { entries })
    }

    /// The entries in file-name order.
    #[must_use]
    pub fn entries(&self) -> &[ChecksumEntry] {
        &self.entries
    }

    /// Render in `sha256sum` format, one newline-terminated line per file.
    #[must_use]
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|entry| format!("{}  {}\n", entry.digest, entry.filename))
            .collect()
    }

    /// Write the rendered manifest to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_to(&self, path: &Utf8Path) -> Result<()> {
        fs::write(path, self.render())?;
        Ok(())
    }
}
