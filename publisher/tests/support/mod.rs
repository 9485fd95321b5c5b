//! Shared fixtures for the publisher behaviour suites.

use camino::Utf8PathBuf;
use std::fs;
use tempfile::TempDir;

/// A temporary project root holding the manifest template and the packager
/// output directory.
pub struct ProjectDir {
    _temp: TempDir,
    root: Utf8PathBuf,
}

impl ProjectDir {
    /// Creates the root and writes an empty JSON manifest template.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 temp path");
        fs::write(root.join("registry-manifest.json"), "{}\n").expect("write template");
        Self { _temp: temp, root }
    }

    pub fn dist_dir(&self) -> Utf8PathBuf {
        self.root.join("dist")
    }

    pub fn manifest_template(&self) -> Utf8PathBuf {
        self.root.join("registry-manifest.json")
    }
}
