//! Artefact naming and assembly.
//!
//! After the packager has filled the output directory, the bundle stage
//! copies the manifest template in under its versioned name, gathers the
//! archives, checks them against the expected target matrix and writes the
//! checksum file. Signing fills in the last file; the finished
//! [`ArtefactBundle`] is then uploaded as one set.

use crate::checksum::{ChecksumManifest, Checksummer};
use crate::error::{PublisherError, Result};
use crate::tag::ReleaseTag;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// File names shared by every artefact of one release.
///
/// # Examples
///
/// ```
/// use release_publisher::bundle::ArtefactNames;
/// use release_publisher::tag::ReleaseTag;
///
/// let tag = ReleaseTag::try_from("v1.2.0").unwrap();
/// let names = ArtefactNames::new("widget", &tag);
/// assert_eq!(names.checksums(), "widget_1.2.0_SHA256SUMS");
/// assert_eq!(names.archive("linux_amd64", "zip"), "widget_1.2.0_linux_amd64.zip");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtefactNames {
    prefix: String,
}

impl ArtefactNames {
    /// Names prefixed with `{project}_{version}`.
    #[must_use]
    pub fn new(project: &str, tag: &ReleaseTag) -> Self {
        Self {
            prefix: format!("{project}_{}", tag.version()),
        }
    }

    /// The versioned manifest file name.
    #[must_use]
    pub fn manifest(&self) -> String {
        format!("{}_manifest.json", self.prefix)
    }

    /// The checksum file name.
    #[must_use]
    pub fn checksums(&self) -> String {
        format!("{}_SHA256SUMS", self.prefix)
    }

    /// The detached signature file name.
    #[must_use]
    pub fn signature(&self) -> String {
        format!("{}.sig", self.checksums())
    }

    /// The archive name the packager uses for `target`.
    #[must_use]
    pub fn archive(&self, target: &str, extension: &str) -> String {
        format!("{}_{target}.{extension}", self.prefix)
    }
}

/// Where and how to assemble the bundle.
#[derive(Debug, Clone, Copy)]
pub struct BundleLayout<'a> {
    /// Build output directory.
    pub dist_dir: &'a Utf8Path,
    /// Static manifest template.
    pub manifest_template: &'a Utf8Path,
    /// Archive extension, without the dot.
    pub archive_extension: &'a str,
    /// Expected `os_arch` targets; empty skips the matrix check.
    pub targets: &'a [String],
}

/// The files of one release, ready for upload once signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtefactBundle {
    /// Versioned copy of the manifest template.
    pub manifest: Utf8PathBuf,
    /// Checksum file.
    pub checksums: Utf8PathBuf,
    /// Detached signature over the checksum file.
    pub signature: Utf8PathBuf,
    /// Archives, sorted by file name.
    pub archives: Vec<Utf8PathBuf>,
    /// The digests written to the checksum file.
    pub checksum_manifest: ChecksumManifest,
}

impl ArtefactBundle {
    /// Stage the manifest, collect archives and write the checksum file.
    ///
    /// The signature path is reserved but not written.
    ///
    /// # Errors
    ///
    /// Returns a build error when the template is missing, no archives were
    /// produced, or an expected target archive is absent, and I/O errors
    /// from copying or writing files.
    pub fn assemble(
        layout: &BundleLayout<'_>,
        names: &ArtefactNames,
        checksummer: &dyn Checksummer,
    ) -> Result<Self> {
        let manifest = stage_manifest(layout.manifest_template, layout.dist_dir, names)?;
        let archives = discover_archives(layout.dist_dir, layout.archive_extension)?;
        verify_targets(&archives, names, layout.targets, layout.archive_extension)?;

        let mut covered = Vec::with_capacity(archives.len() + 1);
        covered.push(manifest.clone());
        covered.extend(archives.iter().cloned());
        let checksum_manifest = ChecksumManifest::compute(checksummer, &covered)?;

        let checksums = layout.dist_dir.join(names.checksums());
        checksum_manifest.write_to(&checksums)?;
        info!(
            "wrote {} checksums to {checksums}",
            checksum_manifest.entries().len()
        );

        Ok(Self {
            manifest,
            signature: layout.dist_dir.join(names.signature()),
            checksums,
            archives,
            checksum_manifest,
        })
    }

    /// Files to upload: manifest, checksums, signature, then archives.
    #[must_use]
    pub fn upload_list(&self) -> Vec<Utf8PathBuf> {
        let mut files = vec![
            self.manifest.clone(),
            self.checksums.clone(),
            self.signature.clone(),
        ];
        files.extend(self.archives.iter().cloned());
        files
    }
}

/// Empty `dist_dir` so the packager starts from nothing, creating it if
/// needed.
///
/// A directory that is, or contains, `working_dir` is never removed.
///
/// # Errors
///
/// Returns [`PublisherError::UnsafeOutputDir`] for such a directory, or an
/// I/O error from resolving, removing or creating it.
pub fn clean_output_dir(dist_dir: &Utf8Path, working_dir: &Path) -> Result<()> {
    match fs::canonicalize(dist_dir) {
        Ok(resolved) => {
            let working_dir = fs::canonicalize(working_dir)?;
            if working_dir.starts_with(&resolved) {
                return Err(PublisherError::UnsafeOutputDir {
                    path: dist_dir.to_owned(),
                });
            }
            fs::remove_dir_all(&resolved)?;
            debug!("cleared build output directory {dist_dir}");
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(err.into()),
    }
    fs::create_dir_all(dist_dir)?;
    Ok(())
}

/// Copy the manifest template into `dist_dir` under its versioned name.
///
/// # Errors
///
/// Returns [`PublisherError::ManifestTemplateNotFound`] when the template
/// does not exist, or an I/O error from the copy.
pub fn stage_manifest(
    template: &Utf8Path,
    dist_dir: &Utf8Path,
    names: &ArtefactNames,
) -> Result<Utf8PathBuf> {
    if !template.is_file() {
        return Err(PublisherError::ManifestTemplateNotFound {
            path: template.to_owned(),
        });
    }
    fs::create_dir_all(dist_dir)?;
    let destination = dist_dir.join(names.manifest());
    fs::copy(template, &destination)?;
    debug!("staged manifest {template} as {destination}");
    Ok(destination)
}

/// Every file in `dist_dir` with `extension`, sorted by path.
///
/// # Errors
///
/// Returns [`PublisherError::EmptyBuildOutput`] when there are none
/// (including when the directory does not exist).
pub fn discover_archives(dist_dir: &Utf8Path, extension: &str) -> Result<Vec<Utf8PathBuf>> {
    let empty = || PublisherError::EmptyBuildOutput {
        dir: dist_dir.to_owned(),
        extension: extension.to_owned(),
    };
    let entries = match dist_dir.read_dir_utf8() {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Err(empty()),
        Err(err) => return Err(err.into()),
    };

    let suffix = format!(".{extension}");
    let mut archives = Vec::new();
    for item in entries {
        let entry = item?;
        if entry.file_type()?.is_file() && entry.file_name().ends_with(&suffix) {
            archives.push(entry.into_path());
        }
    }

    if archives.is_empty() {
        return Err(empty());
    }
    archives.sort();
    Ok(archives)
}

/// Check that an archive exists for every expected target.
///
/// # Errors
///
/// Returns [`PublisherError::MissingTargetArchive`] for the first target
/// without an archive.
pub fn verify_targets(
    archives: &[Utf8PathBuf],
    names: &ArtefactNames,
    targets: &[String],
    extension: &str,
) -> Result<()> {
    for target in targets {
        let expected = names.archive(target, extension);
        let present = archives
            .iter()
            .any(|archive| archive.file_name() == Some(expected.as_str()));
        if !present {
            return Err(PublisherError::MissingTargetArchive {
                target: target.clone(),
                name: expected,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "bundle_tests.rs"]
mod tests;
