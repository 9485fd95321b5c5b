//! Error types for the release publisher.
//!
//! Every failure the publisher can hit is a variant of [`PublisherError`].
//! Variants are grouped into the categories reported to the operator by
//! [`PublisherError::category`], so `main` can prefix each diagnostic with
//! the kind of failure (configuration, consistency, build, and so on).

use camino::Utf8PathBuf;
use std::fmt;
use thiserror::Error;

/// Errors that can occur while publishing a release.
#[derive(Debug, Error)]
pub enum PublisherError {
    /// A required setting was not supplied by the CLI, settings file, or
    /// environment.
    #[error("missing required setting {name}; {hint}")]
    MissingSetting {
        /// Name of the missing setting (usually an environment variable).
        name: &'static str,
        /// How the operator can supply it.
        hint: &'static str,
    },

    /// The settings file could not be read or parsed.
    #[error("invalid settings file {path}: {reason}")]
    InvalidSettings {
        /// Path to the settings file.
        path: Utf8PathBuf,
        /// Description of the parse or read failure.
        reason: String,
    },

    /// A tag string is not of the form `vMAJOR.MINOR.PATCH[-PRERELEASE]`.
    #[error("invalid release tag \"{value}\": {reason}")]
    InvalidTag {
        /// The rejected tag string.
        value: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// Local mode found no `v*` tag to publish.
    #[error("no release tag matching v* found; create one or pass --tag")]
    NoReleaseTag,

    /// Another publish run holds the run lock for this group.
    #[error("another publish run holds the lock at {path}")]
    RunLocked {
        /// Path to the lock file.
        path: Utf8PathBuf,
    },

    /// The release is neither a flagged pre-release nor already published.
    #[error(
        "release {tag} is neither a flagged pre-release nor published; \
         it may have been superseded or edited out-of-band"
    )]
    InconsistentRelease {
        /// The tag that was checked.
        tag: String,
    },

    /// The sentinel disappeared between the eligibility check and its
    /// removal, so another run has claimed the release.
    #[error("release {tag} lost its {sentinel} asset during the run; another publish run may have claimed it")]
    SentinelConsumed {
        /// The tag being published.
        tag: String,
        /// Name of the sentinel asset.
        sentinel: String,
    },

    /// A flagged pre-release carries no creation timestamp.
    #[error("release {tag} has no creation timestamp")]
    MissingCreatedAt {
        /// The tag whose timestamp is missing.
        tag: String,
    },

    /// A creation timestamp is not valid ISO-8601.
    #[error("invalid creation timestamp \"{value}\": {reason}")]
    InvalidTimestamp {
        /// The rejected timestamp string.
        value: String,
        /// Description of the parse failure.
        reason: String,
    },

    /// The build output directory contains the working directory, so
    /// clearing it would delete the project.
    #[error("refusing to clear build output directory {path}: it contains the working directory")]
    UnsafeOutputDir {
        /// The configured output directory.
        path: Utf8PathBuf,
    },

    /// The packager failed to produce the build.
    #[error("build failed: {reason}")]
    BuildFailed {
        /// Description of the build failure.
        reason: String,
    },

    /// The static manifest template does not exist.
    #[error("manifest template not found at {path}")]
    ManifestTemplateNotFound {
        /// Path where the template was expected.
        path: Utf8PathBuf,
    },

    /// The build output directory contains no archives.
    #[error("no .{extension} archives found in {dir}; refusing to publish an empty release")]
    EmptyBuildOutput {
        /// The build output directory.
        dir: Utf8PathBuf,
        /// The archive extension that was searched for.
        extension: String,
    },

    /// An archive for a configured target was not produced.
    #[error("expected archive {name} for target {target} was not produced")]
    MissingTargetArchive {
        /// The configured `os_arch` target.
        target: String,
        /// The archive filename that was expected.
        name: String,
    },

    /// A `gpg` invocation failed.
    #[error("gpg {operation} failed: {message}")]
    Signing {
        /// The gpg operation that failed (import, sign, list-keys).
        operation: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// No public key is available to sign with.
    #[error("no public keys available for signing; set GPG_FINGERPRINT or import a key")]
    NoSigningKey,

    /// A `gh` invocation failed.
    #[error("gh release {operation} failed for {target}: {message}")]
    Hosting {
        /// The release operation that failed (view, upload, delete, ...).
        operation: &'static str,
        /// The release tag or repository the operation targeted.
        target: String,
        /// Description of the failure.
        message: String,
    },

    /// A `gh` invocation succeeded but its output could not be decoded.
    #[error("unexpected output from gh release {operation}: {reason}")]
    MalformedResponse {
        /// The release operation whose output was rejected.
        operation: &'static str,
        /// Description of the decoding failure.
        reason: String,
    },

    /// A `git` invocation failed.
    #[error("git {operation} failed: {message}")]
    Git {
        /// The git operation that failed.
        operation: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to write operator output.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

/// Operator-facing classification of a [`PublisherError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing or invalid settings, credentials, or a held run lock.
    Configuration,
    /// Hosting-service state disagrees with the expected lifecycle.
    Consistency,
    /// Packaging, manifest, or archive discovery failed.
    Build,
    /// Key import, identity resolution, or signing failed.
    Signing,
    /// A release-hosting call failed.
    Hosting,
    /// A version-control call failed.
    VersionControl,
    /// Local file system or output failure.
    Io,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Configuration => "configuration",
            Self::Consistency => "consistency",
            Self::Build => "build",
            Self::Signing => "signing",
            Self::Hosting => "hosting",
            Self::VersionControl => "version control",
            Self::Io => "io",
        };
        f.write_str(label)
    }
}

impl PublisherError {
    /// Returns the category used to label this error for the operator.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingSetting { .. }
            | Self::InvalidSettings { .. }
            | Self::InvalidTag { .. }
            | Self::NoReleaseTag
            | Self::RunLocked { .. }
            | Self::UnsafeOutputDir { .. } => ErrorCategory::Configuration,
            Self::InconsistentRelease { .. }
            | Self::SentinelConsumed { .. }
            | Self::MissingCreatedAt { .. }
            | Self::InvalidTimestamp { .. } => ErrorCategory::Consistency,
            Self::BuildFailed { .. }
            | Self::ManifestTemplateNotFound { .. }
            | Self::EmptyBuildOutput { .. }
            | Self::MissingTargetArchive { .. } => ErrorCategory::Build,
            Self::Signing { .. } | Self::NoSigningKey => ErrorCategory::Signing,
            Self::Hosting { .. } | Self::MalformedResponse { .. } => ErrorCategory::Hosting,
            Self::Git { .. } => ErrorCategory::VersionControl,
            Self::Io(_) | Self::WriteFailed { .. } => ErrorCategory::Io,
            #[cfg(any(test, feature = "test-support"))]
            Self::StubMismatch { .. } => ErrorCategory::Io,
        }
    }
}

/// Result type alias using [`PublisherError`].
pub type Result<T> = std::result::Result<T, PublisherError>;
