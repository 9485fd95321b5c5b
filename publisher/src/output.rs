//! Operator-facing output.
//!
//! Progress lines, the dry-run summary and the final outcome all go to
//! stderr through an injected writer so they can be asserted in tests.
//! Diagnostics for developers go through `log` instead.

use crate::config::PublishConfig;
use crate::gc::GcReport;
use crate::hosting::AssetRemoval;
use crate::promotion::{LatestOutcome, PromotionReport};
use camino::Utf8Path;
use std::fmt;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// Stage progress lines, silenced by `--quiet`.
pub struct Progress<'a> {
    stderr: &'a mut dyn Write,
    quiet: bool,
}

impl<'a> Progress<'a> {
    /// Report to `stderr` unless `quiet`.
    pub fn new(stderr: &'a mut dyn Write, quiet: bool) -> Self {
        Self { stderr, quiet }
    }

    /// Report one step.
    pub fn step(&mut self, message: impl fmt::Display) {
        if !self.quiet {
            write_stderr_line(self.stderr, message);
        }
    }
}

/// Resolved configuration shown by `--dry-run`.
///
/// # Example
///
/// ```
/// use camino::Utf8Path;
/// use release_publisher::cli::Cli;
/// use release_publisher::config::{ProjectSettings, PublishConfig};
/// use release_publisher::output::DryRunInfo;
///
/// let cli = Cli {
///     repo: Some("acme/widget".to_owned()),
///     ..Cli::default()
/// };
/// let config = PublishConfig::resolve(&cli, ProjectSettings::default(), |_| None).unwrap();
/// let info = DryRunInfo {
///     config: &config,
///     lock_path: Utf8Path::new("/tmp/release-publisher.lock"),
/// };
///
/// let text = info.display_text();
/// assert!(text.contains("Dry run"));
/// assert!(text.contains("Repository: acme/widget"));
/// assert!(text.contains("Tag: latest v* tag"));
/// ```
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// The resolved configuration.
    pub config: &'a PublishConfig,
    /// Lock file the run would take.
    pub lock_path: &'a Utf8Path,
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display. Secrets are reported
    /// only as present or absent.
    #[must_use]
    pub fn display_text(&self) -> String {
        let config = self.config;
        let presence = |value: &Option<String>| if value.is_some() { "set" } else { "not set" };
        let tag = config
            .tag
            .as_ref()
            .map_or_else(|| "latest v* tag".to_owned(), ToString::to_string);
        let targets = if config.targets.is_empty() {
            "(packager default)".to_owned()
        } else {
            config.targets.join(", ")
        };

        [
            "Dry run - nothing will be built or published".to_owned(),
            String::new(),
            format!("Mode: {}", config.mode),
            format!("Tag: {tag}"),
            format!("Repository: {}", config.repository),
            format!("Project: {}", config.project),
            format!("Packager: {}", config.packager),
            format!("Output directory: {}", config.dist_dir),
            format!("Manifest template: {}", config.manifest_template),
            format!("Archive extension: {}", config.archive_extension),
            format!("Targets: {targets}"),
            format!("Sentinel asset: {}", config.sentinel_asset),
            format!("Release list limit: {}", config.release_list_limit),
            format!(
                "Signing fingerprint: {}",
                config.signing.fingerprint.as_deref().unwrap_or("newest listed key")
            ),
            format!("Signing passphrase: {}", presence(&config.signing.passphrase)),
            format!("Signing key: {}", presence(&config.signing.private_key)),
            format!("Promote latest: {}", config.promote_latest),
            format!("Lock file: {}", self.lock_path),
        ]
        .join("\n")
    }
}

/// One-line summary of the promotion stage.
#[must_use]
pub fn promotion_message(tag: &str, report: &PromotionReport) -> String {
    let plural = if report.uploaded == 1 { "file" } else { "files" };
    let latest = match report.latest {
        LatestOutcome::NotLatest => "",
        LatestOutcome::Deferred => "; latest promotion deferred",
        LatestOutcome::Promoted => "; marked latest",
    };
    let sentinel = match report.sentinel {
        AssetRemoval::Removed => "",
        AssetRemoval::AlreadyAbsent => "; sentinel was already absent",
    };
    format!(
        "Published {tag}: uploaded {} {plural}{latest}{sentinel}",
        report.uploaded
    )
}

/// One-line summary of garbage collection.
#[must_use]
pub fn gc_message(report: &GcReport) -> String {
    if report.deleted.is_empty() {
        return "No abandoned pre-releases to delete".to_owned();
    }
    format!(
        "Deleted {} abandoned pre-release(s): {}",
        report.deleted.len(),
        report.deleted.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::config::ProjectSettings;
    use rstest::{fixture, rstest};

    #[fixture]
    fn config() -> PublishConfig {
        let cli = Cli {
            tag: Some("v1.2.0".to_owned()),
            repo: Some("acme/widget".to_owned()),
            ..Cli::default()
        };
        let env = |name: &str| match name {
            "GPG_PASSPHRASE" => Some("s3cret".to_owned()),
            _ => None,
        };
        PublishConfig::resolve(&cli, ProjectSettings::default(), env).expect("config resolves")
    }

    #[rstest]
    fn dry_run_hides_secret_values(config: PublishConfig) {
        let info = DryRunInfo {
            config: &config,
            lock_path: Utf8Path::new("/tmp/widget.lock"),
        };

        let text = info.display_text();

        assert!(text.contains("Tag: v1.2.0"));
        assert!(text.contains("Signing passphrase: set"));
        assert!(text.contains("Signing key: not set"));
        assert!(text.contains("Targets: (packager default)"));
        assert!(!text.contains("s3cret"));
    }

    #[rstest]
    fn progress_respects_quiet() {
        let mut buffer = Vec::new();
        Progress::new(&mut buffer, true).step("Building v1.2.0...");
        assert!(buffer.is_empty());

        Progress::new(&mut buffer, false).step("Building v1.2.0...");
        assert_eq!(String::from_utf8(buffer).expect("UTF-8"), "Building v1.2.0...\n");
    }

    #[rstest]
    #[case::plain(LatestOutcome::NotLatest, AssetRemoval::Removed, "Published v1.2.0: uploaded 5 files")]
    #[case::deferred(
        LatestOutcome::Deferred,
        AssetRemoval::Removed,
        "Published v1.2.0: uploaded 5 files; latest promotion deferred"
    )]
    #[case::absent(
        LatestOutcome::Promoted,
        AssetRemoval::AlreadyAbsent,
        "Published v1.2.0: uploaded 5 files; marked latest; sentinel was already absent"
    )]
    fn promotion_message_reports_outcomes(
        #[case] latest: LatestOutcome,
        #[case] sentinel: AssetRemoval,
        #[case] expected: &str,
    ) {
        let report = PromotionReport {
            uploaded: 5,
            latest,
            sentinel,
        };
        assert_eq!(promotion_message("v1.2.0", &report), expected);
    }

    #[rstest]
    fn gc_message_lists_deleted_tags() {
        let report = GcReport {
            deleted: vec!["v1.0.0".to_owned(), "v1.1.0".to_owned()],
            ..GcReport::default()
        };
        assert_eq!(
            gc_message(&report),
            "Deleted 2 abandoned pre-release(s): v1.0.0, v1.1.0"
        );
        assert_eq!(gc_message(&GcReport::default()), "No abandoned pre-releases to delete");
    }
}
