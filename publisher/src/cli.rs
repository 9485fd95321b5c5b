//! CLI argument definitions for the release publisher.
//!
//! Kept apart from the binary so configuration resolution and its tests can
//! construct a [`Cli`] directly.

use crate::lock::DEFAULT_LOCK_GROUP;
use camino::Utf8PathBuf;
use clap::Parser;

/// Build, sign, and publish a tagged pre-release.
#[derive(Parser, Debug, Clone)]
#[command(name = "release-publisher")]
#[command(version, about)]
#[command(long_about = concat!(
    "Build, sign, and publish a tagged pre-release.\n\n",
    "In CI (CI=true) the tag must belong to a pre-release that still carries ",
    "the sentinel asset. The publisher builds the archives, writes a SHA-256 ",
    "checksum file, signs it with GPG, uploads everything, removes the sentinel, ",
    "and deletes older pre-releases abandoned by failed runs.\n\n",
    "Locally the most recent v* tag is built and uploaded without the ",
    "eligibility check or garbage collection.",
))]
#[command(after_help = concat!(
    "ENVIRONMENT:\n",
    "  CI                  Automated mode unless empty, 0 or false\n",
    "  GITHUB_REF_NAME     Tag to publish in automated mode\n",
    "  GITHUB_REPOSITORY   owner/name of the hosting repository\n",
    "  GPG_FINGERPRINT     Signing identity [default: newest listed key]\n",
    "  GPG_PASSPHRASE      Signing passphrase (required in automated mode)\n",
    "  GPG_PRIVATE_KEY     Armored private key (required in automated mode)\n",
    "  RUST_LOG            Log filter, overrides -v\n\n",
    "EXAMPLES:\n",
    "  Publish the tag CI checked out:\n",
    "    $ release-publisher\n\n",
    "  Publish the latest local tag to a fork:\n",
    "    $ release-publisher --repo me/widget\n\n",
    "  Show the resolved configuration:\n",
    "    $ release-publisher --dry-run",
))]
pub struct Cli {
    /// Tag to publish [default: GITHUB_REF_NAME, or the latest v* tag locally].
    #[arg(long, value_name = "TAG")]
    pub tag: Option<String>,

    /// Hosting repository as owner/name [default: GITHUB_REPOSITORY].
    #[arg(long, value_name = "OWNER/NAME")]
    pub repo: Option<String>,

    /// Artefact name prefix [default: settings file, then repository name].
    #[arg(long, value_name = "NAME")]
    pub project: Option<String>,

    /// Settings file [default: release-publisher.toml when present].
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Build output directory, overriding the settings file.
    #[arg(long, value_name = "DIR")]
    pub dist_dir: Option<Utf8PathBuf>,

    /// Name of the lock shared by runs that must not overlap.
    #[arg(long, value_name = "NAME", default_value = DEFAULT_LOCK_GROUP)]
    pub lock_group: String,

    /// Directory holding lock files [default: system temp directory].
    #[arg(long, value_name = "DIR")]
    pub lock_dir: Option<Utf8PathBuf>,

    /// Mark a final release as latest instead of only logging the intent.
    #[arg(long)]
    pub promote_latest: bool,

    /// Show configuration and exit without building or publishing.
    #[arg(long)]
    pub dry_run: bool,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Default for Cli {
    /// Creates a `Cli` with no overrides, matching an invocation without
    /// arguments.
    ///
    /// # Examples
    ///
    /// ```
    /// use release_publisher::cli::Cli;
    ///
    /// let cli = Cli::default();
    /// assert!(cli.tag.is_none());
    /// assert_eq!(cli.lock_group, "release-publisher");
    /// assert!(!cli.promote_latest);
    /// ```
    fn default() -> Self {
        Self {
            tag: None,
            repo: None,
            project: None,
            config: None,
            dist_dir: None,
            lock_group: DEFAULT_LOCK_GROUP.to_owned(),
            lock_dir: None,
            promote_latest: false,
            dry_run: false,
            verbosity: 0,
            quiet: false,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
