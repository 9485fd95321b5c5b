//! Run configuration.
//!
//! Settings come from three places: an optional TOML settings file with
//! per-project defaults, the process environment that CI sets, and CLI
//! overrides. [`PublishConfig::resolve`] merges them once at startup into an
//! immutable value the pipeline reads from; nothing downstream looks at the
//! environment again.

use crate::cli::Cli;
use crate::error::{PublisherError, Result};
use crate::tag::ReleaseTag;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::io::ErrorKind;

/// Settings file consulted when `--config` is not given.
pub const DEFAULT_SETTINGS_FILE: &str = "release-publisher.toml";

/// Whether the run was started by automation or by a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// CI run: the eligibility check is enforced and credentials are required.
    Automated,
    /// Local run: eligibility and garbage collection are skipped.
    Local,
}

impl RunMode {
    /// Interpret the value of the `CI` environment variable.
    ///
    /// # Examples
    ///
    /// ```
    /// use release_publisher::config::RunMode;
    ///
    /// assert_eq!(RunMode::from_ci_signal(Some("true")), RunMode::Automated);
    /// assert_eq!(RunMode::from_ci_signal(Some("0")), RunMode::Local);
    /// assert_eq!(RunMode::from_ci_signal(None), RunMode::Local);
    /// ```
    #[must_use]
    pub fn from_ci_signal(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("" | "0") => Self::Local,
            Some(flag) if flag.eq_ignore_ascii_case("false") => Self::Local,
            Some(_) => Self::Automated,
        }
    }

    /// Returns true for [`RunMode::Automated`].
    #[must_use]
    pub const fn is_automated(self) -> bool {
        matches!(self, Self::Automated)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Automated => "automated",
            Self::Local => "local",
        })
    }
}

/// Per-project settings read from the TOML settings file.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectSettings {
    /// Artefact name prefix; defaults to the repository name.
    pub project: Option<String>,
    /// Directory the packager writes into.
    pub dist_dir: Utf8PathBuf,
    /// Static manifest copied into every release.
    pub manifest_template: Utf8PathBuf,
    /// Extension of the archives the packager produces, without the dot.
    pub archive_extension: String,
    /// Name of the placeholder asset that flags an unfinished pre-release.
    pub sentinel_asset: String,
    /// Expected `os_arch` targets; empty trusts the packager's matrix.
    pub targets: Vec<String>,
    /// How many releases garbage collection inspects.
    pub release_list_limit: usize,
    /// Packager executable.
    pub packager: String,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            project: None,
            dist_dir: Utf8PathBuf::from("dist"),
            manifest_template: Utf8PathBuf::from("registry-manifest.json"),
            archive_extension: "zip".to_owned(),
            sentinel_asset: "prerelease-pending".to_owned(),
            targets: Vec::new(),
            release_list_limit: 100,
            packager: "goreleaser".to_owned(),
        }
    }
}

impl ProjectSettings {
    /// Load settings from `explicit`, or from [`DEFAULT_SETTINGS_FILE`] when
    /// it exists, or fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::InvalidSettings`] when an explicitly named
    /// file is missing, or any file cannot be read or parsed.
    pub fn load(explicit: Option<&Utf8Path>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(path) => (path, true),
            None => (Utf8Path::new(DEFAULT_SETTINGS_FILE), false),
        };

        match fs::read_to_string(path) {
            Ok(source) => Self::from_toml(&source, path),
            Err(err) if err.kind() == ErrorKind::NotFound && !required => {
                debug!("no settings file at {path}; using defaults");
                Ok(Self::default())
            }
            Err(err) => Err(PublisherError::InvalidSettings {
                path: path.to_owned(),
                reason: err.to_string(),
            }),
        }
    }

    /// Parse and validate settings read from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::InvalidSettings`] for malformed TOML,
    /// unknown keys, or values that cannot work.
    pub fn from_toml(source: &str, path: &Utf8Path) -> Result<Self> {
        let invalid = |reason: String| PublisherError::InvalidSettings {
            path: path.to_owned(),
            reason,
        };
        let settings: Self = toml::from_str(source).map_err(|err| invalid(err.to_string()))?;

        if settings.archive_extension.trim_start_matches('.').is_empty() {
            return Err(invalid("archive_extension must not be empty".to_owned()));
        }
        if settings.sentinel_asset.trim().is_empty() {
            return Err(invalid("sentinel_asset must not be empty".to_owned()));
        }
        if settings.release_list_limit == 0 {
            return Err(invalid("release_list_limit must be at least 1".to_owned()));
        }
        Ok(settings)
    }
}

/// Signing inputs taken from the environment.
///
/// `Debug` redacts the passphrase and key so the value can be logged.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SigningSettings {
    /// Explicit signing identity (`GPG_FINGERPRINT`).
    pub fingerprint: Option<String>,
    /// Key passphrase (`GPG_PASSPHRASE`).
    pub passphrase: Option<String>,
    /// ASCII-armored private key to import (`GPG_PRIVATE_KEY`).
    pub private_key: Option<String>,
}

impl fmt::Debug for SigningSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("SigningSettings")
            .field("fingerprint", &self.fingerprint)
            .field("passphrase", &redact(&self.passphrase))
            .field("private_key", &redact(&self.private_key))
            .finish()
    }
}

/// Everything one publish run needs, resolved up front.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishConfig {
    /// Automated or local run.
    pub mode: RunMode,
    /// Tag to publish. `None` in local mode means "latest `v*` tag".
    pub tag: Option<ReleaseTag>,
    /// `owner/name` of the hosting repository.
    pub repository: String,
    /// Artefact name prefix.
    pub project: String,
    /// Directory the packager writes into.
    pub dist_dir: Utf8PathBuf,
    /// Static manifest copied into every release.
    pub manifest_template: Utf8PathBuf,
    /// Archive extension, without the dot.
    pub archive_extension: String,
    /// Placeholder asset that flags an unfinished pre-release.
    pub sentinel_asset: String,
    /// Expected `os_arch` targets.
    pub targets: Vec<String>,
    /// How many releases garbage collection inspects.
    pub release_list_limit: usize,
    /// Packager executable.
    pub packager: String,
    /// Signing inputs.
    pub signing: SigningSettings,
    /// Perform the "mark latest" promotion instead of only logging it.
    pub promote_latest: bool,
}

impl PublishConfig {
    /// Merge CLI overrides, settings and environment.
    ///
    /// `env` looks up one environment variable; blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a required value is missing or the
    /// tag is malformed. In automated mode the tag, passphrase and private
    /// key are required, so missing credentials are caught before any build.
    pub fn resolve<F>(cli: &Cli, settings: ProjectSettings, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| env(name).filter(|value| !value.trim().is_empty());
        let mode = RunMode::from_ci_signal(lookup("CI").as_deref());

        let tag = match cli.tag.clone().or_else(|| {
            mode.is_automated()
                .then(|| lookup("GITHUB_REF_NAME"))
                .flatten()
        }) {
            Some(raw) => Some(ReleaseTag::try_from(raw)?),
            None if mode.is_automated() => {
                return Err(PublisherError::MissingSetting {
                    name: "GITHUB_REF_NAME",
                    hint: "automated runs need the tag from CI or --tag",
                });
            }
            None => None,
        };

        let repository = cli
            .repo
            .clone()
            .or_else(|| lookup("GITHUB_REPOSITORY"))
            .ok_or(PublisherError::MissingSetting {
                name: "GITHUB_REPOSITORY",
                hint: "pass --repo owner/name",
            })?;

        let signing = SigningSettings {
            fingerprint: lookup("GPG_FINGERPRINT"),
            passphrase: lookup("GPG_PASSPHRASE"),
            private_key: lookup("GPG_PRIVATE_KEY"),
        };
        if mode.is_automated() {
            require_credentials(&signing)?;
        }

        let project = cli
            .project
            .clone()
            .or(settings.project)
            .unwrap_or_else(|| repository_name(&repository).to_owned());

        Ok(Self {
            mode,
            tag,
            project,
            repository,
            dist_dir: cli.dist_dir.clone().unwrap_or(settings.dist_dir),
            manifest_template: settings.manifest_template,
            archive_extension: settings.archive_extension.trim_start_matches('.').to_owned(),
            sentinel_asset: settings.sentinel_asset,
            targets: settings.targets,
            release_list_limit: settings.release_list_limit,
            packager: settings.packager,
            signing,
            promote_latest: cli.promote_latest,
        })
    }

    /// Load the settings file named by `cli` and resolve against the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns any error from [`ProjectSettings::load`] or [`Self::resolve`].
    pub fn from_process_env(cli: &Cli) -> Result<Self> {
        let settings = ProjectSettings::load(cli.config.as_deref())?;
        Self::resolve(cli, settings, |name| std::env::var(name).ok())
    }
}

fn require_credentials(signing: &SigningSettings) -> Result<()> {
    if signing.passphrase.is_none() {
        return Err(PublisherError::MissingSetting {
            name: "GPG_PASSPHRASE",
            hint: "automated runs sign non-interactively",
        });
    }
    if signing.private_key.is_none() {
        return Err(PublisherError::MissingSetting {
            name: "GPG_PRIVATE_KEY",
            hint: "automated runs import the signing key from the environment",
        });
    }
    Ok(())
}

/// The `name` half of `owner/name`.
fn repository_name(repository: &str) -> &str {
    repository
        .rsplit_once('/')
        .map_or(repository, |(_, name)| name)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
