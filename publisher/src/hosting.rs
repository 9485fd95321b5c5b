//! Release-hosting adapter.
//!
//! [`ReleaseHost`] is the publisher's view of the code-hosting service's
//! release API. [`GhReleaseHost`] implements it with the `gh` CLI, scoped to
//! one `owner/name` repository. "Not found" responses that the lifecycle
//! logic needs to branch on are returned as typed values; every other
//! failure is a [`PublisherError::Hosting`].

use crate::command::{CommandExecutor, ToolCommand, failure_message};
use crate::error::{PublisherError, Result};
use crate::release::{Release, ReleaseSummary};
use camino::Utf8PathBuf;
use log::debug;
use std::process::Output;

/// JSON fields requested when viewing a single release.
const VIEW_FIELDS: &str = "tagName,isPrerelease,assets,createdAt";

/// JSON fields requested when listing releases.
const LIST_FIELDS: &str = "tagName,isPrerelease,createdAt";

/// Outcome of removing a named asset from a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetRemoval {
    /// The asset existed and was deleted.
    Removed,
    /// The release had no asset with that name.
    AlreadyAbsent,
}

/// Release operations offered by the hosting service.
#[cfg_attr(test, mockall::automock)]
pub trait ReleaseHost {
    /// Fetch the release attached to `tag`, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if the service call fails for any other reason or
    /// its response cannot be decoded.
    fn view_release(&self, tag: &str) -> Result<Option<Release>>;

    /// List up to `limit` releases in the order the service returns them.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or its response cannot be decoded.
    fn list_releases(&self, limit: usize) -> Result<Vec<ReleaseSummary>>;

    /// Upload `files` to the release, replacing same-named assets.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload fails.
    fn upload_assets(&self, tag: &str, files: &[Utf8PathBuf]) -> Result<()>;

    /// Delete the asset called `asset` from the release.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails for a reason other than the
    /// asset being absent.
    fn delete_asset(&self, tag: &str, asset: &str) -> Result<AssetRemoval>;

    /// Delete the release and all of its assets. The git tag is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails.
    fn delete_release(&self, tag: &str) -> Result<()>;

    /// Set the release's pre-release flag, optionally marking it latest.
    ///
    /// # Errors
    ///
    /// Returns an error if the edit fails.
    fn set_prerelease(&self, tag: &str, prerelease: bool, latest: bool) -> Result<()>;
}

/// [`ReleaseHost`] backed by the GitHub CLI.
pub struct GhReleaseHost<'a> {
    executor: &'a dyn CommandExecutor,
    repository: String,
}

impl<'a> GhReleaseHost<'a> {
    /// Create an adapter for `repository` (`owner/name`).
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor, repository: impl Into<String>) -> Self {
        Self {
            executor,
            repository: repository.into(),
        }
    }

    /// Build `gh release <subcommand> ...` with the repository flag appended.
    fn release_command<I, S>(&self, args: I) -> ToolCommand
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ToolCommand::new("gh")
            .arg("release")
            .args(args)
            .args(["--repo", self.repository.as_str()])
    }

    fn hosting_error(operation: &'static str, target: &str, output: &Output) -> PublisherError {
        PublisherError::Hosting {
            operation,
            target: target.to_owned(),
            message: failure_message(output),
        }
    }

    fn run_checked(
        &self,
        operation: &'static str,
        target: &str,
        command: &ToolCommand,
    ) -> Result<Output> {
        let output = self.executor.execute(command)?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(Self::hosting_error(operation, target, &output))
        }
    }
}

impl ReleaseHost for GhReleaseHost<'_> {
    fn view_release(&self, tag: &str) -> Result<Option<Release>> {
        let command = self.release_command(["view", tag, "--json", VIEW_FIELDS]);
        let output = self.executor.execute(&command)?;

        if !output.status.success() {
            if is_release_not_found(&output) {
                debug!("no release exists for {tag}");
                return Ok(None);
            }
            return Err(Self::hosting_error("view", tag, &output));
        }

        serde_json::from_slice(&output.stdout)
            .map(Some)
            .map_err(|e| PublisherError::MalformedResponse {
                operation: "view",
                reason: e.to_string(),
            })
    }

    fn list_releases(&self, limit: usize) -> Result<Vec<ReleaseSummary>> {
        let limit_arg = limit.to_string();
        let command =
            self.release_command(["list", "--limit", limit_arg.as_str(), "--json", LIST_FIELDS]);
        let output = self.run_checked("list", &self.repository, &command)?;

        serde_json::from_slice(&output.stdout).map_err(|e| PublisherError::MalformedResponse {
            operation: "list",
            reason: e.to_string(),
        })
    }

    fn upload_assets(&self, tag: &str, files: &[Utf8PathBuf]) -> Result<()> {
        let command = self.release_command(
            std::iter::once("upload".to_owned())
                .chain(std::iter::once(tag.to_owned()))
                .chain(files.iter().map(ToString::to_string)),
        );
        // `--clobber` makes re-runs after a partial upload overwrite rather
        // than fail on assets that already exist.
        let command = command.arg("--clobber");
        self.run_checked("upload", tag, &command)?;
        Ok(())
    }

    fn delete_asset(&self, tag: &str, asset: &str) -> Result<AssetRemoval> {
        let command = self.release_command(["delete-asset", tag, asset, "--yes"]);
        let output = self.executor.execute(&command)?;
        if output.status.success() {
            return Ok(AssetRemoval::Removed);
        }
        if is_asset_not_found(&output, asset) {
            return Ok(AssetRemoval::AlreadyAbsent);
        }
        Err(Self::hosting_error("delete-asset", tag, &output))
    }

    fn delete_release(&self, tag: &str) -> Result<()> {
        let command = self.release_command(["delete", tag, "--yes"]);
        self.run_checked("delete", tag, &command)?;
        Ok(())
    }

    fn set_prerelease(&self, tag: &str, prerelease: bool, latest: bool) -> Result<()> {
        let mut command =
            self.release_command(["edit".to_owned(), tag.to_owned(), format!("--prerelease={prerelease}")]);
        if latest {
            command = command.arg("--latest");
        }
        self.run_checked("edit", tag, &command)?;
        Ok(())
    }
}

/// Stderr lines of a failed `gh` call, trimmed and lowercased.
fn stderr_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stderr)
        .lines()
        .map(|line| line.trim().to_ascii_lowercase())
        .filter(|line| !line.is_empty())
        .collect()
}

/// `gh release view` prints exactly `release not found` for a missing tag.
/// Other 404s, such as an unknown repository, stay errors.
fn is_release_not_found(output: &Output) -> bool {
    stderr_lines(output)
        .iter()
        .any(|line| line == "release not found")
}

/// `gh release delete-asset` prints `asset <name> not found in release <tag>`.
fn is_asset_not_found(output: &Output, asset: &str) -> bool {
    let prefix = format!("asset {} not found in release", asset.to_ascii_lowercase());
    stderr_lines(output)
        .iter()
        .any(|line| line.starts_with(&prefix))
}

#[cfg(test)]
#[path = "hosting_tests.rs"]
mod tests;
