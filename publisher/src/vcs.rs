//! Version-control adapter.
//!
//! The publisher asks git for two things only: the most recently created
//! `v*` tag (local runs pick their tag this way) and the commit hash that
//! the packager embeds into the binaries.

use crate::command::{CommandExecutor, ToolCommand, failure_message, stdout_text};
use crate::error::{PublisherError, Result};
use log::debug;

/// Read-only queries against the local repository.
#[cfg_attr(test, mockall::automock)]
pub trait VersionControl {
    /// Returns the most recently created tag matching `v*`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Git`] when git fails.
    fn latest_version_tag(&self) -> Result<Option<String>>;

    /// Returns the full hash of `HEAD`.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Git`] when git fails or prints nothing.
    fn head_commit(&self) -> Result<String>;
}

/// [`VersionControl`] backed by the `git` CLI.
pub struct GitCli<'a> {
    executor: &'a dyn CommandExecutor,
}

impl<'a> GitCli<'a> {
    /// Create an adapter that runs git through `executor`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self { executor }
    }

    fn run(&self, operation: &'static str, command: &ToolCommand) -> Result<String> {
        let output = self.executor.execute(command)?;
        if !output.status.success() {
            return Err(PublisherError::Git {
                operation,
                message: failure_message(&output),
            });
        }
        Ok(stdout_text(&output))
    }
}

impl VersionControl for GitCli<'_> {
    fn latest_version_tag(&self) -> Result<Option<String>> {
        let command = ToolCommand::new("git").args(["tag", "--list", "v*", "--sort=-creatordate"]);
        let stdout = self.run("tag", &command)?;
        let latest = stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_owned);
        debug!("latest v* tag: {latest:?}");
        Ok(latest)
    }

    fn head_commit(&self) -> Result<String> {
        let command = ToolCommand::new("git").args(["rev-parse", "HEAD"]);
        let stdout = self.run("rev-parse", &command)?;
        let commit = stdout.trim();
        if commit.is_empty() {
            return Err(PublisherError::Git {
                operation: "rev-parse",
                message: "HEAD did not resolve to a commit".to_owned(),
            });
        }
        Ok(commit.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ExpectedCall, StubExecutor, failure_output, stdout_output};

    fn tag_listing() -> ExpectedCall {
        ExpectedCall::new("git", &["tag", "--list", "v*", "--sort=-creatordate"])
    }

    #[test]
    fn latest_version_tag_takes_first_line() {
        let executor = StubExecutor::new(vec![
            tag_listing().returning(Ok(stdout_output("v1.3.0\nv1.2.0\nv1.1.0\n"))),
        ]);
        let git = GitCli::new(&executor);

        let tag = git.latest_version_tag().expect("git should succeed");

        assert_eq!(tag.as_deref(), Some("v1.3.0"));
        executor.assert_finished();
    }

    #[test]
    fn latest_version_tag_is_none_without_tags() {
        let executor = StubExecutor::new(vec![tag_listing().returning(Ok(stdout_output("\n")))]);
        let git = GitCli::new(&executor);

        assert_eq!(git.latest_version_tag().expect("git should succeed"), None);
        executor.assert_finished();
    }

    #[test]
    fn git_failure_is_reported_with_operation() {
        let executor = StubExecutor::new(vec![
            tag_listing().returning(Ok(failure_output("fatal: not a git repository"))),
        ]);
        let git = GitCli::new(&executor);

        let err = git.latest_version_tag().expect_err("git should fail");

        assert!(matches!(
            err,
            PublisherError::Git { operation: "tag", ref message } if message.contains("not a git repository")
        ));
    }

    #[test]
    fn head_commit_is_trimmed() {
        let executor = StubExecutor::new(vec![
            ExpectedCall::new("git", &["rev-parse", "HEAD"])
                .returning(Ok(stdout_output("4f2a9c1e0b7d\n"))),
        ]);
        let git = GitCli::new(&executor);

        assert_eq!(git.head_commit().expect("git should succeed"), "4f2a9c1e0b7d");
        executor.assert_finished();
    }
}
