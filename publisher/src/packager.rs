//! Cross-compilation packager adapter.
//!
//! The packager owns the OS/architecture matrix and the archive format. The
//! publisher only asks it to build, with its own publish step disabled, and
//! hands it the version and commit to embed in the binaries.

use crate::command::{CommandExecutor, ToolCommand, failure_message};
use crate::error::{PublisherError, Result};
use crate::tag::ReleaseTag;
use camino::Utf8PathBuf;
use log::info;

/// Inputs for one packager run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// The tag being released.
    pub tag: ReleaseTag,
    /// Full commit hash of the tagged revision.
    pub commit: String,
    /// Skip the packager's own validation (faster local iteration).
    pub skip_validate: bool,
    /// Directory the packager writes archives into.
    pub dist_dir: Utf8PathBuf,
}

/// Builds release archives.
#[cfg_attr(test, mockall::automock)]
pub trait Packager {
    /// Cross-compile and archive the project.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::BuildFailed`] if the packager fails.
    fn build(&self, request: &BuildRequest) -> Result<()>;
}

/// [`Packager`] backed by a goreleaser-compatible CLI.
pub struct GoreleaserPackager<'a> {
    executor: &'a dyn CommandExecutor,
    program: String,
}

impl<'a> GoreleaserPackager<'a> {
    /// Create an adapter that runs `program` through `executor`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor, program: impl Into<String>) -> Self {
        Self {
            executor,
            program: program.into(),
        }
    }

    /// The invocation for `request`.
    ///
    /// Publishing is always skipped; this tool uploads the artefacts itself.
    /// The version and commit are exported so the packager's templates can
    /// embed them into the binaries.
    #[must_use]
    pub fn command_for(&self, request: &BuildRequest) -> ToolCommand {
        let mut command = ToolCommand::new(self.program.as_str()).args([
            "release",
            "--clean",
            "--skip=publish",
        ]);
        if request.skip_validate {
            command = command.arg("--skip=validate");
        }
        command
            .env("GORELEASER_CURRENT_TAG", request.tag.as_str())
            .env("RELEASE_VERSION", request.tag.version())
            .env("RELEASE_COMMIT", request.commit.as_str())
            .env("DIST_DIR", request.dist_dir.as_str())
    }
}

impl Packager for GoreleaserPackager<'_> {
    fn build(&self, request: &BuildRequest) -> Result<()> {
        info!(
            "building {} at {} (validation {})",
            request.tag,
            request.commit,
            if request.skip_validate { "skipped" } else { "enabled" }
        );
        let output = self.executor.execute(&self.command_for(request))?;
        if !output.status.success() {
            return Err(PublisherError::BuildFailed {
                reason: format!("{} exited unsuccessfully: {}", self.program, failure_message(&output)),
            });
        }
        Ok(())
    }
}
