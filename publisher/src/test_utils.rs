//! Shared test utilities for the release publisher.
//!
//! [`StubExecutor`] checks the exact argv, stdin and environment of each
//! external-tool invocation. The in-memory collaborators stand in for the
//! hosting service, packager, signer and repository in pipeline and
//! behaviour tests.

use crate::command::{CommandExecutor, ToolCommand};
use crate::error::{PublisherError, Result};
use crate::hosting::{AssetRemoval, ReleaseHost};
use crate::packager::{BuildRequest, Packager};
use crate::release::{Release, ReleaseAsset, ReleaseSummary};
use crate::signing::{KeyImport, SignRequest, Signer};
use crate::vcs::VersionControl;
use camino::Utf8PathBuf;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    stdout_output("")
}

/// Creates a successful command `Output` that printed `stdout`.
#[must_use]
pub fn stdout_output(stdout: &str) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// An expected command invocation.
#[derive(Debug)]
pub struct ExpectedCall {
    program: &'static str,
    args: Vec<String>,
    stdin: Option<Vec<u8>>,
    env: Vec<(String, String)>,
    result: Result<Output>,
}

impl ExpectedCall {
    /// Expect `program` to run with exactly `args`, no stdin and no extra
    /// environment. The call succeeds with empty output unless
    /// [`Self::returning`] says otherwise.
    #[must_use]
    pub fn new(program: &'static str, args: &[&str]) -> Self {
        Self {
            program,
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
            stdin: None,
            env: Vec::new(),
            result: Ok(success_output()),
        }
    }

    /// Expect these bytes on stdin.
    #[must_use]
    pub fn with_stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Expect this environment variable, in addition to any already expected.
    #[must_use]
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_owned(), value.to_owned()));
        self
    }

    /// The result handed back to the adapter.
    #[must_use]
    pub fn returning(mut self, result: Result<Output>) -> Self {
        self.result = result;
        self
    }
}

/// A stub implementation of [`CommandExecutor`] for testing.
///
/// Expected calls are consumed in order. A mismatched call panics with both
/// sides of the comparison; a call beyond the script returns
/// [`PublisherError::StubMismatch`].
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        let remaining = self.expected.borrow();
        assert!(
            remaining.is_empty(),
            "expected no further command invocations, {} left (next: {} {:?})",
            remaining.len(),
            remaining.front().map_or("", |call| call.program),
            remaining.front().map(|call| &call.args),
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn execute(&self, command: &ToolCommand) -> Result<Output> {
        let Some(call) = self.expected.borrow_mut().pop_front() else {
            return Err(PublisherError::StubMismatch {
                message: format!("unexpected command invocation: {command}"),
            });
        };

        assert_eq!(call.program, command.program(), "program for {command}");
        assert_eq!(call.args.as_slice(), command.arguments(), "argv for {command}");
        assert_eq!(call.stdin.as_deref(), command.stdin_bytes(), "stdin for {command}");
        assert_eq!(call.env.as_slice(), command.environment(), "environment for {command}");

        call.result
    }
}

/// In-memory release-hosting service.
///
/// Releases are listed in insertion order, so tests seed them newest first
/// the way the real service lists them.
#[derive(Debug, Default)]
pub struct InMemoryReleaseHost {
    releases: RefCell<Vec<Release>>,
    upload_batches: RefCell<Vec<Vec<String>>>,
    deleted: RefCell<Vec<String>>,
    promoted: RefCell<Vec<String>>,
}

impl InMemoryReleaseHost {
    /// Creates a host holding `releases`.
    #[must_use]
    pub fn new(releases: Vec<Release>) -> Self {
        Self {
            releases: RefCell::new(releases),
            ..Self::default()
        }
    }

    /// A snapshot of the release for `tag`, if it still exists.
    #[must_use]
    pub fn release(&self, tag: &str) -> Option<Release> {
        self.releases
            .borrow()
            .iter()
            .find(|release| release.tag_name == tag)
            .cloned()
    }

    /// Asset names of `tag` in upload order, empty if the release is gone.
    #[must_use]
    pub fn asset_names(&self, tag: &str) -> Vec<String> {
        self.release(tag)
            .map(|release| release.assets.into_iter().map(|asset| asset.name).collect())
            .unwrap_or_default()
    }

    /// File names of each upload call, in call order.
    #[must_use]
    pub fn upload_batches(&self) -> Vec<Vec<String>> {
        self.upload_batches.borrow().clone()
    }

    /// Tags of deleted releases, in deletion order.
    #[must_use]
    pub fn deleted_releases(&self) -> Vec<String> {
        self.deleted.borrow().clone()
    }

    /// Tags passed to [`ReleaseHost::set_prerelease`] with `latest` set.
    #[must_use]
    pub fn promoted_releases(&self) -> Vec<String> {
        self.promoted.borrow().clone()
    }

    fn missing(operation: &'static str, tag: &str) -> PublisherError {
        PublisherError::Hosting {
            operation,
            target: tag.to_owned(),
            message: "release not found".to_owned(),
        }
    }
}

impl ReleaseHost for InMemoryReleaseHost {
    fn view_release(&self, tag: &str) -> Result<Option<Release>> {
        Ok(self.release(tag))
    }

    fn list_releases(&self, limit: usize) -> Result<Vec<ReleaseSummary>> {
        Ok(self
            .releases
            .borrow()
            .iter()
            .take(limit)
            .map(|release| ReleaseSummary {
                tag_name: release.tag_name.clone(),
                is_prerelease: release.is_prerelease,
                created_at: release.created_at.clone(),
            })
            .collect())
    }

    fn upload_assets(&self, tag: &str, files: &[Utf8PathBuf]) -> Result<()> {
        let mut releases = self.releases.borrow_mut();
        let release = releases
            .iter_mut()
            .find(|release| release.tag_name == tag)
            .ok_or_else(|| Self::missing("upload", tag))?;

        let mut batch = Vec::with_capacity(files.len());
        for file in files {
            let name = file.file_name().unwrap_or(file.as_str()).to_owned();
            release.assets.retain(|asset| asset.name != name);
            release.assets.push(ReleaseAsset::new(name.as_str()));
            batch.push(name);
        }
        self.upload_batches.borrow_mut().push(batch);
        Ok(())
    }

    fn delete_asset(&self, tag: &str, asset: &str) -> Result<AssetRemoval> {
        let mut releases = self.releases.borrow_mut();
        let release = releases
            .iter_mut()
            .find(|release| release.tag_name == tag)
            .ok_or_else(|| Self::missing("delete-asset", tag))?;

        let before = release.assets.len();
        release.assets.retain(|existing| existing.name != asset);
        if release.assets.len() == before {
            Ok(AssetRemoval::AlreadyAbsent)
        } else {
            Ok(AssetRemoval::Removed)
        }
    }

    fn delete_release(&self, tag: &str) -> Result<()> {
        let mut releases = self.releases.borrow_mut();
        let before = releases.len();
        releases.retain(|release| release.tag_name != tag);
        if releases.len() == before {
            return Err(Self::missing("delete", tag));
        }
        self.deleted.borrow_mut().push(tag.to_owned());
        Ok(())
    }

    fn set_prerelease(&self, tag: &str, prerelease: bool, latest: bool) -> Result<()> {
        let mut releases = self.releases.borrow_mut();
        let release = releases
            .iter_mut()
            .find(|release| release.tag_name == tag)
            .ok_or_else(|| Self::missing("edit", tag))?;
        release.is_prerelease = prerelease;
        if latest {
            self.promoted.borrow_mut().push(tag.to_owned());
        }
        Ok(())
    }
}

/// Packager double that writes placeholder archives into the output
/// directory.
#[derive(Debug)]
pub struct ScriptedPackager {
    project: String,
    targets: Vec<String>,
    extension: String,
    failure: Option<String>,
    builds: RefCell<Vec<BuildRequest>>,
}

impl ScriptedPackager {
    /// Produces one `{project}_{version}_{target}.zip` per target.
    #[must_use]
    pub fn new(project: &str, targets: &[&str]) -> Self {
        Self {
            project: project.to_owned(),
            targets: targets.iter().map(|target| (*target).to_owned()).collect(),
            extension: "zip".to_owned(),
            failure: None,
            builds: RefCell::new(Vec::new()),
        }
    }

    /// Fails every build with `reason` after recording the request.
    #[must_use]
    pub fn failing(mut self, reason: &str) -> Self {
        self.failure = Some(reason.to_owned());
        self
    }

    /// Requests received so far.
    #[must_use]
    pub fn builds(&self) -> Vec<BuildRequest> {
        self.builds.borrow().clone()
    }
}

impl Packager for ScriptedPackager {
    fn build(&self, request: &BuildRequest) -> Result<()> {
        self.builds.borrow_mut().push(request.clone());
        if let Some(reason) = &self.failure {
            return Err(PublisherError::BuildFailed {
                reason: reason.clone(),
            });
        }

        fs::create_dir_all(&request.dist_dir)?;
        for target in &self.targets {
            let name = format!(
                "{}_{}_{target}.{}",
                self.project,
                request.tag.version(),
                self.extension
            );
            fs::write(request.dist_dir.join(name), format!("{target} archive"))?;
        }
        Ok(())
    }
}

/// Signer double with a fixed keyring that writes a placeholder signature.
#[derive(Debug, Default)]
pub struct RecordingSigner {
    fingerprints: Vec<String>,
    imports: RefCell<Vec<KeyImport>>,
    signatures: RefCell<Vec<SignRequest>>,
}

impl RecordingSigner {
    /// A signer whose keyring lists `fingerprints`.
    #[must_use]
    pub fn new(fingerprints: &[&str]) -> Self {
        Self {
            fingerprints: fingerprints.iter().map(|fpr| (*fpr).to_owned()).collect(),
            ..Self::default()
        }
    }

    /// Keys imported so far.
    #[must_use]
    pub fn imports(&self) -> Vec<KeyImport> {
        self.imports.borrow().clone()
    }

    /// Signature requests received so far.
    #[must_use]
    pub fn signatures(&self) -> Vec<SignRequest> {
        self.signatures.borrow().clone()
    }
}

impl Signer for RecordingSigner {
    fn list_public_fingerprints(&self) -> Result<Vec<String>> {
        Ok(self.fingerprints.clone())
    }

    fn import_private_key(&self, request: &KeyImport) -> Result<()> {
        self.imports.borrow_mut().push(request.clone());
        Ok(())
    }

    fn detach_sign(&self, request: &SignRequest) -> Result<()> {
        fs::write(
            &request.output,
            format!("signature by {} over {}", request.fingerprint, request.input),
        )?;
        self.signatures.borrow_mut().push(request.clone());
        Ok(())
    }
}

/// Repository double with a fixed tag and commit.
#[derive(Debug, Clone, Default)]
pub struct FixedVcs {
    /// Returned by [`VersionControl::latest_version_tag`].
    pub latest_tag: Option<String>,
    /// Returned by [`VersionControl::head_commit`].
    pub commit: String,
}

impl VersionControl for FixedVcs {
    fn latest_version_tag(&self) -> Result<Option<String>> {
        Ok(self.latest_tag.clone())
    }

    fn head_commit(&self) -> Result<String> {
        Ok(self.commit.clone())
    }
}

/// A hosted release with the given flags and assets.
#[must_use]
pub fn release(tag: &str, is_prerelease: bool, created_at: Option<&str>, assets: &[&str]) -> Release {
    Release {
        tag_name: tag.to_owned(),
        is_prerelease,
        created_at: created_at.map(str::to_owned),
        assets: assets.iter().map(|name| ReleaseAsset::new(*name)).collect(),
    }
}
