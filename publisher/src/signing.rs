//! GPG signing adapter and signing-identity resolution.
//!
//! The checksum file is signed with a detached signature. The identity is
//! either configured explicitly or taken from the most recently listed
//! public key. When a passphrase is supplied it is piped to gpg on stdin in
//! loopback pinentry mode, so signing never prompts.

use crate::command::{CommandExecutor, ToolCommand, failure_message, stdout_text};
use crate::error::{PublisherError, Result};
use camino::Utf8PathBuf;
use log::{debug, info};
use std::io::Write;

/// A private key to import before signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyImport {
    /// ASCII-armored private key block.
    pub armored_key: String,
    /// Passphrase protecting the key, if any.
    pub passphrase: Option<String>,
}

/// A detached-signature request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignRequest {
    /// Fingerprint of the signing key.
    pub fingerprint: String,
    /// File to sign.
    pub input: Utf8PathBuf,
    /// Where to write the detached signature.
    pub output: Utf8PathBuf,
    /// Passphrase for non-interactive signing; `None` relies on an agent or
    /// an unprotected key.
    pub passphrase: Option<String>,
}

/// Operations the publisher needs from the signing tool.
#[cfg_attr(test, mockall::automock)]
pub trait Signer {
    /// Fingerprints of the primary public keys, in listing order.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Signing`] if the listing fails.
    fn list_public_fingerprints(&self) -> Result<Vec<String>>;

    /// Import a private key into the keyring.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Signing`] if the import fails.
    fn import_private_key(&self, request: &KeyImport) -> Result<()>;

    /// Produce a detached signature.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Signing`] if signing fails.
    fn detach_sign(&self, request: &SignRequest) -> Result<()>;
}

/// Pick the signing fingerprint.
///
/// A non-blank `configured` value wins. Otherwise the last public key in the
/// keyring listing is used, which is the most recently imported one.
///
/// # Errors
///
/// Returns [`PublisherError::NoSigningKey`] when nothing is configured and
/// the keyring is empty, or any error from listing the keys.
pub fn resolve_fingerprint(signer: &dyn Signer, configured: Option<&str>) -> Result<String> {
    if let Some(fingerprint) = configured.map(str::trim).filter(|fpr| !fpr.is_empty()) {
        debug!("using configured signing fingerprint {fingerprint}");
        return Ok(fingerprint.to_owned());
    }

    let fingerprint = signer
        .list_public_fingerprints()?
        .pop()
        .ok_or(PublisherError::NoSigningKey)?;
    info!("derived signing fingerprint {fingerprint} from the keyring");
    Ok(fingerprint)
}

/// Extract primary-key fingerprints from `gpg --with-colons` output.
///
/// Only the `fpr` record directly following a `pub` record is taken;
/// subkey fingerprints are skipped.
///
/// # Examples
///
/// ```
/// use release_publisher::signing::parse_public_fingerprints;
///
/// let listing = "pub:u:4096:1:AAAA:1700000000:::u:::scESC::::::23::0:\n\
///                fpr:::::::::0123456789ABCDEF0123456789ABCDEF01234567:\n\
///                sub:u:4096:1:BBBB:1700000000::::::e::::::23:\n\
///                fpr:::::::::FEDCBA9876543210FEDCBA9876543210FEDCBA98:\n";
/// assert_eq!(
///     parse_public_fingerprints(listing),
///     vec!["0123456789ABCDEF0123456789ABCDEF01234567".to_owned()]
/// );
/// ```
#[must_use]
pub fn parse_public_fingerprints(listing: &str) -> Vec<String> {
    let mut fingerprints = Vec::new();
    let mut after_primary = false;

    for line in listing.lines() {
        let mut fields = line.split(':');
        match fields.next() {
            Some("pub") => after_primary = true,
            Some("fpr") if after_primary => {
                after_primary = false;
                if let Some(fpr) = fields.nth(8).filter(|fpr| !fpr.is_empty()) {
                    fingerprints.push(fpr.to_owned());
                }
            }
            Some("fpr" | "uid" | "grp") => {}
            _ => after_primary = false,
        }
    }

    fingerprints
}

/// [`Signer`] backed by the `gpg` CLI.
pub struct GpgCli<'a> {
    executor: &'a dyn CommandExecutor,
}

impl<'a> GpgCli<'a> {
    /// Create an adapter that runs gpg through `executor`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self { executor }
    }

    fn run(&self, operation: &'static str, command: &ToolCommand) -> Result<String> {
        let output = self.executor.execute(command)?;
        if !output.status.success() {
            return Err(PublisherError::Signing {
                operation,
                message: failure_message(&output),
            });
        }
        Ok(stdout_text(&output))
    }
}

/// Base gpg command, switched to loopback pinentry with the passphrase on
/// stdin when one is supplied.
fn gpg_command(passphrase: Option<&str>) -> ToolCommand {
    let command = ToolCommand::new("gpg").args(["--batch", "--yes"]);
    match passphrase {
        Some(secret) => command
            .args(["--pinentry-mode", "loopback", "--passphrase-fd", "0"])
            .stdin(secret),
        None => command,
    }
}

impl Signer for GpgCli<'_> {
    fn list_public_fingerprints(&self) -> Result<Vec<String>> {
        let command =
            ToolCommand::new("gpg").args(["--batch", "--list-keys", "--with-colons"]);
        let listing = self.run("list-keys", &command)?;
        Ok(parse_public_fingerprints(&listing))
    }

    fn import_private_key(&self, request: &KeyImport) -> Result<()> {
        // The key travels through a private temporary file so stdin stays
        // free for the passphrase.
        let mut key_file = tempfile::NamedTempFile::new()?;
        key_file.write_all(request.armored_key.as_bytes())?;
        key_file.flush()?;
        let key_path = key_file.path().to_string_lossy().into_owned();

        let command = gpg_command(request.passphrase.as_deref()).args(["--import", key_path.as_str()]);
        self.run("import", &command)?;
        info!("imported signing key");
        Ok(())
    }

    fn detach_sign(&self, request: &SignRequest) -> Result<()> {
        let command = gpg_command(request.passphrase.as_deref()).args([
            "--local-user",
            request.fingerprint.as_str(),
            "--output",
            request.output.as_str(),
            "--detach-sign",
            request.input.as_str(),
        ]);
        self.run("sign", &command)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "signing_tests.rs"]
mod tests;
