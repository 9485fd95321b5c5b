//! Stage sequencing for one publish run.
//!
//! The stages run strictly in order: eligibility, build, bundle assembly,
//! signing, upload and promotion, garbage collection. The output directory
//! is emptied before every build so no archive outlives its run. The first error stops
//! the run; nothing is retried. Collaborators are passed in as trait objects
//! so the whole sequence can run against in-memory fakes.

use crate::bundle::{ArtefactBundle, ArtefactNames, BundleLayout, clean_output_dir};
use crate::checksum::Checksummer;
use crate::config::PublishConfig;
use crate::eligibility::{self, Eligibility};
use crate::error::{PublisherError, Result};
use crate::gc::{self, GcReport};
use crate::hosting::ReleaseHost;
use crate::output::{Progress, gc_message, promotion_message};
use crate::packager::{BuildRequest, Packager};
use crate::promotion::{self, PromotionReport};
use crate::signing::{KeyImport, SignRequest, Signer, resolve_fingerprint};
use crate::tag::ReleaseTag;
use crate::vcs::VersionControl;
use log::info;
use std::io::Write;

/// The external systems a run talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Local repository.
    pub vcs: &'a dyn VersionControl,
    /// Release-hosting service.
    pub host: &'a dyn ReleaseHost,
    /// Signing tool.
    pub signer: &'a dyn Signer,
    /// Cross-compilation packager.
    pub packager: &'a dyn Packager,
    /// Digest computation.
    pub checksummer: &'a dyn Checksummer,
}

/// Everything a completed publish produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// The published tag.
    pub tag: ReleaseTag,
    /// The uploaded files.
    pub bundle: ArtefactBundle,
    /// Fingerprint of the signing key.
    pub fingerprint: String,
    /// Upload and promotion results.
    pub promotion: PromotionReport,
    /// Garbage collection results; `None` when it was skipped.
    pub gc: Option<GcReport>,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The tag's release was already final; nothing was done.
    AlreadyPublished {
        /// The tag that was checked.
        tag: ReleaseTag,
    },
    /// The release was built, signed and published.
    Published(Box<PublishReport>),
}

/// The tag to publish: configured, or the newest local `v*` tag.
///
/// # Errors
///
/// Returns [`PublisherError::NoReleaseTag`] when no tag is configured and
/// the repository has none, or a tag validation error.
pub fn resolve_tag(config: &PublishConfig, vcs: &dyn VersionControl) -> Result<ReleaseTag> {
    if let Some(tag) = &config.tag {
        return Ok(tag.clone());
    }
    let latest = vcs.latest_version_tag()?.ok_or(PublisherError::NoReleaseTag)?;
    info!("no tag given; using latest local tag {latest}");
    ReleaseTag::try_from(latest)
}

/// Run every stage for one tag.
///
/// # Errors
///
/// Returns the first stage error. Files already uploaded and releases
/// already deleted are not rolled back; a re-run overwrites the former.
pub fn run_publish(
    config: &PublishConfig,
    tools: &Collaborators<'_>,
    stderr: &mut dyn Write,
    quiet: bool,
) -> Result<PublishOutcome> {
    let mut progress = Progress::new(stderr, quiet);
    let tag = resolve_tag(config, tools.vcs)?;

    let eligibility = eligibility::check(tools.host, &tag, &config.sentinel_asset, config.mode)?;
    if !eligibility.should_publish() {
        progress.step(format!("{tag} is already published; nothing to do."));
        return Ok(PublishOutcome::AlreadyPublished { tag });
    }

    progress.step(format!("Building {tag} with {}...", config.packager));
    build(config, tools, &tag)?;

    let names = ArtefactNames::new(&config.project, &tag);
    let layout = BundleLayout {
        dist_dir: &config.dist_dir,
        manifest_template: &config.manifest_template,
        archive_extension: &config.archive_extension,
        targets: &config.targets,
    };
    let bundle = ArtefactBundle::assemble(&layout, &names, tools.checksummer)?;
    progress.step(format!(
        "Collected {} archive(s) and wrote {}",
        bundle.archives.len(),
        bundle.checksums
    ));

    let fingerprint = sign(config, tools.signer, &bundle)?;
    progress.step(format!("Signed checksums with key {fingerprint}"));

    let promotion = promotion::promote(
        tools.host,
        &tag,
        &bundle,
        &config.sentinel_asset,
        config.promote_latest,
        config.mode,
    )?;
    progress.step(promotion_message(tag.as_str(), &promotion));

    let gc = match eligibility {
        Eligibility::Publish { created_at } => {
            let report = gc::collect_garbage(
                tools.host,
                &tag,
                created_at,
                &config.sentinel_asset,
                config.release_list_limit,
            )?;
            progress.step(gc_message(&report));
            Some(report)
        }
        Eligibility::AlreadyPublished | Eligibility::Unchecked => {
            info!("release creation time unknown in a local run; skipping garbage collection");
            None
        }
    };

    Ok(PublishOutcome::Published(Box::new(PublishReport {
        tag,
        bundle,
        fingerprint,
        promotion,
        gc,
    })))
}

/// Clear the output directory and run the packager into it.
fn build(config: &PublishConfig, tools: &Collaborators<'_>, tag: &ReleaseTag) -> Result<()> {
    let working_dir = std::env::current_dir()?;
    clean_output_dir(&config.dist_dir, &working_dir)?;
    let commit = tools.vcs.head_commit()?;
    tools.packager.build(&BuildRequest {
        tag: tag.clone(),
        commit,
        skip_validate: !config.mode.is_automated(),
        dist_dir: config.dist_dir.clone(),
    })
}

/// Import the configured key if any, pick the identity and sign the
/// checksum file.
fn sign(config: &PublishConfig, signer: &dyn Signer, bundle: &ArtefactBundle) -> Result<String> {
    let signing = &config.signing;
    if let Some(armored_key) = &signing.private_key {
        signer.import_private_key(&KeyImport {
            armored_key: armored_key.clone(),
            passphrase: signing.passphrase.clone(),
        })?;
    }

    let fingerprint = resolve_fingerprint(signer, signing.fingerprint.as_deref())?;
    signer.detach_sign(&SignRequest {
        fingerprint: fingerprint.clone(),
        input: bundle.checksums.clone(),
        output: bundle.signature.clone(),
        passphrase: signing.passphrase.clone(),
    })?;
    Ok(fingerprint)
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
