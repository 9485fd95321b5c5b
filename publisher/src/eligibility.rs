//! Pre-release eligibility check.
//!
//! An earlier automation step creates a pre-release and attaches a sentinel
//! asset to it. A tag may only be published while its release is in that
//! state. Once published the sentinel is gone and the release may be final,
//! so a re-run on a published tag is a silent no-op. Every other state is an
//! inconsistency that needs an operator.

use crate::config::RunMode;
use crate::error::{PublisherError, Result};
use crate::hosting::ReleaseHost;
use crate::release::{CreatedAt, Release};
use crate::tag::ReleaseTag;
use log::{debug, info};

/// What to do with a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// A flagged pre-release: build and publish it.
    Publish {
        /// Creation time of the release; older pre-releases are garbage.
        created_at: CreatedAt,
    },
    /// The release is already final; nothing to do.
    AlreadyPublished,
    /// Local run: the check was skipped.
    Unchecked,
}

impl Eligibility {
    /// Returns true unless the release is already published.
    #[must_use]
    pub const fn should_publish(self) -> bool {
        !matches!(self, Self::AlreadyPublished)
    }

    /// The release's creation time, known only after a passed check.
    #[must_use]
    pub const fn created_at(self) -> Option<CreatedAt> {
        match self {
            Self::Publish { created_at } => Some(created_at),
            Self::AlreadyPublished | Self::Unchecked => None,
        }
    }
}

/// Classify the hosted release for `tag`.
///
/// # Errors
///
/// Returns [`PublisherError::InconsistentRelease`] when the release is
/// missing or is a pre-release without the sentinel, and a timestamp error
/// when a flagged release has no usable creation time.
pub fn evaluate(tag: &ReleaseTag, release: Option<&Release>, sentinel: &str) -> Result<Eligibility> {
    match release {
        Some(found) if found.is_flagged_prerelease(sentinel) => Ok(Eligibility::Publish {
            created_at: found.created_at()?,
        }),
        Some(found) if !found.is_prerelease => Ok(Eligibility::AlreadyPublished),
        Some(_) | None => Err(PublisherError::InconsistentRelease {
            tag: tag.to_string(),
        }),
    }
}

/// Query the hosting service and classify `tag`; local runs skip the query.
///
/// # Errors
///
/// Returns any error from [`evaluate`] or from viewing the release.
pub fn check(
    host: &dyn ReleaseHost,
    tag: &ReleaseTag,
    sentinel: &str,
    mode: RunMode,
) -> Result<Eligibility> {
    if !mode.is_automated() {
        debug!("local run; skipping eligibility check for {tag}");
        return Ok(Eligibility::Unchecked);
    }

    let release = host.view_release(tag.as_str())?;
    let eligibility = evaluate(tag, release.as_ref(), sentinel)?;
    match eligibility {
        Eligibility::Publish { created_at } => {
            info!("{tag} is a flagged pre-release created at {created_at}");
        }
        Eligibility::AlreadyPublished => info!("{tag} is already published"),
        Eligibility::Unchecked => {}
    }
    Ok(eligibility)
}
