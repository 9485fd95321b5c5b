//! Garbage collection of abandoned pre-releases.
//!
//! A run that fails after the pre-release was created leaves it behind,
//! still flagged. Once a newer tag publishes successfully those leftovers
//! can never be published, so they are deleted. Listings carry no assets,
//! so each candidate is fetched again and only deleted if it still carries
//! the sentinel.

use crate::error::Result;
use crate::hosting::ReleaseHost;
use crate::release::{CreatedAt, ReleaseSummary};
use crate::tag::ReleaseTag;
use log::{debug, info, warn};

/// What garbage collection did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Tags whose releases were deleted.
    pub deleted: Vec<String>,
    /// Candidates kept because they no longer carry the sentinel or vanished.
    pub spared: Vec<String>,
    /// Listed pre-releases without a creation time.
    pub undated: Vec<String>,
}

/// Pre-releases from `listing` created strictly before `cutoff`, excluding
/// `current`. Undated entries are returned separately.
///
/// # Errors
///
/// Returns [`crate::error::PublisherError::InvalidTimestamp`] when a listed
/// creation time cannot be parsed.
pub fn select_candidates(
    listing: &[ReleaseSummary],
    current: &ReleaseTag,
    cutoff: CreatedAt,
) -> Result<(Vec<String>, Vec<String>)> {
    let mut candidates = Vec::new();
    let mut undated = Vec::new();

    for summary in listing
        .iter()
        .filter(|summary| summary.is_prerelease && summary.tag_name != current.as_str())
    {
        let Some(raw) = summary
            .created_at
            .as_deref()
            .filter(|value| !value.trim().is_empty())
        else {
            undated.push(summary.tag_name.clone());
            continue;
        };
        if CreatedAt::parse(raw)? < cutoff {
            candidates.push(summary.tag_name.clone());
        }
    }

    Ok((candidates, undated))
}

/// Delete flagged pre-releases older than the release just published.
///
/// # Errors
///
/// Returns the first hosting or timestamp error. Releases deleted before the
/// error stay deleted.
pub fn collect_garbage(
    host: &dyn ReleaseHost,
    current: &ReleaseTag,
    cutoff: CreatedAt,
    sentinel: &str,
    limit: usize,
) -> Result<GcReport> {
    let listing = host.list_releases(limit)?;
    let (candidates, undated) = select_candidates(&listing, current, cutoff)?;
    for tag in &undated {
        warn!("pre-release {tag} has no creation time; leaving it alone");
    }

    let mut report = GcReport {
        undated,
        ..GcReport::default()
    };
    for tag in candidates {
        let still_flagged = host
            .view_release(&tag)?
            .is_some_and(|release| release.is_flagged_prerelease(sentinel));
        if still_flagged {
            host.delete_release(&tag)?;
            info!("deleted abandoned pre-release {tag}");
            report.deleted.push(tag);
        } else {
            debug!("{tag} is no longer a flagged pre-release; keeping it");
            report.spared.push(tag);
        }
    }

    Ok(report)
}
