//! Upload and promotion.
//!
//! Uploads replace same-named assets, so a run that died halfway can simply
//! be repeated. Marking a release "latest" is deliberately off unless the
//! operator opts in: by default the intent is only logged. Removing the
//! sentinel asset is the last step and is what turns the pre-release into a
//! published one as far as this tool is concerned. In automated runs the
//! eligibility check has already seen the sentinel, so finding it gone at
//! this point means another run claimed the release.

use crate::bundle::ArtefactBundle;
use crate::config::RunMode;
use crate::error::{PublisherError, Result};
use crate::hosting::{AssetRemoval, ReleaseHost};
use crate::tag::ReleaseTag;
use log::{info, warn};

/// What happened to the "latest" marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatestOutcome {
    /// The tag is a pre-release or not the newest release.
    NotLatest,
    /// The tag qualifies but promotion is disabled; the intent was logged.
    Deferred,
    /// The release was marked final and latest.
    Promoted,
}

/// Summary of the promotion stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromotionReport {
    /// Number of files uploaded.
    pub uploaded: usize,
    /// Result of the latest-release decision.
    pub latest: LatestOutcome,
    /// Result of removing the sentinel asset.
    pub sentinel: AssetRemoval,
}

/// Upload every file in the bundle, replacing existing assets.
///
/// # Errors
///
/// Returns the hosting error if the upload fails.
pub fn upload_bundle(host: &dyn ReleaseHost, tag: &ReleaseTag, bundle: &ArtefactBundle) -> Result<usize> {
    let files = bundle.upload_list();
    info!("uploading {} files to {tag}", files.len());
    host.upload_assets(tag.as_str(), &files)?;
    Ok(files.len())
}

/// Whether `tag` should become the latest release.
///
/// The first entry of a one-item listing is taken as the newest release.
/// This relies on the service listing newest first. Tags with a
/// pre-release suffix never qualify.
///
/// # Errors
///
/// Returns the hosting error if the listing fails.
pub fn qualifies_as_latest(host: &dyn ReleaseHost, tag: &ReleaseTag) -> Result<bool> {
    if tag.has_prerelease_suffix() {
        return Ok(false);
    }
    let newest = host.list_releases(1)?;
    Ok(newest
        .first()
        .is_some_and(|release| release.tag_name == tag.as_str()))
}

/// Upload the bundle, settle the latest marker and remove the sentinel.
///
/// # Errors
///
/// Returns the first hosting error; later steps are not attempted. In
/// [`RunMode::Automated`] a sentinel that is already gone is
/// [`PublisherError::SentinelConsumed`]; local runs only warn.
pub fn promote(
    host: &dyn ReleaseHost,
    tag: &ReleaseTag,
    bundle: &ArtefactBundle,
    sentinel: &str,
    promote_latest: bool,
    mode: RunMode,
) -> Result<PromotionReport> {
    let uploaded = upload_bundle(host, tag, bundle)?;

    let latest = if !qualifies_as_latest(host, tag)? {
        LatestOutcome::NotLatest
    } else if promote_latest {
        host.set_prerelease(tag.as_str(), false, true)?;
        info!("marked {tag} as the latest release");
        LatestOutcome::Promoted
    } else {
        warn!(
            "{tag} qualifies as the latest release but promotion is disabled; \
             pass --promote-latest or mark it latest by hand"
        );
        LatestOutcome::Deferred
    };

    let removal = host.delete_asset(tag.as_str(), sentinel)?;
    match removal {
        AssetRemoval::Removed => info!("removed sentinel {sentinel} from {tag}"),
        AssetRemoval::AlreadyAbsent if mode.is_automated() => {
            return Err(PublisherError::SentinelConsumed {
                tag: tag.to_string(),
                sentinel: sentinel.to_owned(),
            });
        }
        AssetRemoval::AlreadyAbsent => warn!("{tag} carried no {sentinel} asset; nothing to remove"),
    }

    Ok(PromotionReport {
        uploaded,
        latest,
        sentinel: removal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::ChecksumManifest;
    use crate::hosting::MockReleaseHost;
    use crate::release::ReleaseSummary;
    use camino::Utf8PathBuf;
    use mockall::Sequence;
    use rstest::rstest;

    const SENTINEL: &str = "prerelease-pending";

    fn bundle() -> ArtefactBundle {
        ArtefactBundle {
            manifest: Utf8PathBuf::from("dist/widget_1.2.0_manifest.json"),
            checksums: Utf8PathBuf::from("dist/widget_1.2.0_SHA256SUMS"),
            signature: Utf8PathBuf::from("dist/widget_1.2.0_SHA256SUMS.sig"),
            archives: vec![Utf8PathBuf::from("dist/widget_1.2.0_linux_amd64.zip")],
            checksum_manifest: ChecksumManifest::default(),
        }
    }

    fn tag(value: &str) -> ReleaseTag {
        ReleaseTag::try_from(value).expect("valid tag")
    }

    fn newest(tag_name: &'static str) -> Vec<ReleaseSummary> {
        vec![ReleaseSummary {
            tag_name: tag_name.to_owned(),
            is_prerelease: true,
            created_at: None,
        }]
    }

    #[rstest]
    #[case::newest_final("v1.2.0", "v1.2.0", true)]
    #[case::older_final("v1.2.0", "v1.3.0", false)]
    fn latest_requires_newest_listing_entry(
        #[case] current: &str,
        #[case] listed: &'static str,
        #[case] expected: bool,
    ) {
        let mut host = MockReleaseHost::new();
        host.expect_list_releases()
            .withf(|limit| *limit == 1)
            .returning(move |_| Ok(newest(listed)));

        assert_eq!(qualifies_as_latest(&host, &tag(current)).expect("listing"), expected);
    }

    #[test]
    fn prerelease_suffix_never_qualifies() {
        let mut host = MockReleaseHost::new();
        host.expect_list_releases().never();

        assert!(!qualifies_as_latest(&host, &tag("v1.2.0-rc.1")).expect("no listing"));
    }

    #[test]
    fn empty_listing_does_not_qualify() {
        let mut host = MockReleaseHost::new();
        host.expect_list_releases().returning(|_| Ok(Vec::new()));

        assert!(!qualifies_as_latest(&host, &tag("v1.2.0")).expect("listing"));
    }

    #[test]
    fn promotion_is_deferred_by_default() {
        let mut host = MockReleaseHost::new();
        let mut order = Sequence::new();
        host.expect_upload_assets()
            .withf(|tag, files| tag == "v1.2.0" && files.len() == 4)
            .times(1)
            .in_sequence(&mut order)
            .returning(|_, _| Ok(()));
        host.expect_list_releases()
            .times(1)
            .in_sequence(&mut order)
            .returning(|_| Ok(newest("v1.2.0")));
        host.expect_set_prerelease().never();
        host.expect_delete_asset()
            .withf(|tag, asset| tag == "v1.2.0" && asset == SENTINEL)
            .times(1)
            .in_sequence(&mut order)
            .returning(|_, _| Ok(AssetRemoval::Removed));

        let report = promote(&host, &tag("v1.2.0"), &bundle(), SENTINEL, false, RunMode::Automated)
            .expect("promoted");

        assert_eq!(
            report,
            PromotionReport {
                uploaded: 4,
                latest: LatestOutcome::Deferred,
                sentinel: AssetRemoval::Removed,
            }
        );
    }

    #[test]
    fn opt_in_marks_release_latest() {
        let mut host = MockReleaseHost::new();
        host.expect_upload_assets().returning(|_, _| Ok(()));
        host.expect_list_releases().returning(|_| Ok(newest("v1.2.0")));
        host.expect_set_prerelease()
            .withf(|tag, prerelease, latest| tag == "v1.2.0" && !*prerelease && *latest)
            .times(1)
            .returning(|_, _, _| Ok(()));
        host.expect_delete_asset()
            .returning(|_, _| Ok(AssetRemoval::AlreadyAbsent));

        let report = promote(&host, &tag("v1.2.0"), &bundle(), SENTINEL, true, RunMode::Local)
            .expect("promoted");

        assert_eq!(report.latest, LatestOutcome::Promoted);
        assert_eq!(report.sentinel, AssetRemoval::AlreadyAbsent);
    }

    #[test]
    fn upload_failure_stops_promotion() {
        let mut host = MockReleaseHost::new();
        host.expect_upload_assets().returning(|tag, _| {
            Err(PublisherError::Hosting {
                operation: "upload",
                target: tag.to_owned(),
                message: "HTTP 502".to_owned(),
            })
        });
        host.expect_list_releases().never();
        host.expect_delete_asset().never();

        let err = promote(&host, &tag("v1.2.0"), &bundle(), SENTINEL, false, RunMode::Automated)
            .expect_err("upload fails");

        assert!(matches!(err, PublisherError::Hosting { operation: "upload", .. }));
    }

    #[test]
    fn automated_run_fails_when_sentinel_already_gone() {
        let mut host = MockReleaseHost::new();
        host.expect_upload_assets().returning(|_, _| Ok(()));
        host.expect_list_releases().returning(|_| Ok(newest("v1.3.0")));
        host.expect_delete_asset()
            .times(1)
            .returning(|_, _| Ok(AssetRemoval::AlreadyAbsent));

        let err = promote(&host, &tag("v1.2.0"), &bundle(), SENTINEL, false, RunMode::Automated)
            .expect_err("sentinel was consumed");

        assert!(matches!(
            err,
            PublisherError::SentinelConsumed { ref tag, ref sentinel }
                if tag == "v1.2.0" && sentinel == SENTINEL
        ));
    }
}
