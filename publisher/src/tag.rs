//! Release tag newtype.
//!
//! Tags have the shape `vMAJOR.MINOR.PATCH[-PRERELEASE]`. The version part is
//! validated with `semver`, and the leading `v` is stripped to produce the
//! `{version}` used in artefact names.

use crate::error::{PublisherError, Result};
use semver::Version;
use std::fmt;

/// A validated release tag such as `v1.4.0` or `v2.0.0-rc.1`.
///
/// # Examples
///
/// ```
/// use release_publisher::tag::ReleaseTag;
///
/// let tag = ReleaseTag::try_from("v2.0.0-rc.1").unwrap();
/// assert_eq!(tag.version(), "2.0.0-rc.1");
/// assert!(tag.has_prerelease_suffix());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseTag(String);

impl ReleaseTag {
    /// The tag exactly as it appears in version control.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The version part, without the leading `v`.
    #[must_use]
    pub fn version(&self) -> &str {
        self.0.strip_prefix('v').unwrap_or(&self.0)
    }

    /// True when the tag carries a semantic pre-release identifier.
    ///
    /// The check is purely textual: any hyphen marks the tag as a
    /// pre-release, which is what decides whether it may become "latest".
    #[must_use]
    pub fn has_prerelease_suffix(&self) -> bool {
        self.0.contains('-')
    }
}

impl TryFrom<&str> for ReleaseTag {
    type Error = PublisherError;

    fn try_from(value: &str) -> Result<Self> {
        validate_tag(value)?;
        Ok(Self(value.to_owned()))
    }
}

impl TryFrom<String> for ReleaseTag {
    type Error = PublisherError;

    fn try_from(value: String) -> Result<Self> {
        validate_tag(&value)?;
        Ok(Self(value))
    }
}

impl AsRef<str> for ReleaseTag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_tag(value: &str) -> Result<()> {
    let invalid = |reason: String| PublisherError::InvalidTag {
        value: value.to_owned(),
        reason,
    };

    let Some(version) = value.strip_prefix('v') else {
        return Err(invalid("tags must start with 'v'".to_owned()));
    };
    let parsed = Version::parse(version).map_err(|e| invalid(e.to_string()))?;
    if !parsed.build.is_empty() {
        return Err(invalid("build metadata is not allowed in release tags".to_owned()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::stable("v1.2.3", "1.2.3", false)]
    #[case::release_candidate("v0.9.0-rc.1", "0.9.0-rc.1", true)]
    #[case::alpha("v3.0.0-alpha", "3.0.0-alpha", true)]
    fn accepts_semantic_version_tags(
        #[case] raw: &str,
        #[case] version: &str,
        #[case] prerelease: bool,
    ) {
        let tag = ReleaseTag::try_from(raw).expect("valid tag");
        assert_eq!(tag.as_str(), raw);
        assert_eq!(tag.version(), version);
        assert_eq!(tag.has_prerelease_suffix(), prerelease);
    }

    #[rstest]
    #[case::missing_prefix("1.2.3")]
    #[case::two_components("v1.2")]
    #[case::empty("")]
    #[case::words("vnext")]
    #[case::build_metadata("v1.2.3+build.5")]
    fn rejects_malformed_tags(#[case] raw: &str) {
        let err = ReleaseTag::try_from(raw).expect_err("tag should be rejected");
        assert!(matches!(err, PublisherError::InvalidTag { .. }));
    }

    #[test]
    fn display_round_trips_the_original_text() {
        let tag = ReleaseTag::try_from(String::from("v10.0.1")).expect("valid tag");
        assert_eq!(tag.to_string(), "v10.0.1");
    }
}
