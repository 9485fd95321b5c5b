//! Release model as reported by the hosting service.
//!
//! These types mirror the JSON emitted by `gh release view --json` and
//! `gh release list --json`. They are snapshots of external state; the
//! publisher never persists them.

use crate::error::{PublisherError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::cmp::Ordering;
use std::fmt;

/// A single named asset attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    /// The asset's file name.
    pub name: String,
}

impl ReleaseAsset {
    /// Create an asset with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A release fetched by tag, including its asset list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    /// The tag the release is attached to.
    pub tag_name: String,
    /// Whether the service marks the release as non-final.
    pub is_prerelease: bool,
    /// ISO-8601 creation time, if the service reported one.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Assets currently attached to the release.
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

impl Release {
    /// Returns true when an asset with exactly this name is attached.
    #[must_use]
    pub fn has_asset(&self, name: &str) -> bool {
        self.assets.iter().any(|asset| asset.name == name)
    }

    /// A flagged pre-release is marked non-final and still carries the
    /// sentinel asset, meaning the automated flow has not finished with it.
    ///
    /// # Examples
    ///
    /// ```
    /// use release_publisher::release::{Release, ReleaseAsset};
    ///
    /// let release = Release {
    ///     tag_name: "v1.0.0".to_owned(),
    ///     is_prerelease: true,
    ///     created_at: None,
    ///     assets: vec![ReleaseAsset::new("prerelease-pending")],
    /// };
    /// assert!(release.is_flagged_prerelease("prerelease-pending"));
    /// assert!(!release.is_flagged_prerelease("other-marker"));
    /// ```
    #[must_use]
    pub fn is_flagged_prerelease(&self, sentinel: &str) -> bool {
        self.is_prerelease && self.has_asset(sentinel)
    }

    /// Parses the creation timestamp, failing when it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::MissingCreatedAt`] when the service did not
    /// report a timestamp, or [`PublisherError::InvalidTimestamp`] when it
    /// is not valid ISO-8601.
    pub fn created_at(&self) -> Result<CreatedAt> {
        let raw = self
            .created_at
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| PublisherError::MissingCreatedAt {
                tag: self.tag_name.clone(),
            })?;
        CreatedAt::parse(raw)
    }
}

/// One entry of a release listing. Listings do not include assets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSummary {
    /// The tag the release is attached to.
    pub tag_name: String,
    /// Whether the service marks the release as non-final.
    pub is_prerelease: bool,
    /// ISO-8601 creation time, if the service reported one.
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A release creation time, compared by its epoch-seconds value.
#[derive(Debug, Clone, Copy)]
pub struct CreatedAt(DateTime<Utc>);

impl CreatedAt {
    /// Parse an ISO-8601 (RFC 3339) timestamp such as
    /// `2024-05-01T12:00:00Z`.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::InvalidTimestamp`] if the value does not
    /// parse.
    pub fn parse(value: &str) -> Result<Self> {
        DateTime::parse_from_rfc3339(value.trim())
            .map(|parsed| Self(parsed.with_timezone(&Utc)))
            .map_err(|e| PublisherError::InvalidTimestamp {
                value: value.to_owned(),
                reason: e.to_string(),
            })
    }

    /// Seconds since the Unix epoch.
    #[must_use]
    pub fn epoch_seconds(&self) -> i64 {
        self.0.timestamp()
    }
}

impl PartialEq for CreatedAt {
    fn eq(&self, other: &Self) -> bool {
        self.epoch_seconds() == other.epoch_seconds()
    }
}

impl Eq for CreatedAt {}

impl PartialOrd for CreatedAt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CreatedAt {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch_seconds().cmp(&other.epoch_seconds())
    }
}

impl fmt::Display for CreatedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%SZ"))
    }
}
