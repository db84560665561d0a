//! Parsing of remote release metadata.
//!
//! Two document shapes are accepted and reduced to a [`RemoteRelease`]:
//!
//! - a static manifest:
//!   `{"version": "1.3.0", "release_notes": "...", "assets": [{"name", "url", "size", "digest"}]}`
//! - a release-listing API response, either one release object
//!   (`tag_name`, `body`, `published_at`, `assets[].browser_download_url`)
//!   or an array of them, newest first. Drafts and pre-releases in an
//!   array are skipped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Invalid metadata JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Metadata must be a release object or a list of releases")]
    UnexpectedShape,

    #[error("Release has no version or tag_name")]
    MissingVersion,

    #[error("Asset '{0}' has no download URL")]
    MissingAssetUrl(String),

    #[error("No published stable release in the list")]
    NoStableRelease,
}

/// A downloadable artifact advertised by a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    pub name: String,
    pub download_url: String,
    /// Declared size, checked after download when present
    pub size_bytes: Option<u64>,
    /// `sha256:<hex>` or `md5:<hex>`, checked after download when present
    pub digest: Option<String>,
}

/// One release as described by the endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteRelease {
    /// Version as published, prefix included (`v1.3.0`)
    pub version: String,
    pub release_notes: String,
    pub published_at: Option<DateTime<Utc>>,
    pub assets: Vec<Asset>,
}

/// A newer release and the asset chosen for this platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateInfo {
    pub version: String,
    pub release_notes: String,
    pub published_at: Option<DateTime<Utc>>,
    pub asset: Asset,
}

#[derive(Deserialize)]
struct RawAsset {
    #[serde(default)]
    name: String,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    browser_download_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    size_bytes: Option<u64>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    digest: Option<String>,
}

#[derive(Deserialize)]
struct RawRelease {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    tag_name: Option<String>,
    #[serde(default)]
    release_notes: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    assets: Vec<RawAsset>,
}

impl TryFrom<RawAsset> for Asset {
    type Error = MetadataError;

    fn try_from(raw: RawAsset) -> Result<Self, Self::Error> {
        // On release APIs `url` is the API resource, so the browser link wins
        let download_url = raw
            .download_url
            .or(raw.browser_download_url)
            .or(raw.url)
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| MetadataError::MissingAssetUrl(raw.name.clone()))?;
        Ok(Self {
            name: raw.name,
            download_url,
            size_bytes: raw.size_bytes.or(raw.size),
            digest: raw.digest.filter(|d| !d.trim().is_empty()),
        })
    }
}

impl TryFrom<RawRelease> for RemoteRelease {
    type Error = MetadataError;

    fn try_from(raw: RawRelease) -> Result<Self, Self::Error> {
        let version = raw
            .version
            .or(raw.tag_name)
            .filter(|v| !v.trim().is_empty())
            .ok_or(MetadataError::MissingVersion)?;
        let assets = raw
            .assets
            .into_iter()
            .map(Asset::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            version,
            release_notes: raw.release_notes.or(raw.body).unwrap_or_default(),
            published_at: raw.published_at,
            assets,
        })
    }
}

impl RemoteRelease {
    /// Pair this release with one of its assets
    #[must_use]
    pub fn into_update_info(self, asset: Asset) -> UpdateInfo {
        UpdateInfo {
            version: self.version,
            release_notes: self.release_notes,
            published_at: self.published_at,
            asset,
        }
    }
}

/// Parse a metadata document into the release it describes.
///
/// # Errors
///
/// Returns a `MetadataError` if the body is not JSON, has an unexpected
/// shape, lacks a version or asset URL, or lists no stable release.
pub fn parse_release(body: &[u8]) -> Result<RemoteRelease, MetadataError> {
    let document: Value = serde_json::from_slice(body)?;
    match document {
        Value::Object(_) => {
            let raw: RawRelease = serde_json::from_value(document)?;
            RemoteRelease::try_from(raw)
        }
        Value::Array(_) => {
            let releases: Vec<RawRelease> = serde_json::from_value(document)?;
            debug!("Release listing with {} entries", releases.len());
            let stable = releases
                .into_iter()
                .find(|r| {
                    let skip = r.draft || r.prerelease;
                    if skip {
                        warn!(
                            "Skipping unpublished release {}",
                            r.tag_name.as_deref().or(r.version.as_deref()).unwrap_or("?")
                        );
                    }
                    !skip
                })
                .ok_or(MetadataError::NoStableRelease)?;
            RemoteRelease::try_from(stable)
        }
        _ => Err(MetadataError::UnexpectedShape),
    }
}
