//! Release checks and update downloads.
//!
//! An [`UpdateChecker`](checker::UpdateChecker) asks a metadata endpoint for
//! the latest release, compares its version against the running one, and
//! picks the asset built for this platform. Downloading that asset is a
//! separate, opt-in step that streams to disk with progress reports.
//!
//! Both steps are async, honor a [`CancellationToken`] and bounded
//! timeouts, and never retry on their own.
//!
//! ```rust,no_run
//! use tokio_util::sync::CancellationToken;
//! use tool_shelf::update::checker::{CheckOutcome, UpdateChecker, UpdateConfig};
//!
//! # async fn run() -> Result<(), tool_shelf::update::UpdateError> {
//! let checker = UpdateChecker::new(UpdateConfig::new("https://example.com/latest.json"))?;
//! let cancel = CancellationToken::new();
//!
//! if let CheckOutcome::Available(info) = checker.check_for_update(&cancel).await? {
//!     let dest = std::env::temp_dir().join(&info.asset.name);
//!     checker
//!         .download(&info.asset, &dest, &cancel, |done, total| {
//!             println!("{done}/{}", total.map_or(-1, i128::from));
//!         })
//!         .await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

use std::time::Duration;

use thiserror::Error;

use crate::utils::validation::ValidationError;

pub mod checker;
pub mod download;
pub mod metadata;
pub mod platform;
pub mod transport;
pub mod version;

use download::DownloadError;
use metadata::MetadataError;
use platform::Platform;
use transport::TransportError;
use version::VersionError;

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("Update check failed: {0}")]
    Check(#[source] TransportError),

    #[error("Update check failed: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Update check failed: {0}")]
    Version(#[from] VersionError),

    #[error("No release asset for {platform} (available: {})", .available.join(", "))]
    NoMatchingAsset {
        platform: Platform,
        available: Vec<String>,
    },

    #[error("No release assets are published for this operating system ({0})")]
    UnsupportedPlatform(String),

    #[error("Download of {asset} failed: {source}")]
    Download {
        asset: String,
        #[source]
        source: DownloadError,
    },

    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    #[error("Cannot {action} while the update session is {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },

    #[error("Invalid asset name: {0}")]
    InvalidAssetName(#[source] ValidationError),
}

impl UpdateError {
    /// Surface transport timeouts as `Timeout`; everything else goes
    /// through `otherwise`
    pub(crate) fn from_transport(
        operation: &str,
        err: TransportError,
        otherwise: impl FnOnce(TransportError) -> Self,
    ) -> Self {
        match err {
            TransportError::Timeout { url, after } => Self::Timeout {
                operation: format!("{operation} against {url}"),
                after,
            },
            other => otherwise(other),
        }
    }
}
