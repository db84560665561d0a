//! Filesystem locations used by the application.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use thiserror::Error;

use crate::catalog::persistence::CatalogLocation;

/// Overrides the per-user data directory
pub const DATA_DIR_ENV: &str = "TOOL_SHELF_DATA_DIR";

/// Overrides the metadata endpoint used for update checks
pub const UPDATE_URL_ENV: &str = "TOOL_SHELF_UPDATE_URL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine a per-user data directory; pass --data-dir or set TOOL_SHELF_DATA_DIR")]
    NoDataDir,
}

/// Where the catalog is stored and where bundled resources (`./icon/...`)
/// are looked up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub resource_root: PathBuf,
}

impl AppPaths {
    /// Fill in whatever the caller did not specify with platform defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoDataDir` when no data directory was given and
    /// the platform has no home directory to derive one from.
    pub fn resolve(
        data_dir: Option<PathBuf>,
        resource_root: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => default_data_dir().ok_or(ConfigError::NoDataDir)?,
        };
        Ok(Self {
            data_dir,
            resource_root: resource_root.unwrap_or_else(default_resource_root),
        })
    }

    #[must_use]
    pub fn catalog_location(&self) -> CatalogLocation {
        CatalogLocation::in_dir(&self.data_dir)
    }

    /// Default download directory for update artifacts
    #[must_use]
    pub fn downloads_dir(&self) -> PathBuf {
        self.data_dir.join("updates")
    }
}

/// Per-user configuration directory:
/// `~/.config/tool-shelf` on Linux, `~/Library/Application Support/tool-shelf`
/// on macOS, `%APPDATA%\tool-shelf\config` on Windows
#[must_use]
pub fn default_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "tool-shelf").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Directory holding the executable, falling back to the working directory
#[must_use]
pub fn default_resource_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}
