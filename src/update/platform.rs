use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::metadata::Asset;
use super::UpdateError;

/// Operating system family used to pick a release asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    MacOs,
    Windows,
    Linux,
}

impl Platform {
    /// The platform this binary was built for, if it is one we ship assets for
    #[must_use]
    pub fn current() -> Option<Self> {
        match std::env::consts::OS {
            "macos" => Some(Self::MacOs),
            "windows" => Some(Self::Windows),
            "linux" => Some(Self::Linux),
            _ => None,
        }
    }

    /// Substrings that mark an asset name as built for this platform
    #[must_use]
    pub fn markers(self) -> &'static [&'static str] {
        match self {
            Self::MacOs => &["mac", "darwin", "osx"],
            Self::Windows => &["win"],
            Self::Linux => &["linux"],
        }
    }

    /// Whether an asset name carries one of this platform's markers.
    ///
    /// Matching ignores case. The `win` inside `darwin` does not count.
    #[must_use]
    pub fn matches_asset_name(self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        let name = match self {
            Self::Windows => name.replace("darwin", ""),
            _ => name,
        };
        self.markers().iter().any(|marker| name.contains(marker))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MacOs => write!(f, "macos"),
            Self::Windows => write!(f, "windows"),
            Self::Linux => write!(f, "linux"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "macos" | "mac" | "darwin" | "osx" => Ok(Self::MacOs),
            "windows" | "win" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            other => Err(format!(
                "Unknown platform '{other}' (expected macos, windows or linux)"
            )),
        }
    }
}

/// Pick the first asset built for `platform`.
///
/// # Errors
///
/// Returns `UpdateError::NoMatchingAsset` listing the available names when
/// nothing matches.
pub fn select_asset(assets: &[Asset], platform: Platform) -> Result<&Asset, UpdateError> {
    assets
        .iter()
        .find(|asset| platform.matches_asset_name(&asset.name))
        .ok_or_else(|| UpdateError::NoMatchingAsset {
            platform,
            available: assets.iter().map(|a| a.name.clone()).collect(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assets(names: &[&str]) -> Vec<Asset> {
        names
            .iter()
            .map(|name| Asset {
                name: (*name).to_string(),
                download_url: format!("https://downloads.example/{name}"),
                size_bytes: None,
                digest: None,
            })
            .collect()
    }

    #[test]
    fn test_no_matching_asset_for_linux() {
        let list = assets(&["app-win.zip", "app-mac.zip"]);
        let err = select_asset(&list, Platform::Linux).unwrap_err();
        match err {
            UpdateError::NoMatchingAsset { platform, available } => {
                assert_eq!(platform, Platform::Linux);
                assert_eq!(available, ["app-win.zip", "app-mac.zip"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_first_match_wins() {
        let list = assets(&["app-linux-arm64.tar.gz", "app-linux-x64.tar.gz"]);
        let asset = select_asset(&list, Platform::Linux).unwrap();
        assert_eq!(asset.name, "app-linux-arm64.tar.gz");
    }

    #[test]
    fn test_markers_ignore_case() {
        let list = assets(&["Tool-Shelf-Windows.ZIP", "Tool-Shelf-MacOS.dmg"]);
        assert_eq!(select_asset(&list, Platform::Windows).unwrap().name, "Tool-Shelf-Windows.ZIP");
        assert_eq!(select_asset(&list, Platform::MacOs).unwrap().name, "Tool-Shelf-MacOS.dmg");
    }

    #[test]
    fn test_darwin_is_not_windows() {
        let list = assets(&["app-darwin-universal.tar.gz", "app-win64.zip"]);
        assert_eq!(select_asset(&list, Platform::Windows).unwrap().name, "app-win64.zip");
        assert_eq!(
            select_asset(&list, Platform::MacOs).unwrap().name,
            "app-darwin-universal.tar.gz"
        );
    }

    #[test]
    fn test_parse_platform() {
        assert_eq!("Darwin".parse::<Platform>().unwrap(), Platform::MacOs);
        assert_eq!("win".parse::<Platform>().unwrap(), Platform::Windows);
        assert!("solaris".parse::<Platform>().is_err());
    }
}
