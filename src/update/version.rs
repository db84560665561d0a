use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Empty version string")]
    Empty,

    #[error("Invalid version {version:?}: component {component:?} is not a non-negative integer")]
    InvalidComponent { version: String, component: String },
}

/// A dotted numeric release version such as `1.2.0` or `v2.10`.
///
/// Versions compare component by component with missing trailing
/// components read as zero. When that comparison is a tie, the version
/// spelled with more components is the newer one, so `1.2.0 > 1.2` while
/// `v1.0.0 == 1.0.0`.
#[derive(Debug, Clone)]
pub struct Version {
    components: Vec<u64>,
    raw: String,
}

impl Version {
    /// Parse a version, stripping one leading `v` or `V`.
    ///
    /// # Errors
    ///
    /// Returns `VersionError::Empty` for a blank string and
    /// `VersionError::InvalidComponent` if any dot-separated part is not made
    /// of ASCII digits (or does not fit in a `u64`).
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        let body = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        if body.is_empty() {
            return Err(VersionError::Empty);
        }

        let components = body
            .split('.')
            .map(|part| {
                let invalid = || VersionError::InvalidComponent {
                    version: input.to_string(),
                    component: part.to_string(),
                };
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                part.parse::<u64>().map_err(|_| invalid())
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            components,
            raw: trimmed.to_string(),
        })
    }

    #[must_use]
    pub fn components(&self) -> &[u64] {
        &self.components
    }

    /// The version as it was given, minus surrounding whitespace
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        (0..len)
            .map(|i| {
                let a = self.components.get(i).copied().unwrap_or(0);
                let b = other.components.get(i).copied().unwrap_or(0);
                a.cmp(&b)
            })
            .find(|ord| ord.is_ne())
            .unwrap_or_else(|| self.components.len().cmp(&other.components.len()))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Eq for Version {}

/// Whether `remote` is strictly newer than `current`. Identical versions
/// (after stripping the prefix) are not.
///
/// # Errors
///
/// Returns a `VersionError` if either string is not a valid version.
pub fn is_newer(remote: &str, current: &str) -> Result<bool, VersionError> {
    Ok(Version::parse(remote)? > Version::parse(current)?)
}
