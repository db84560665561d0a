use std::path::{Path, PathBuf};

use crate::core::entry::CatalogEntry;

/// Prefix marking an icon path as relative to the application resources
pub const RESOURCE_MARKER: &str = "./";

/// Glyph shown for folders without a usable icon
pub const FOLDER_GLYPH: &str = "📁";

/// What a front-end should draw for an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconSource {
    /// An image file that exists on disk
    Image {
        path: PathBuf,
        /// SVG files need a vector renderer
        vector: bool,
    },
    /// No usable image: draw this text instead
    Glyph(String),
}

impl IconSource {
    /// Decide which icon to show for `entry`.
    ///
    /// Paths starting with `./` are resolved against `resource_root`. An
    /// empty path, or one that does not point at an existing file, falls
    /// back to a glyph: the first character of a tool's name, or the folder
    /// glyph.
    #[must_use]
    pub fn resolve(entry: &CatalogEntry, resource_root: &Path) -> Self {
        if let Some(path) = resolve_icon_path(entry.icon_path(), resource_root) {
            if path.is_file() {
                let vector = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("svg"));
                return Self::Image { path, vector };
            }
        }

        if entry.is_folder() {
            Self::Glyph(FOLDER_GLYPH.to_string())
        } else {
            Self::Glyph(entry.name.chars().take(1).collect())
        }
    }
}

impl std::fmt::Display for IconSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image { path, .. } => write!(f, "{}", path.display()),
            Self::Glyph(glyph) => write!(f, "[{glyph}]"),
        }
    }
}

/// Expand a stored icon path into a filesystem path, `None` if empty
#[must_use]
pub fn resolve_icon_path(icon_path: &str, resource_root: &Path) -> Option<PathBuf> {
    if icon_path.is_empty() {
        None
    } else if let Some(relative) = icon_path.strip_prefix(RESOURCE_MARKER) {
        Some(resource_root.join(relative))
    } else {
        Some(PathBuf::from(icon_path))
    }
}
