//! Reading and writing the catalog file.
//!
//! Saves go through a temporary file in the destination directory that is
//! renamed over the catalog, so a crash mid-write never leaves a truncated
//! catalog behind. First-run bootstrap copies the bundled default catalog
//! with the same mechanism and never replaces an existing file.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::tree::Catalog;

/// File name of the catalog inside the data directory
pub const CATALOG_FILE_NAME: &str = "ai_tools.json";

/// Factory-default catalog, validated at build time by `build.rs`
const EMBEDDED_CATALOG: &str = include_str!("../../catalogs/default_tools.json");

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to read catalog {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Catalog {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write catalog {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize catalog: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Source of the catalog copied into place on first run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DefaultDataset {
    /// The catalog compiled into the binary
    #[default]
    Embedded,
    /// Caller-supplied JSON text
    Text(String),
    /// Start with an empty catalog
    Empty,
}

impl DefaultDataset {
    /// Raw JSON of the default catalog
    #[must_use]
    pub fn contents(&self) -> &str {
        match self {
            Self::Embedded => EMBEDDED_CATALOG,
            Self::Text(text) => text,
            Self::Empty => "[]",
        }
    }
}

/// Where the catalog lives and what to seed it with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogLocation {
    pub path: PathBuf,
    pub defaults: DefaultDataset,
}

impl CatalogLocation {
    /// The standard catalog file inside `dir`, seeded from the embedded defaults
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CATALOG_FILE_NAME),
            defaults: DefaultDataset::Embedded,
        }
    }

    /// An explicit catalog file, seeded from the embedded defaults
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            defaults: DefaultDataset::Embedded,
        }
    }

    #[must_use]
    pub fn with_defaults(mut self, defaults: DefaultDataset) -> Self {
        self.defaults = defaults;
        self
    }
}

/// Copy the default catalog to `location.path` unless a file is already there.
///
/// Returns `true` if the defaults were written. Safe to call on every start.
///
/// # Errors
///
/// Returns `PersistenceError::Write` if the directory or file cannot be created.
pub fn bootstrap(location: &CatalogLocation) -> Result<bool, PersistenceError> {
    let path = &location.path;
    if path.exists() {
        return Ok(false);
    }

    let write_err = |source| PersistenceError::Write {
        path: path.clone(),
        source,
    };

    let mut temp = temp_file_beside(path).map_err(write_err)?;
    temp.write_all(location.defaults.contents().as_bytes())
        .and_then(|()| temp.as_file().sync_all())
        .map_err(write_err)?;

    match temp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        // Somebody else created it in the meantime; theirs wins
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(write_err(e.error)),
    }
}

/// Read and parse the catalog file.
///
/// # Errors
///
/// Returns `PersistenceError::Read` if the file cannot be read, or
/// `PersistenceError::Corrupt` if it is not a valid catalog.
pub fn read_catalog(path: &Path) -> Result<Catalog, PersistenceError> {
    let content = fs::read_to_string(path).map_err(|source| PersistenceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_catalog(&content).map_err(|source| PersistenceError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse catalog JSON, tolerating a UTF-8 byte order mark.
///
/// # Errors
///
/// Returns the underlying `serde_json` error if the text is not a valid catalog.
pub fn parse_catalog(content: &str) -> Result<Catalog, serde_json::Error> {
    serde_json::from_str(content.trim_start_matches('\u{feff}'))
}

/// Atomically replace the catalog file with `catalog`.
///
/// # Errors
///
/// Returns `PersistenceError::Write` on any I/O failure, in which case the
/// previous file is left as it was.
pub fn write_catalog(path: &Path, catalog: &Catalog) -> Result<(), PersistenceError> {
    let write_err = |source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut temp = temp_file_beside(path).map_err(write_err)?;
    {
        let mut writer = BufWriter::new(&mut temp);
        serde_json::to_writer_pretty(&mut writer, catalog).map_err(PersistenceError::Serialize)?;
        writer.write_all(b"\n").map_err(write_err)?;
        writer.flush().map_err(write_err)?;
    }
    temp.as_file().sync_all().map_err(write_err)?;
    temp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Create a temporary file in the same directory as `path` so the final
/// rename stays on one filesystem.
fn temp_file_beside(path: &Path) -> io::Result<tempfile::NamedTempFile> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    tempfile::Builder::new()
        .prefix(".catalog-")
        .suffix(".tmp")
        .tempfile_in(dir)
}
