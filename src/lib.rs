//! # tool-shelf
//!
//! A personal catalog of shortcuts to web tools, organized in folders, with
//! a release update checker.
//!
//! The catalog is a tree: the root list holds tools and folders, and every
//! folder holds more of the same. It lives in a single JSON file in the
//! user's data directory and is rewritten atomically after each change.
//!
//! ## Features
//!
//! - **Folders first**: listings put folders before tools, then sort by name
//! - **Search**: case-insensitive matching on names, descriptions, features and URLs
//! - **Safe saves**: catalog writes go through a temporary file and a rename
//! - **First-run defaults**: a bundled catalog is copied into place once
//! - **Update checks**: static manifests or release-listing APIs, per-platform
//!   asset selection, verified streaming downloads
//!
//! ## Example
//!
//! ```rust,no_run
//! use tool_shelf::{CatalogStore, EntryDraft, Scope};
//!
//! let mut store = CatalogStore::open_in("/tmp/tool-shelf").unwrap();
//! store
//!     .add(Scope::Root, EntryDraft::tool("DeepL", "https://www.deepl.com"))
//!     .unwrap();
//!
//! for entry in store.search(Scope::Root, "deepl").unwrap() {
//!     println!("{} -> {}", entry.name, entry.url().unwrap_or_default());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`catalog`]: The catalog tree, queries and persistence
//! - [`core`]: Entry types, drafts, edits and icon resolution
//! - [`update`]: Version comparison, release metadata and downloads
//! - [`config`]: Data and resource directories
//! - [`cli`]: Command-line interface implementation

pub mod catalog;
pub mod cli;
pub mod config;
pub mod core;
pub mod update;
pub mod utils;

// Re-export commonly used types for convenience
pub use catalog::store::{CatalogError, CatalogStore, SharedCatalogStore};
pub use crate::core::entry::{CatalogEntry, EntryChanges, EntryDraft};
pub use crate::core::types::*;
pub use update::checker::{CheckOutcome, UpdateChecker, UpdateConfig};
pub use update::UpdateError;
