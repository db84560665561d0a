//! The tool catalog tree, its queries, and its persisted copy.
//!
//! A catalog is an ordered list of root entries, each a tool or a folder
//! holding more entries. [`CatalogStore`](store::CatalogStore) owns the tree
//! and writes the whole of it to a JSON file after every change.
//!
//! ## First run
//!
//! When the catalog file does not exist yet, the default catalog compiled
//! into the binary is copied into place. An existing file is never
//! replaced, and a file that cannot be parsed is reported rather than
//! overwritten.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tool_shelf::catalog::store::CatalogStore;
//! use tool_shelf::core::entry::EntryDraft;
//! use tool_shelf::core::types::Scope;
//!
//! let mut store = CatalogStore::open_in("/tmp/tool-shelf").unwrap();
//!
//! // Add a folder, then a tool inside it
//! let work = store.add(Scope::Root, EntryDraft::folder("Work")).unwrap();
//! store
//!     .add(Scope::Folder(work), EntryDraft::tool("Jira", "https://jira.example"))
//!     .unwrap();
//!
//! // Folders first, then by name
//! for entry in store.list(Scope::Root).unwrap() {
//!     println!("{} {}", entry.entry_type(), entry.name);
//! }
//! ```

pub mod persistence;
pub mod query;
pub mod store;
pub mod tree;
