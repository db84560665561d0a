//! Core data types for the tool catalog.
//!
//! This module provides the fundamental types used throughout the library:
//!
//! - [`CatalogEntry`](entry::CatalogEntry): a tool shortcut or a folder of entries
//! - [`EntryDraft`](entry::EntryDraft) and [`EntryChanges`](entry::EntryChanges):
//!   user input for adding and editing entries
//! - [`EntryId`](types::EntryId), [`EntryType`](types::EntryType), [`Scope`](types::Scope):
//!   identity, discriminator, and the list an operation works on
//! - [`IconSource`](icon::IconSource): which icon a front-end should draw
//!
//! ## On-disk shape
//!
//! | Field        | Tool       | Folder     |
//! |--------------|------------|------------|
//! | `type`       | `"tool"` (default) | `"folder"` |
//! | `name`       | required   | required   |
//! | `description`, `features` | optional | optional |
//! | `url`        | required   | -          |
//! | `icon_path`  | optional   | optional   |
//! | `children`   | -          | list of entries |

pub mod entry;
pub mod icon;
pub mod types;
