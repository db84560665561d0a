use std::path::Path;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, info};

use crate::core::entry::{CatalogEntry, EntryChanges, EntryDraft};
use crate::core::icon::IconSource;
use crate::core::types::{EntryId, Scope};
use crate::utils::validation::{normalize_field, ValidationError};

use super::persistence::{self, CatalogLocation, PersistenceError};
use super::query;
use super::tree::Catalog;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Entry {0} not found")]
    NotFound(EntryId),

    #[error("Entry {0} is not a folder")]
    NotAFolder(EntryId),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Store behind a single lock, for front-ends that touch the catalog from
/// more than one thread
pub type SharedCatalogStore = Arc<Mutex<CatalogStore>>;

/// Owns the catalog tree and its persisted copy.
///
/// Every mutation is applied in memory and then written out in full. When
/// the write fails the error is returned and memory stays ahead of disk;
/// the next successful save catches the file up.
#[derive(Debug)]
pub struct CatalogStore {
    location: CatalogLocation,
    catalog: Catalog,
    next_id: u64,
}

impl CatalogStore {
    /// Load the catalog, copying the defaults into place on first run.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Persistence` if the defaults cannot be written
    /// or the file cannot be read or parsed. A corrupt file is left alone.
    pub fn open(location: CatalogLocation) -> Result<Self, CatalogError> {
        let mut store = Self {
            location,
            catalog: Catalog::new(),
            next_id: 1,
        };
        store.reload()?;
        Ok(store)
    }

    /// Open the standard catalog file inside `dir`
    ///
    /// # Errors
    ///
    /// See [`CatalogStore::open`].
    pub fn open_in(dir: impl AsRef<Path>) -> Result<Self, CatalogError> {
        Self::open(CatalogLocation::in_dir(dir))
    }

    /// Re-read the catalog from disk, discarding in-memory state.
    ///
    /// Ids handed out before the reload no longer refer to anything.
    ///
    /// # Errors
    ///
    /// See [`CatalogStore::open`]. On error the current tree is kept.
    pub fn reload(&mut self) -> Result<(), CatalogError> {
        if persistence::bootstrap(&self.location)? {
            info!(
                "Copied default catalog to {}",
                self.location.path.display()
            );
        }

        let mut catalog = persistence::read_catalog(&self.location.path)?;
        catalog.assign_ids(&mut self.next_id);
        info!(
            "Loaded {} catalog entries from {}",
            catalog.len(),
            self.location.path.display()
        );
        self.catalog = catalog;
        Ok(())
    }

    /// Write the whole catalog to disk.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Persistence` if the file cannot be written.
    pub fn save(&self) -> Result<(), CatalogError> {
        persistence::write_catalog(&self.location.path, &self.catalog)?;
        debug!("Saved catalog to {}", self.location.path.display());
        Ok(())
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.location.path
    }

    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<&CatalogEntry> {
        self.catalog.get(id)
    }

    /// Id of the entry at a path of names from the root
    #[must_use]
    pub fn resolve_path<S: AsRef<str>>(&self, names: &[S]) -> Option<EntryId> {
        self.catalog.resolve_path(names)
    }

    /// Direct children of a scope in display order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` or `CatalogError::NotAFolder` for a
    /// bad folder scope.
    pub fn list(&self, scope: Scope) -> Result<Vec<&CatalogEntry>, CatalogError> {
        Ok(query::display_order(self.catalog.scope(scope)?))
    }

    /// Entries of a scope matching `query`, in display order.
    ///
    /// # Errors
    ///
    /// Same as [`CatalogStore::list`].
    pub fn search(&self, scope: Scope, query: &str) -> Result<Vec<&CatalogEntry>, CatalogError> {
        Ok(query::search(self.catalog.scope(scope)?, query))
    }

    /// Which icon a front-end should draw for an entry
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the entry is gone.
    pub fn resolve_icon(&self, id: EntryId, resource_root: &Path) -> Result<IconSource, CatalogError> {
        let entry = self.catalog.get(id).ok_or(CatalogError::NotFound(id))?;
        Ok(IconSource::resolve(entry, resource_root))
    }

    /// Append a new entry to `parent` and persist.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for a blank name or tool URL and
    /// a scope error for a bad parent; the catalog is unchanged in both
    /// cases. Persistence errors are returned after the entry was added.
    pub fn add(&mut self, parent: Scope, draft: EntryDraft) -> Result<EntryId, CatalogError> {
        let id = EntryId(self.next_id);
        let entry = draft.into_entry(id)?;
        let list = self.catalog.scope_mut(parent)?;
        list.push(entry);
        self.next_id += 1;
        info!("Added {} to {}", id, parent);

        self.save()?;
        Ok(id)
    }

    /// Apply field changes (and possibly a variant conversion) and persist.
    ///
    /// Converting a folder to a tool discards its children.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the entry is gone, or
    /// `CatalogError::Validation` if the result would be invalid; the entry
    /// is unchanged in both cases.
    pub fn edit(&mut self, id: EntryId, changes: EntryChanges) -> Result<(), CatalogError> {
        let entry = self.catalog.get_mut(id).ok_or(CatalogError::NotFound(id))?;
        changes.apply(entry)?;
        debug!("Edited {}", id);

        self.save()
    }

    /// Remove an entry, and everything below it, and persist.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the entry is not in the tree.
    pub fn delete(&mut self, id: EntryId) -> Result<CatalogEntry, CatalogError> {
        let removed = self.catalog.remove(id).ok_or(CatalogError::NotFound(id))?;
        info!("Deleted {} ({})", id, removed.name);

        self.save()?;
        Ok(removed)
    }

    /// Set the icon of a tool or folder and persist. An empty path clears it.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the entry is not in the tree.
    pub fn change_icon(&mut self, id: EntryId, icon_path: &str) -> Result<(), CatalogError> {
        let entry = self.catalog.get_mut(id).ok_or(CatalogError::NotFound(id))?;
        entry.set_icon_path(normalize_field(icon_path));
        debug!("Changed icon of {}", id);

        self.save()
    }

    /// Wrap the store for shared, lock-serialized access
    #[must_use]
    pub fn into_shared(self) -> SharedCatalogStore {
        Arc::new(Mutex::new(self))
    }
}
