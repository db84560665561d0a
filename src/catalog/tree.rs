use serde::{Deserialize, Serialize};

use crate::core::entry::CatalogEntry;
use crate::core::types::{EntryId, Scope};

use super::store::CatalogError;

/// The whole catalog: the ordered root list, owning every entry below it.
///
/// Each entry lives in exactly one list (the root or one folder's
/// children). Stored order is insertion order and only matters for the
/// on-disk layout; display order comes from [`super::query`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Root entries in stored order
    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Total number of entries at every depth
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().map(CatalogEntry::subtree_len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find an entry anywhere in the tree
    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<&CatalogEntry> {
        find(&self.entries, id)
    }

    pub(crate) fn get_mut(&mut self, id: EntryId) -> Option<&mut CatalogEntry> {
        find_mut(&mut self.entries, id)
    }

    /// The list a scope refers to, in stored order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the folder id is not in the tree,
    /// or `CatalogError::NotAFolder` if it names a tool.
    pub fn scope(&self, scope: Scope) -> Result<&[CatalogEntry], CatalogError> {
        match scope {
            Scope::Root => Ok(&self.entries),
            Scope::Folder(id) => {
                let entry = self.get(id).ok_or(CatalogError::NotFound(id))?;
                entry.children().ok_or(CatalogError::NotAFolder(id))
            }
        }
    }

    pub(crate) fn scope_mut(
        &mut self,
        scope: Scope,
    ) -> Result<&mut Vec<CatalogEntry>, CatalogError> {
        match scope {
            Scope::Root => Ok(&mut self.entries),
            Scope::Folder(id) => {
                let entry = self.get_mut(id).ok_or(CatalogError::NotFound(id))?;
                entry.children_mut().ok_or(CatalogError::NotAFolder(id))
            }
        }
    }

    /// Detach an entry (and its subtree) from whichever list owns it
    pub(crate) fn remove(&mut self, id: EntryId) -> Option<CatalogEntry> {
        remove_from(&mut self.entries, id)
    }

    /// Walk a path of names from the root, taking the first entry with a
    /// matching name at each level (stored order).
    #[must_use]
    pub fn resolve_path<S: AsRef<str>>(&self, names: &[S]) -> Option<EntryId> {
        let (last, parents) = names.split_last()?;
        let mut list = self.entries.as_slice();
        for name in parents {
            list = list
                .iter()
                .find(|e| e.is_folder() && e.name == name.as_ref())?
                .children()?;
        }
        list.iter()
            .find(|e| e.name == last.as_ref())
            .map(CatalogEntry::id)
    }

    /// Hand out fresh ids to every entry, depth first
    pub(crate) fn assign_ids(&mut self, next_id: &mut u64) {
        assign(&mut self.entries, next_id);
    }
}

fn find(entries: &[CatalogEntry], id: EntryId) -> Option<&CatalogEntry> {
    for entry in entries {
        if entry.id() == id {
            return Some(entry);
        }
        if let Some(found) = entry.children().and_then(|c| find(c, id)) {
            return Some(found);
        }
    }
    None
}

fn find_mut(entries: &mut [CatalogEntry], id: EntryId) -> Option<&mut CatalogEntry> {
    for entry in entries.iter_mut() {
        if entry.id() == id {
            return Some(entry);
        }
        if let Some(children) = entry.children_mut() {
            if let Some(found) = find_mut(children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn remove_from(list: &mut Vec<CatalogEntry>, id: EntryId) -> Option<CatalogEntry> {
    if let Some(pos) = list.iter().position(|e| e.id() == id) {
        return Some(list.remove(pos));
    }
    list.iter_mut()
        .find_map(|e| e.children_mut().and_then(|c| remove_from(c, id)))
}

fn assign(entries: &mut [CatalogEntry], next_id: &mut u64) {
    for entry in entries {
        entry.set_id(EntryId(*next_id));
        *next_id += 1;
        if let Some(children) = entry.children_mut() {
            assign(children, next_id);
        }
    }
}
