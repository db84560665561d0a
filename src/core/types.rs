use serde::{Deserialize, Serialize};

/// Process-local identifier for an entry in the catalog tree.
///
/// Ids are assigned when a catalog is loaded or an entry is added and are
/// never written to disk. Front-ends hold ids instead of references into
/// the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub u64);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Discriminator persisted in the `type` field of each entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Catalogs written before folders existed carry no discriminator
    #[default]
    Tool,
    Folder,
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tool => write!(f, "tool"),
            Self::Folder => write!(f, "folder"),
        }
    }
}

/// The list an operation works on: the root list or one folder's children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    Root,
    Folder(EntryId),
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::Folder(id) => write!(f, "folder {id}"),
        }
    }
}
