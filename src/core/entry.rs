use serde::{Deserialize, Serialize, Serializer};

use crate::core::types::{EntryId, EntryType};
use crate::utils::validation::{normalize_field, require_field, ValidationError};

/// A node in the catalog tree: a tool shortcut or a folder of entries
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawEntry")]
pub struct CatalogEntry {
    /// Assigned by the store on load/add, never persisted
    id: EntryId,

    /// Display name and sort key (never empty)
    pub name: String,

    /// Free-form description (may be empty)
    pub description: String,

    /// Feature summary (may be empty)
    pub features: String,

    /// Variant-specific fields
    pub kind: EntryKind,
}

/// Variant-specific fields of an entry
#[derive(Debug, Clone, PartialEq)]
pub enum EntryKind {
    Tool {
        /// Target opened when the tool is launched (never empty)
        url: String,
        /// Empty means "use a generated glyph"
        icon_path: String,
    },
    Folder {
        /// Ordered children in insertion order
        children: Vec<CatalogEntry>,
        /// Empty means "use the folder glyph"
        icon_path: String,
    },
}

impl CatalogEntry {
    /// Build an entry from its parts, validating the required fields.
    pub(crate) fn from_parts(
        id: EntryId,
        name: String,
        description: String,
        features: String,
        kind: EntryKind,
    ) -> Result<Self, ValidationError> {
        require_field("name", &name)?;
        if let EntryKind::Tool { url, .. } = &kind {
            require_field("url", url)?;
        }
        Ok(Self {
            id,
            name,
            description,
            features,
            kind,
        })
    }

    #[must_use]
    pub fn id(&self) -> EntryId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: EntryId) {
        self.id = id;
    }

    #[must_use]
    pub fn entry_type(&self) -> EntryType {
        match self.kind {
            EntryKind::Tool { .. } => EntryType::Tool,
            EntryKind::Folder { .. } => EntryType::Folder,
        }
    }

    #[must_use]
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, EntryKind::Folder { .. })
    }

    /// URL of a tool, `None` for folders
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match &self.kind {
            EntryKind::Tool { url, .. } => Some(url),
            EntryKind::Folder { .. } => None,
        }
    }

    /// Stored icon path; empty when none is set
    #[must_use]
    pub fn icon_path(&self) -> &str {
        match &self.kind {
            EntryKind::Tool { icon_path, .. } | EntryKind::Folder { icon_path, .. } => icon_path,
        }
    }

    pub(crate) fn set_icon_path(&mut self, path: String) {
        match &mut self.kind {
            EntryKind::Tool { icon_path, .. } | EntryKind::Folder { icon_path, .. } => {
                *icon_path = path;
            }
        }
    }

    /// Children of a folder, `None` for tools
    #[must_use]
    pub fn children(&self) -> Option<&[CatalogEntry]> {
        match &self.kind {
            EntryKind::Folder { children, .. } => Some(children),
            EntryKind::Tool { .. } => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<CatalogEntry>> {
        match &mut self.kind {
            EntryKind::Folder { children, .. } => Some(children),
            EntryKind::Tool { .. } => None,
        }
    }

    /// Case-insensitive substring match against this entry's own fields.
    ///
    /// `needle` must already be lowercase. Folders match on their common
    /// fields only, never on their descendants.
    #[must_use]
    pub fn matches(&self, needle: &str) -> bool {
        let hit = |field: &str| field.to_lowercase().contains(needle);
        hit(&self.name)
            || hit(&self.description)
            || hit(&self.features)
            || self.url().is_some_and(hit)
    }

    /// Number of entries in this subtree, including this one
    #[must_use]
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children()
            .map_or(0, |c| c.iter().map(CatalogEntry::subtree_len).sum())
    }
}

/// Entries are equal when their persisted content is equal; ids are ignored.
impl PartialEq for CatalogEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.features == other.features
            && self.kind == other.kind
    }
}

/// Values for a new entry, as entered by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    pub name: String,
    pub description: String,
    pub features: String,
    pub kind: DraftKind,
}

/// Variant of a new entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftKind {
    Tool { url: String, icon_path: String },
    Folder,
}

impl EntryDraft {
    pub fn tool(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            features: String::new(),
            kind: DraftKind::Tool {
                url: url.into(),
                icon_path: String::new(),
            },
        }
    }

    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            features: String::new(),
            kind: DraftKind::Folder,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_features(mut self, features: impl Into<String>) -> Self {
        self.features = features.into();
        self
    }

    /// Set the icon of a tool draft. Folder drafts ignore it.
    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        if let DraftKind::Tool { icon_path, .. } = &mut self.kind {
            *icon_path = icon.into();
        }
        self
    }

    /// Trim, validate, and turn the draft into an entry.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingField` for a blank name or, for
    /// tools, a blank URL.
    pub(crate) fn into_entry(self, id: EntryId) -> Result<CatalogEntry, ValidationError> {
        let kind = match self.kind {
            DraftKind::Tool { url, icon_path } => EntryKind::Tool {
                url: normalize_field(&url),
                icon_path: normalize_field(&icon_path),
            },
            // A new folder always exposes an (empty) children list
            DraftKind::Folder => EntryKind::Folder {
                children: Vec::new(),
                icon_path: String::new(),
            },
        };
        CatalogEntry::from_parts(
            id,
            normalize_field(&self.name),
            normalize_field(&self.description),
            normalize_field(&self.features),
            kind,
        )
    }
}

/// Field changes applied by an edit. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub features: Option<String>,
    pub url: Option<String>,
    pub icon_path: Option<String>,
    /// Convert the entry to another variant
    pub convert_to: Option<EntryType>,
}

impl EntryChanges {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn features(mut self, features: impl Into<String>) -> Self {
        self.features = Some(features.into());
        self
    }

    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn icon_path(mut self, icon_path: impl Into<String>) -> Self {
        self.icon_path = Some(icon_path.into());
        self
    }

    #[must_use]
    pub fn convert_to(mut self, entry_type: EntryType) -> Self {
        self.convert_to = Some(entry_type);
        self
    }

    /// Apply the changes to `entry` in place.
    ///
    /// Everything is validated before the first field is touched, so a
    /// failed edit leaves the entry unchanged. Converting to a folder drops
    /// the URL and icon and installs an empty children list; converting to
    /// a tool drops the children and requires a URL.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingField` if the resulting entry would
    /// have a blank name or, as a tool, a blank URL.
    pub fn apply(self, entry: &mut CatalogEntry) -> Result<(), ValidationError> {
        let name = self.name.as_deref().map(normalize_field);
        if let Some(name) = &name {
            require_field("name", name)?;
        }

        let target = self.convert_to.unwrap_or_else(|| entry.entry_type());
        let url = self.url.as_deref().map(normalize_field);
        let icon_path = self.icon_path.as_deref().map(normalize_field);

        // Tool targets carry (url, icon); folder targets only an icon
        let (new_kind, folder_icon) = match (target, &entry.kind) {
            (EntryType::Tool, EntryKind::Tool { url: old_url, .. }) => {
                let url = url.unwrap_or_else(|| old_url.clone());
                require_field("url", &url)?;
                (Some((url, icon_path)), None)
            }
            (EntryType::Tool, EntryKind::Folder { .. }) => {
                let url = url.unwrap_or_default();
                require_field("url", &url)?;
                (Some((url, Some(icon_path.unwrap_or_default()))), None)
            }
            (EntryType::Folder, _) => (None, icon_path),
        };

        if let Some(name) = name {
            entry.name = name;
        }
        if let Some(description) = self.description.as_deref() {
            entry.description = normalize_field(description);
        }
        if let Some(features) = self.features.as_deref() {
            entry.features = normalize_field(features);
        }

        match new_kind {
            Some((url, icon)) => {
                let icon = match (&entry.kind, icon) {
                    (_, Some(icon)) => icon,
                    (EntryKind::Tool { icon_path, .. }, None) => icon_path.clone(),
                    (EntryKind::Folder { .. }, None) => String::new(),
                };
                entry.kind = EntryKind::Tool {
                    url,
                    icon_path: icon,
                };
            }
            None => {
                if !entry.is_folder() {
                    entry.kind = EntryKind::Folder {
                        children: Vec::new(),
                        icon_path: String::new(),
                    };
                }
                if let Some(icon) = folder_icon {
                    entry.set_icon_path(icon);
                }
            }
        }

        Ok(())
    }
}

/// On-disk shape of an entry, borrowed for serialization
#[derive(Serialize)]
struct EntryRepr<'a> {
    #[serde(rename = "type")]
    entry_type: EntryType,
    name: &'a str,
    description: &'a str,
    features: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    icon_path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    children: Option<&'a [CatalogEntry]>,
}

impl Serialize for CatalogEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let icon_path = Some(self.icon_path()).filter(|p| !p.is_empty());
        EntryRepr {
            entry_type: self.entry_type(),
            name: &self.name,
            description: &self.description,
            features: &self.features,
            url: self.url(),
            icon_path,
            children: self.children(),
        }
        .serialize(serializer)
    }
}

/// On-disk shape of an entry as read, before validation
#[derive(Deserialize)]
struct RawEntry {
    #[serde(rename = "type", default)]
    entry_type: EntryType,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    features: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    icon_path: Option<String>,
    #[serde(default)]
    children: Option<Vec<CatalogEntry>>,
}

impl TryFrom<RawEntry> for CatalogEntry {
    type Error = ValidationError;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        let icon_path = raw.icon_path.unwrap_or_default();
        let kind = match raw.entry_type {
            EntryType::Tool => EntryKind::Tool {
                url: raw.url.unwrap_or_default(),
                icon_path,
            },
            EntryType::Folder => EntryKind::Folder {
                children: raw.children.unwrap_or_default(),
                icon_path,
            },
        };
        // Ids are handed out by the store once the whole tree is read
        Self::from_parts(
            EntryId(0),
            raw.name,
            raw.description.unwrap_or_default(),
            raw.features.unwrap_or_default(),
            kind,
        )
    }
}
