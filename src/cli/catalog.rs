use anyhow::{bail, Context};
use clap::{ArgGroup, Args};
use tracing::warn;

use crate::catalog::store::CatalogStore;
use crate::cli::OutputFormat;
use crate::config::AppPaths;
use crate::core::entry::{CatalogEntry, EntryChanges, EntryDraft};
use crate::core::icon::{resolve_icon_path, IconSource};
use crate::core::types::{EntryId, EntryType, Scope};

/// Separator between names in an entry path
pub const PATH_SEPARATOR: char = '/';

#[derive(Args)]
pub struct ListArgs {
    /// Folder to list (defaults to the root)
    pub path: Option<String>,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Text to look for, ignoring case
    pub query: String,

    /// Folder to search in (defaults to the root)
    #[arg(long = "in", value_name = "PATH")]
    pub scope: Option<String>,
}

#[derive(Args)]
pub struct PathArgs {
    /// Entry path, e.g. "Chat Assistants/Claude"
    pub path: String,
}

#[derive(Args)]
#[command(group(ArgGroup::new("kind").required(true).args(["url", "folder"])))]
pub struct AddArgs {
    /// Display name
    #[arg(long)]
    pub name: String,

    /// URL of a new tool
    #[arg(long)]
    pub url: Option<String>,

    /// Create a folder instead of a tool
    #[arg(long)]
    pub folder: bool,

    #[arg(long, default_value = "")]
    pub description: String,

    #[arg(long, default_value = "")]
    pub features: String,

    /// Icon image for a tool; `./` paths are relative to the resource directory
    #[arg(long)]
    pub icon: Option<String>,

    /// Folder to add to (defaults to the root)
    #[arg(long, value_name = "PATH")]
    pub parent: Option<String>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Entry path
    pub path: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub features: Option<String>,

    /// New URL; required with --to-tool
    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub icon: Option<String>,

    /// Turn a tool into an empty folder (drops URL and icon)
    #[arg(long, conflicts_with = "to_tool")]
    pub to_folder: bool,

    /// Turn a folder into a tool (drops its contents)
    #[arg(long)]
    pub to_tool: bool,
}

#[derive(Args)]
pub struct IconArgs {
    /// Entry path
    pub path: String,

    /// New icon path; an empty string restores the default glyph
    pub icon: String,
}

/// Split `"A/B/C"` into names, ignoring empty segments
#[must_use]
pub fn split_path(path: &str) -> Vec<&str> {
    path.split(PATH_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn resolve_entry(store: &CatalogStore, path: &str) -> anyhow::Result<EntryId> {
    let names = split_path(path);
    if names.is_empty() {
        bail!("An entry path is required");
    }
    store
        .resolve_path(&names)
        .with_context(|| format!("No entry at '{path}'"))
}

fn resolve_scope(store: &CatalogStore, path: Option<&str>) -> anyhow::Result<Scope> {
    let Some(path) = path.filter(|p| !split_path(p).is_empty()) else {
        return Ok(Scope::Root);
    };
    let id = resolve_entry(store, path)?;
    if store.get(id).is_some_and(CatalogEntry::is_folder) {
        Ok(Scope::Folder(id))
    } else {
        bail!("'{path}' is a tool, not a folder")
    }
}

fn open_store(paths: &AppPaths) -> anyhow::Result<CatalogStore> {
    CatalogStore::open(paths.catalog_location()).context("Failed to load catalog")
}

pub fn run_list(args: ListArgs, paths: &AppPaths, format: OutputFormat) -> anyhow::Result<()> {
    let store = open_store(paths)?;
    let scope = resolve_scope(&store, args.path.as_deref())?;
    let entries = store.list(scope)?;
    print_entries(&entries, format)
}

pub fn run_search(args: SearchArgs, paths: &AppPaths, format: OutputFormat) -> anyhow::Result<()> {
    let store = open_store(paths)?;
    let scope = resolve_scope(&store, args.scope.as_deref())?;
    let entries = store.search(scope, &args.query)?;
    if entries.is_empty() && format == OutputFormat::Text {
        println!("No entries match '{}'", args.query.trim());
        return Ok(());
    }
    print_entries(&entries, format)
}

pub fn run_show(args: PathArgs, paths: &AppPaths, format: OutputFormat) -> anyhow::Result<()> {
    let store = open_store(paths)?;
    let id = resolve_entry(&store, &args.path)?;
    let entry = store
        .get(id)
        .with_context(|| format!("No entry at '{}'", args.path))?;
    let icon = store.resolve_icon(id, &paths.resource_root)?;

    match format {
        OutputFormat::Text => {
            println!("Name:        {}", entry.name);
            println!("Type:        {}", entry.entry_type());
            if let Some(url) = entry.url() {
                println!("URL:         {url}");
            }
            if !entry.description.is_empty() {
                println!("Description: {}", entry.description);
            }
            if !entry.features.is_empty() {
                println!("Features:    {}", entry.features);
            }
            println!("Icon:        {icon}");
            if let Some(children) = entry.children() {
                println!("Entries:     {}", children.len());
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "entry": entry,
                "icon": icon_json(&icon),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

pub fn run_add(args: AddArgs, paths: &AppPaths, format: OutputFormat) -> anyhow::Result<()> {
    let mut store = open_store(paths)?;
    let parent = resolve_scope(&store, args.parent.as_deref())?;

    let mut draft = match args.url {
        Some(url) if !args.folder => EntryDraft::tool(args.name, url),
        _ => EntryDraft::folder(args.name),
    }
    .with_description(args.description)
    .with_features(args.features);
    if let Some(icon) = args.icon {
        draft = draft.with_icon(icon);
    }

    let id = store.add(parent, draft).context("Failed to add entry")?;
    print_change("Added", &store, id, format)
}

pub fn run_edit(args: EditArgs, paths: &AppPaths, format: OutputFormat) -> anyhow::Result<()> {
    let mut store = open_store(paths)?;
    let id = resolve_entry(&store, &args.path)?;

    let mut changes = EntryChanges::new();
    changes.name = args.name;
    changes.description = args.description;
    changes.features = args.features;
    changes.url = args.url;
    changes.icon_path = args.icon;
    if args.to_folder {
        changes = changes.convert_to(EntryType::Folder);
    } else if args.to_tool {
        changes = changes.convert_to(EntryType::Tool);
    }

    if args.to_tool && store.get(id).and_then(CatalogEntry::children).is_some_and(|c| !c.is_empty()) {
        warn!("Converting '{}' to a tool discards its contents", args.path);
    }

    store.edit(id, changes).context("Failed to edit entry")?;
    print_change("Updated", &store, id, format)
}

pub fn run_delete(args: PathArgs, paths: &AppPaths, format: OutputFormat) -> anyhow::Result<()> {
    let mut store = open_store(paths)?;
    let id = resolve_entry(&store, &args.path)?;
    let removed = store.delete(id).context("Failed to delete entry")?;

    match format {
        OutputFormat::Text => {
            let nested = removed.subtree_len() - 1;
            if nested > 0 {
                println!("Deleted {} '{}' and {nested} nested entries", removed.entry_type(), removed.name);
            } else {
                println!("Deleted {} '{}'", removed.entry_type(), removed.name);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&removed)?);
        }
    }
    Ok(())
}

pub fn run_icon(args: IconArgs, paths: &AppPaths, format: OutputFormat) -> anyhow::Result<()> {
    let mut store = open_store(paths)?;
    let id = resolve_entry(&store, &args.path)?;

    if let Some(path) = resolve_icon_path(args.icon.trim(), &paths.resource_root) {
        if !path.is_file() {
            warn!("Icon file {} does not exist; the default glyph will be shown", path.display());
        }
    }

    store.change_icon(id, &args.icon).context("Failed to change icon")?;
    print_change("Updated icon of", &store, id, format)
}

pub fn run_open(args: PathArgs, paths: &AppPaths) -> anyhow::Result<()> {
    let store = open_store(paths)?;
    let id = resolve_entry(&store, &args.path)?;
    let entry = store
        .get(id)
        .with_context(|| format!("No entry at '{}'", args.path))?;
    let Some(url) = entry.url() else {
        bail!("'{}' is a folder; use `list` to see its contents", args.path);
    };

    open::that(url).with_context(|| format!("Failed to open {url}"))?;
    println!("Opened {} ({url})", entry.name);
    Ok(())
}

fn print_entries(entries: &[&CatalogEntry], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            let width = entries
                .iter()
                .map(|e| e.name.chars().count() + usize::from(e.is_folder()))
                .max()
                .unwrap_or(0);
            for entry in entries {
                match entry.children() {
                    Some(children) => {
                        let label = format!("{}{PATH_SEPARATOR}", entry.name);
                        println!("{label:<width$}  {} entries", children.len());
                    }
                    None => {
                        let url = entry.url().unwrap_or_default();
                        println!("{:<width$}  {url}", entry.name);
                    }
                }
                if !entry.description.is_empty() {
                    println!("{:<width$}  {}", "", entry.description);
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(entries)?);
        }
    }
    Ok(())
}

fn print_change(
    verb: &str,
    store: &CatalogStore,
    id: EntryId,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let entry = store.get(id).with_context(|| format!("Entry {id} vanished"))?;
    match format {
        OutputFormat::Text => println!("{verb} {} '{}'", entry.entry_type(), entry.name),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(entry)?),
    }
    Ok(())
}

fn icon_json(icon: &IconSource) -> serde_json::Value {
    match icon {
        IconSource::Image { path, vector } => serde_json::json!({
            "image": path,
            "vector": vector,
        }),
        IconSource::Glyph(glyph) => serde_json::json!({ "glyph": glyph }),
    }
}
