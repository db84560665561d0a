//! Command-line interface for tool-shelf.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **list** / **search** / **show**: browse the catalog
//! - **add** / **edit** / **delete** / **icon**: change the catalog
//! - **open**: launch a tool in the default browser
//! - **update**: check for a newer release and download it
//!
//! Entries are addressed by `/`-separated paths of names from the root,
//! for example `"Chat Assistants/Claude"`.
//!
//! ## Usage
//!
//! ```text
//! # Browse
//! tool-shelf list
//! tool-shelf list "Chat Assistants"
//! tool-shelf search translate --format json
//!
//! # Edit
//! tool-shelf add --name Kimi --url https://kimi.ai --parent "Chat Assistants"
//! tool-shelf edit "Chat Assistants/Kimi" --description "Long-context chat"
//! tool-shelf delete "Chat Assistants/Kimi"
//!
//! # Updates
//! tool-shelf update check --endpoint https://example.com/latest.json
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::config::{AppPaths, DATA_DIR_ENV};

pub mod catalog;
pub mod update;

#[derive(Parser)]
#[command(name = "tool-shelf")]
#[command(author = "BingZ")]
#[command(version)]
#[command(about = "Keep a catalog of tool shortcuts organized in folders")]
#[command(
    long_about = "tool-shelf keeps a personal catalog of shortcuts to web tools, organized in folders.\n\nThe catalog is stored as JSON in a per-user data directory and seeded with a default set of tools on first run. Entries can be listed, searched, added, edited, deleted and opened, and the application can check a release endpoint for updates."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Directory holding the catalog file
    #[arg(long, global = true, env = DATA_DIR_ENV, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory that `./` icon paths are relative to
    #[arg(long, global = true, value_name = "DIR")]
    pub resource_dir: Option<PathBuf>,
}

impl Cli {
    /// Data and resource locations after applying platform defaults
    ///
    /// # Errors
    ///
    /// Returns an error if no data directory can be determined.
    pub fn paths(&self) -> anyhow::Result<AppPaths> {
        AppPaths::resolve(self.data_dir.clone(), self.resource_dir.clone())
            .context("Failed to resolve application directories")
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List a folder (or the root) with folders first
    List(catalog::ListArgs),

    /// Search names, descriptions, features and URLs in a folder
    Search(catalog::SearchArgs),

    /// Show one entry in detail
    Show(catalog::PathArgs),

    /// Add a tool or folder
    Add(catalog::AddArgs),

    /// Change fields of an entry, or turn a tool into a folder and back
    Edit(catalog::EditArgs),

    /// Delete an entry and everything inside it
    Delete(catalog::PathArgs),

    /// Change the icon of a tool or folder
    Icon(catalog::IconArgs),

    /// Open a tool in the default browser
    Open(catalog::PathArgs),

    /// Check for and download application updates
    Update(update::UpdateArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
