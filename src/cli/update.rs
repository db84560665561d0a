use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cli::OutputFormat;
use crate::config::{AppPaths, UPDATE_URL_ENV};
use crate::update::checker::{CheckOutcome, UpdateChecker, UpdateConfig, UpdateSession};
use crate::update::download::DownloadOutcome;
use crate::update::metadata::UpdateInfo;
use crate::update::platform::Platform;

#[derive(Args)]
pub struct UpdateArgs {
    #[command(subcommand)]
    pub command: UpdateCommands,
}

#[derive(Subcommand)]
pub enum UpdateCommands {
    /// Ask the release endpoint whether a newer version exists
    Check(EndpointArgs),

    /// Check, then download the release asset for this platform
    Download(DownloadArgs),
}

#[derive(Args)]
pub struct EndpointArgs {
    /// Release metadata URL (static manifest or release-listing API)
    #[arg(long, env = UPDATE_URL_ENV)]
    pub endpoint: String,

    /// Version to compare against (defaults to this build's version)
    #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
    pub current_version: String,

    /// Platform whose asset to pick: macos, windows or linux
    #[arg(long)]
    pub platform: Option<Platform>,

    /// Seconds to wait for the release metadata
    #[arg(long, default_value = "15", value_name = "SECS")]
    pub timeout: u64,

    /// Seconds a download may stall before it is abandoned
    #[arg(long, default_value = "30", value_name = "SECS")]
    pub read_timeout: u64,

    /// Ignore HTTP_PROXY / HTTPS_PROXY and connect directly
    #[arg(long)]
    pub no_proxy: bool,
}

impl EndpointArgs {
    fn to_config(&self) -> UpdateConfig {
        let mut config = UpdateConfig::new(self.endpoint.clone())
            .with_current_version(self.current_version.clone())
            .with_timeouts(
                Duration::from_secs(self.timeout),
                Duration::from_secs(self.read_timeout),
            )
            .with_system_proxy(!self.no_proxy);
        config.platform = self.platform;
        config
    }
}

#[derive(Args)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub endpoint: EndpointArgs,

    /// Directory to save the asset in (defaults to "updates" in the data directory)
    #[arg(long, value_name = "DIR")]
    pub dest: Option<PathBuf>,
}

pub fn run(args: UpdateArgs, paths: &AppPaths, format: OutputFormat) -> anyhow::Result<()> {
    // Build tokio runtime
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let cancel = CancellationToken::new();
        let watcher = cancel_on_ctrl_c(cancel.clone());

        let result = match args.command {
            UpdateCommands::Check(endpoint) => run_check(&endpoint, format, &cancel).await,
            UpdateCommands::Download(download) => {
                let dest = download.dest.clone().unwrap_or_else(|| paths.downloads_dir());
                run_download(&download.endpoint, dest, format, &cancel).await
            }
        };

        watcher.abort();
        result
    })
}

fn cancel_on_ctrl_c(cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted, cancelling");
            cancel.cancel();
        }
    })
}

async fn run_check(
    args: &EndpointArgs,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let checker = UpdateChecker::new(args.to_config())?;
    let outcome = checker
        .check_for_update(cancel)
        .await
        .context("Update check failed")?;

    match format {
        OutputFormat::Text => match &outcome {
            CheckOutcome::Available(info) => print_available(info),
            CheckOutcome::UpToDate { current, remote } => {
                println!("Up to date (current {current}, latest {remote})");
            }
            CheckOutcome::Cancelled => println!("Update check cancelled"),
        },
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
    }
    Ok(())
}

async fn run_download(
    args: &EndpointArgs,
    dest_dir: PathBuf,
    format: OutputFormat,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let checker = UpdateChecker::new(args.to_config())?;
    let mut session = UpdateSession::new(&checker);

    let outcome = session.check(cancel).await.context("Update check failed")?;
    let info = match outcome {
        CheckOutcome::Available(info) => info,
        other => {
            match format {
                OutputFormat::Text => match other {
                    CheckOutcome::UpToDate { current, remote } => {
                        println!("Up to date (current {current}, latest {remote}); nothing to download");
                    }
                    _ => println!("Update check cancelled"),
                },
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&other)?),
            }
            return Ok(());
        }
    };

    if format == OutputFormat::Text {
        print_available(&info);
    }

    let show_progress = format == OutputFormat::Text;
    let outcome = session
        .download(&dest_dir, cancel, |done, total| {
            if show_progress {
                // Unknown totals are shown as -1
                let total = total.map_or(-1, i128::from);
                eprint!("\rDownloaded {done} of {total} bytes");
                let _ = std::io::stderr().flush();
            }
        })
        .await;
    if show_progress {
        eprintln!();
    }
    let outcome = outcome.context("Download failed")?;

    match format {
        OutputFormat::Text => match &outcome {
            DownloadOutcome::Complete { path, bytes } => {
                println!("Saved {} ({bytes} bytes)", path.display());
            }
            DownloadOutcome::Cancelled => println!("Download cancelled"),
        },
        OutputFormat::Json => {
            let output = serde_json::json!({
                "update": info,
                "download": outcome,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn print_available(info: &UpdateInfo) {
    println!("Update available: {}", info.version);
    if let Some(published) = info.published_at {
        println!("Published: {}", published.format("%Y-%m-%d"));
    }
    println!("Asset:     {} ({})", info.asset.name, info.asset.download_url);
    if !info.release_notes.trim().is_empty() {
        println!("\n{}", info.release_notes.trim());
    }
}
