use clap::Parser;
use tracing_subscriber::EnvFilter;

use tool_shelf::cli::{self, Commands};

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("tool_shelf=debug,info")
    } else {
        EnvFilter::new("tool_shelf=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let paths = cli.paths()?;
    let format = cli.format;

    match cli.command {
        Commands::List(args) => cli::catalog::run_list(args, &paths, format)?,
        Commands::Search(args) => cli::catalog::run_search(args, &paths, format)?,
        Commands::Show(args) => cli::catalog::run_show(args, &paths, format)?,
        Commands::Add(args) => cli::catalog::run_add(args, &paths, format)?,
        Commands::Edit(args) => cli::catalog::run_edit(args, &paths, format)?,
        Commands::Delete(args) => cli::catalog::run_delete(args, &paths, format)?,
        Commands::Icon(args) => cli::catalog::run_icon(args, &paths, format)?,
        Commands::Open(args) => cli::catalog::run_open(args, &paths)?,
        Commands::Update(args) => cli::update::run(args, &paths, format)?,
    }

    Ok(())
}
