//! CLI entry point - the composition root.
//!
//! Logging is initialized here and nowhere else; command dispatch routes to
//! the handlers.

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use readaloud_cli::{Cli, CliError, Commands, handlers};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Extract { file, json } => handlers::extract::execute(&file, json),
        Commands::Read(args) => handlers::read::execute(&args).await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        if let Some(cli_err) = err.downcast_ref::<CliError>() {
            eprintln!("Error: {cli_err}");
            std::process::exit(cli_err.exit_code());
        }
        return Err(err);
    }
    Ok(())
}
