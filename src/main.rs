use anyhow::Result;
use clap::Parser;
use emulator_dispatch::cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();
    let verbosity = cli.verbosity();
    let global = cli.global();

    // Initialize logging with verbosity-aware level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(verbosity.to_log_level())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Inspect(args) => {
            emulator_dispatch::cli::commands::inspect(args, global, verbosity)?;
        }
        Commands::Encode(args) => {
            emulator_dispatch::cli::commands::encode(args, global, verbosity)?;
        }
        Commands::Decode(args) => {
            emulator_dispatch::cli::commands::decode(args, global, verbosity)?;
        }
    }

    Ok(())
}
