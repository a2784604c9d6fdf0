//! Emergence engine CLI entry point.

use clap::Parser;

use emergence::cli::{commands, handle_error, Cli, Commands};
use emergence::infrastructure::config::ConfigLoader;
use emergence::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ConfigLoader::load() {
        Ok(config) => config,
        Err(err) => handle_error(err.context("Failed to load configuration"), cli.json),
    };

    // Held for the whole run so buffered file logs are flushed on exit.
    let _logger = match LogConfig::try_from(&config.logging)
        .map_err(anyhow::Error::from)
        .and_then(|log_config| LoggerImpl::init(&log_config))
    {
        Ok(logger) => logger,
        Err(err) => handle_error(err.context("Failed to initialize logging"), cli.json),
    };

    let json = cli.json;
    let result = match cli.command {
        Commands::Init(args) => commands::init::execute(args, config, json).await,
        Commands::Cycle(args) => commands::cycle::execute(args, config, json).await,
        Commands::Gate(args) => commands::gate::execute(args, config, json).await,
        Commands::Calibrate(args) => commands::calibrate::execute(args, config, json).await,
        Commands::Classify(args) => commands::classify::execute(args, config, json).await,
        Commands::Strategies(args) => commands::strategies::execute(args, config, json).await,
        Commands::Trajectories(args) => commands::trajectories::execute(args, config, json).await,
        Commands::Prune(args) => commands::prune::execute(args, config, json).await,
        Commands::RecordUsage(args) => commands::usage::execute(args, config, json).await,
        Commands::History(args) => commands::history::execute(args, config, json).await,
    };

    if let Err(err) = result {
        handle_error(err, json);
    }
}
