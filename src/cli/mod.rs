//! Command-line interface for the emergence engine.

pub mod commands;
pub mod engine;
pub mod output;

use clap::{Parser, Subcommand};

use commands::{
    calibrate::CalibrateArgs, classify::ClassifyArgs, cycle::CycleArgs, gate::GateArgs,
    history::HistoryArgs, init::InitArgs, prune::PruneArgs, strategies::StrategiesArgs,
    trajectories::TrajectoriesArgs, usage::UsageArgs,
};

#[derive(Parser, Debug)]
#[command(name = "emergence")]
#[command(about = "Emergence-gated self-improvement engine", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Emit machine-readable JSON instead of human-readable text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the config directory, database and constitution
    Init(InitArgs),
    /// Run one reflection cycle over a candidate file
    Cycle(CycleArgs),
    /// Evaluate a single candidate against the emergence gate
    Gate(GateArgs),
    /// Suggest a gate threshold from labeled candidates
    Calibrate(CalibrateArgs),
    /// Classify a capability description into a practice domain
    Classify(ClassifyArgs),
    /// Show the strategy document
    Strategies(StrategiesArgs),
    /// List successful trajectories for a domain
    Trajectories(TrajectoriesArgs),
    /// Prune low-value heuristics until the document fits its budget
    Prune(PruneArgs),
    /// Record that a heuristic was applied
    RecordUsage(UsageArgs),
    /// Show recent cycles or suspected misclassifications
    History(HistoryArgs),
}

/// Report a command failure and exit with status 1.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let chain: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({
            "success": false,
            "error": err.to_string(),
            "causes": chain,
        });
        eprintln!("{body}");
    } else {
        eprintln!("Error: {err}");
        for cause in err.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
    }
    std::process::exit(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_json_flag_is_global() {
        let cli = Cli::parse_from(["emergence", "history", "--json", "--limit", "5"]);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::History(HistoryArgs { limit: 5, .. })));
    }

    #[test]
    fn test_trajectories_parses_domain() {
        let cli = Cli::parse_from(["emergence", "trajectories", "--domain", "math"]);
        assert!(matches!(cli.command, Commands::Trajectories(_)));
        assert!(Cli::try_parse_from(["emergence", "trajectories", "--domain", "poetry"]).is_err());
    }
}
