//! Implementation of the `emergence strategies` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::cli::engine::Engine;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, StrategyDocument};

#[derive(Args, Debug)]
pub struct StrategiesArgs {
    /// Print only the mutable strategies section
    #[arg(long)]
    pub strategies_only: bool,
}

#[derive(Debug, Serialize)]
pub struct StrategiesOutput {
    pub document: StrategyDocument,
    pub token_cost: usize,
    pub token_budget: usize,
    #[serde(skip)]
    pub strategies_only: bool,
}

impl CommandOutput for StrategiesOutput {
    fn to_human(&self) -> String {
        let body = if self.strategies_only {
            self.document.render_strategies()
        } else {
            self.document.render()
        };
        format!(
            "{}\n\n({} heuristic(s), {} / {} tokens)",
            body.trim_end(),
            self.document.strategies().len(),
            self.token_cost,
            self.token_budget
        )
    }
}

pub async fn execute(args: StrategiesArgs, config: Config, json_mode: bool) -> Result<()> {
    let token_budget = config.strategy.token_budget;
    let engine = Engine::open(config).await?;

    let out = StrategiesOutput {
        document: engine.strategies.snapshot().await?,
        token_cost: engine.strategies.estimated_cost().await?,
        token_budget,
        strategies_only: args.strategies_only,
    };
    output(&out, json_mode);
    Ok(())
}
