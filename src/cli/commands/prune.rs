//! Implementation of the `emergence prune` command.

use anyhow::Result;
use clap::Args;
use comfy_table::Cell;
use serde::Serialize;

use crate::cli::engine::Engine;
use crate::cli::output::{list_table, output, render_list, truncate, CommandOutput};
use crate::domain::models::{Config, Heuristic};

#[derive(Args, Debug)]
pub struct PruneArgs {}

#[derive(Debug, Serialize)]
pub struct PruneOutput {
    pub removed: Vec<Heuristic>,
    pub cost_after: usize,
    pub token_budget: usize,
}

impl CommandOutput for PruneOutput {
    fn to_human(&self) -> String {
        if self.removed.is_empty() {
            return format!(
                "Nothing pruned ({} / {} tokens).",
                self.cost_after, self.token_budget
            );
        }
        let mut table = list_table(&["domain", "uses", "added", "heuristic"]);
        for h in &self.removed {
            table.add_row(vec![
                Cell::new(h.domain.as_str()),
                Cell::new(h.usage_count),
                Cell::new(h.added_at.format("%Y-%m-%d").to_string()),
                Cell::new(truncate(&h.content, 70)),
            ]);
        }
        format!(
            "Pruned {}\n\nStrategies now cost {} / {} tokens.",
            render_list("heuristic", "heuristics", &table, self.removed.len()),
            self.cost_after,
            self.token_budget
        )
    }
}

pub async fn execute(_args: PruneArgs, config: Config, json_mode: bool) -> Result<()> {
    let token_budget = config.strategy.token_budget;
    let engine = Engine::open(config).await?;

    let removed = engine.strategies.prune().await?;
    let out = PruneOutput {
        removed,
        cost_after: engine.strategies.estimated_cost().await?,
        token_budget,
    };
    output(&out, json_mode);
    Ok(())
}
