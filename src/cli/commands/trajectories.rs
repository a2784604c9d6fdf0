//! Implementation of the `emergence trajectories` command.

use anyhow::Result;
use clap::Args;
use comfy_table::Cell;
use serde::Serialize;

use crate::cli::engine::Engine;
use crate::cli::output::{list_table, output, render_list, truncate, CommandOutput};
use crate::domain::models::{Config, PracticeDomain, Trajectory};
use crate::domain::ports::TrajectoryRepository;

#[derive(Args, Debug)]
pub struct TrajectoriesArgs {
    /// Practice domain (code, math, logic)
    #[arg(long)]
    pub domain: PracticeDomain,

    /// Maximum number of trajectories to list
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

#[derive(Debug, Serialize)]
pub struct TrajectoryListOutput {
    pub domain: PracticeDomain,
    pub total_successes: u64,
    pub trajectories: Vec<Trajectory>,
}

impl CommandOutput for TrajectoryListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "created", "level", "tier", "score", "problem"]);
        for t in &self.trajectories {
            table.add_row(vec![
                Cell::new(&t.id.to_string()[..8]),
                Cell::new(t.created_at.format("%Y-%m-%d %H:%M").to_string()),
                Cell::new(t.difficulty),
                Cell::new(t.verification.as_str()),
                Cell::new(format!("{:.2}", t.partial_score)),
                Cell::new(truncate(t.problem.specification.trim(), 60)),
            ]);
        }
        format!(
            "{}\n\n{} successful {} trajectories recorded in total.",
            render_list("successful trajectory", "successful trajectories", &table, self.trajectories.len()),
            self.total_successes,
            self.domain
        )
    }
}

pub async fn execute(args: TrajectoriesArgs, config: Config, json_mode: bool) -> Result<()> {
    let engine = Engine::open(config).await?;

    let out = TrajectoryListOutput {
        domain: args.domain,
        total_successes: engine.trajectories.count_successes(args.domain).await?,
        trajectories: engine.trajectories.recent_successes(args.domain, args.limit).await?,
    };
    output(&out, json_mode);
    Ok(())
}
