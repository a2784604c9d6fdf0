//! Implementation of the `emergence history` command.

use anyhow::Result;
use clap::Args;
use comfy_table::Cell;
use serde::Serialize;

use crate::cli::commands::cycle::describe_practice;
use crate::cli::engine::Engine;
use crate::cli::output::{list_table, output, render_list, truncate, CommandOutput};
use crate::domain::models::{CalibrationSignal, Config, CycleResult};
use crate::domain::ports::AuditRepository;

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Maximum number of records to list
    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    /// List suspected misclassifications instead of cycles
    #[arg(long)]
    pub misclassified: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum HistoryOutput {
    Cycles(Vec<CycleResult>),
    Misclassifications(Vec<CalibrationSignal>),
}

impl CommandOutput for HistoryOutput {
    fn to_human(&self) -> String {
        match self {
            Self::Cycles(cycles) => {
                let mut table = list_table(&["started", "seen", "accepted", "domain", "practice", "selected"]);
                for c in cycles {
                    table.add_row(vec![
                        Cell::new(c.started_at.format("%Y-%m-%d %H:%M").to_string()),
                        Cell::new(c.candidates_seen),
                        Cell::new(c.accepted),
                        Cell::new(c.domain.map(|d| d.as_str()).unwrap_or("-")),
                        Cell::new(c.error.as_deref().map_or_else(|| describe_practice(&c.practice), |e| truncate(e, 40))),
                        Cell::new(truncate(c.selected.as_deref().unwrap_or("-"), 50)),
                    ]);
                }
                render_list("cycle", "cycles", &table, cycles.len())
            }
            Self::Misclassifications(signals) => {
                let mut table = list_table(&["recorded", "predicted", "confidence", "outcome", "description"]);
                for s in signals {
                    table.add_row(vec![
                        Cell::new(s.recorded_at.format("%Y-%m-%d %H:%M").to_string()),
                        Cell::new(s.predicted_domain.as_str()),
                        Cell::new(format!("{:.3}", s.confidence)),
                        Cell::new(s.outcome.as_str()),
                        Cell::new(truncate(&s.description, 50)),
                    ]);
                }
                render_list(
                    "suspected misclassification",
                    "suspected misclassifications",
                    &table,
                    signals.len(),
                )
            }
        }
    }
}

pub async fn execute(args: HistoryArgs, config: Config, json_mode: bool) -> Result<()> {
    let engine = Engine::open(config).await?;

    let out = if args.misclassified {
        HistoryOutput::Misclassifications(engine.audit.suspected_misclassifications(args.limit).await?)
    } else {
        HistoryOutput::Cycles(engine.audit.recent_cycles(args.limit).await?)
    };
    output(&out, json_mode);
    Ok(())
}
