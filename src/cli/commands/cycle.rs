//! Implementation of the `emergence cycle` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use crate::adapters::JsonFileReflector;
use crate::cli::engine::Engine;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, CrystallizationSummary, CycleResult, PracticeSummary};

#[derive(Args, Debug)]
pub struct CycleArgs {
    /// JSON file with the candidate list (an array, or {"candidates": [...]})
    #[arg(long)]
    pub candidates: PathBuf,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct CycleOutput(pub CycleResult);

pub fn describe_practice(practice: &PracticeSummary) -> String {
    match practice {
        PracticeSummary::NotRun => "not run".to_string(),
        PracticeSummary::Blocked { reason } => format!("blocked ({reason})"),
        PracticeSummary::GenerationFailed { attempts } => {
            format!("generation failed after {attempts} attempt(s)")
        }
        PracticeSummary::Succeeded { partial_score, verification } => {
            format!("succeeded ({partial_score:.2}, {})", verification.as_str())
        }
        PracticeSummary::Failed { partial_score, verification } => {
            format!("failed ({partial_score:.2}, {})", verification.as_str())
        }
    }
}

pub fn describe_crystallization(summary: &CrystallizationSummary) -> String {
    match summary {
        CrystallizationSummary::NotRun => "not run".to_string(),
        CrystallizationSummary::NotTriggered { successes_since_last_run, threshold } => {
            format!("not triggered ({successes_since_last_run}/{threshold})")
        }
        CrystallizationSummary::Accepted { content, pruned } => {
            format!("accepted \"{content}\" (pruned {pruned})")
        }
        CrystallizationSummary::Rejected { reason } => format!("rejected ({reason})"),
    }
}

impl CommandOutput for CycleOutput {
    fn to_human(&self) -> String {
        let r = &self.0;
        let mut lines = vec![
            format!("Cycle {}", r.cycle_id),
            format!(
                "  Candidates:      {} seen, {} accepted, {} rejected",
                r.candidates_seen, r.accepted, r.rejected
            ),
        ];
        if let Some(selected) = &r.selected {
            let entropy = r
                .selection_entropy
                .map(|e| format!(" (entropy {e:.3})"))
                .unwrap_or_default();
            lines.push(format!("  Selected:        {selected}{entropy}"));
        }
        if let Some(domain) = r.domain {
            lines.push(format!("  Domain:          {domain}"));
        }
        lines.push(format!("  Practice:        {}", describe_practice(&r.practice)));
        lines.push(format!(
            "  Crystallization: {}",
            describe_crystallization(&r.crystallization)
        ));
        let trail: Vec<&str> = r.phases.iter().map(|p| p.as_str()).collect();
        lines.push(format!("  Phases:          {}", trail.join(" -> ")));
        if let Some(error) = &r.error {
            lines.push(format!("  Error:           {error}"));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: CycleArgs, config: Config, json_mode: bool) -> Result<()> {
    let engine = Engine::open(config).await?;
    let orchestrator = engine.orchestrator()?;
    let reflector = JsonFileReflector::new(&args.candidates);

    let result = orchestrator.run_reflection_cycle(&reflector).await?;
    output(&CycleOutput(result), json_mode);
    Ok(())
}
