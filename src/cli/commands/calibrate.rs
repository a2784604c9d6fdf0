//! Implementation of the `emergence calibrate` command.
//!
//! Scores a held-out set of labeled candidates through the gate and
//! reports the threshold that best separates them. The configured
//! threshold is left alone; applying the suggestion is a config edit.

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::cli::engine::Engine;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Candidate, Config};
use crate::services::{calibrate_threshold, threshold_accuracy, LabeledScore};

#[derive(Args, Debug)]
pub struct CalibrateArgs {
    /// JSON file of `{"candidate": {...}, "should_pass": bool}` entries
    #[arg(long)]
    pub labels: PathBuf,
}

#[derive(Debug, Deserialize)]
struct LabeledCandidate {
    candidate: Candidate,
    should_pass: bool,
}

fn parse_labels(body: &str) -> Result<Vec<LabeledCandidate>> {
    let labels: Vec<LabeledCandidate> = serde_json::from_str(body).context("Invalid labels file")?;
    Ok(labels)
}

#[derive(Debug, Serialize)]
pub struct CalibrateOutput {
    pub examples: usize,
    pub current_threshold: f64,
    pub current_accuracy: f64,
    pub suggested_threshold: f64,
    pub suggested_accuracy: f64,
    pub scores: Vec<LabeledScore>,
}

impl CommandOutput for CalibrateOutput {
    fn to_human(&self) -> String {
        [
            format!("Calibrated over {} labeled candidates", self.examples),
            format!(
                "  current:   {:.3} ({:.0}% correct)",
                self.current_threshold,
                self.current_accuracy * 100.0
            ),
            format!(
                "  suggested: {:.3} ({:.0}% correct)",
                self.suggested_threshold,
                self.suggested_accuracy * 100.0
            ),
            "Set gate.threshold in the config file to apply it.".to_string(),
        ]
        .join("\n")
    }
}

pub async fn execute(args: CalibrateArgs, config: Config, json_mode: bool) -> Result<()> {
    let body = tokio::fs::read_to_string(&args.labels)
        .await
        .with_context(|| format!("Failed to read {}", args.labels.display()))?;
    let labels = parse_labels(&body)?;

    let engine = Engine::open(config).await?;
    let gate = engine.gate(engine.optional_judgment())?;

    let mut scores = Vec::with_capacity(labels.len());
    for label in &labels {
        let verdict = gate.evaluate(&label.candidate).await?;
        scores.push(LabeledScore {
            combined_score: verdict.combined_score,
            should_pass: label.should_pass,
        });
    }

    let suggested = calibrate_threshold(&scores)?;
    let current = gate.threshold();
    tracing::info!(current, suggested, examples = scores.len(), "Threshold calibrated");

    output(
        &CalibrateOutput {
            examples: scores.len(),
            current_threshold: current,
            current_accuracy: threshold_accuracy(&scores, current),
            suggested_threshold: suggested,
            suggested_accuracy: threshold_accuracy(&scores, suggested),
            scores,
        },
        json_mode,
    );
    Ok(())
}
