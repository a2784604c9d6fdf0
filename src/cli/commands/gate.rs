//! Implementation of the `emergence gate` command.

use anyhow::Result;
use clap::{Args, ValueEnum};
use serde::Serialize;

use crate::cli::engine::Engine;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Candidate, Config, EmergenceVerdict, Provenance};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OriginArg {
    Reflection,
    External,
    Mixed,
    Bootstrap,
}

#[derive(Args, Debug)]
pub struct GateArgs {
    /// Capability description to evaluate
    pub text: String,

    /// Where the candidate came from
    #[arg(long, value_enum, default_value = "reflection")]
    pub origin: OriginArg,

    /// Originating external request, for external and mixed origins
    #[arg(long)]
    pub request: Option<String>,

    /// Candidate intensity
    #[arg(long, default_value_t = 1.0)]
    pub intensity: f64,
}

#[derive(Debug, Serialize)]
pub struct GateOutput {
    pub text: String,
    pub judgment_available: bool,
    pub verdict: EmergenceVerdict,
}

impl CommandOutput for GateOutput {
    fn to_human(&self) -> String {
        let v = &self.verdict;
        let decision = if v.passed { "ADMITTED" } else { "REJECTED" };
        let mut lines = vec![
            format!("{decision}: {:.3} against threshold {:.3}", v.combined_score, v.threshold),
            format!("  provenance:  {:.3}", v.provenance_score),
            format!("  specificity: {:.3}", v.specificity_score),
        ];
        if let Some(path) = v.specificity_path {
            lines.push(format!("  path:        {path:?}"));
        }
        if let Some(reason) = &v.rejection_reason {
            lines.push(format!("  reason:      {reason}"));
        }
        if !self.judgment_available {
            lines.push("  (no judgment capability configured; ambiguous phrasing used the phrase model)".to_string());
        }
        lines.join("\n")
    }
}

fn provenance(origin: OriginArg, request: Option<String>) -> Provenance {
    let request = request.unwrap_or_else(|| "cli request".to_string());
    match origin {
        OriginArg::Reflection => Provenance::reflection(vec![]),
        OriginArg::External => Provenance::external(request),
        OriginArg::Mixed => Provenance::reflection(vec![]).with_external_request(request),
        OriginArg::Bootstrap => Provenance::bootstrap(),
    }
}

pub async fn execute(args: GateArgs, config: Config, json_mode: bool) -> Result<()> {
    let engine = Engine::open(config).await?;
    let judgment = engine.optional_judgment();
    let judgment_available = judgment.is_some();
    let gate = engine.gate(judgment)?;

    let candidate = Candidate::new(
        args.text.clone(),
        args.intensity,
        provenance(args.origin, args.request),
    );
    let verdict = gate.evaluate(&candidate).await?;

    output(
        &GateOutput {
            text: args.text,
            judgment_available,
            verdict,
        },
        json_mode,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Origin;

    #[test]
    fn test_mixed_origin_carries_request() {
        let p = provenance(OriginArg::Mixed, Some("user asked".to_string()));
        assert_eq!(p.origin, Origin::Reflection);
        assert_eq!(p.external_request.as_deref(), Some("user asked"));
    }
}
