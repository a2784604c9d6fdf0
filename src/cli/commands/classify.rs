//! Implementation of the `emergence classify` command.

use anyhow::Result;
use clap::Args;
use comfy_table::Cell;
use serde::Serialize;

use crate::cli::engine::Engine;
use crate::cli::output::{list_table, output, CommandOutput};
use crate::domain::models::{Config, DomainClassification};

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Capability description to classify
    pub text: String,

    /// Optional domain hint, used only to break score ties
    #[arg(long)]
    pub hint: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClassifyOutput {
    pub text: String,
    pub classification: DomainClassification,
}

impl CommandOutput for ClassifyOutput {
    fn to_human(&self) -> String {
        let c = &self.classification;
        let mut table = list_table(&["domain", "score"]);
        for score in &c.scores {
            table.add_row(vec![
                Cell::new(score.domain.as_str()),
                Cell::new(format!("{:.3}", score.score)),
            ]);
        }
        let secondary = c
            .secondary_domain
            .map(|d| format!(", secondary {d}"))
            .unwrap_or_default();
        let practice = if c.permits_practice() {
            "practice permitted"
        } else {
            "practice blocked"
        };
        format!(
            "{} (confidence {:.3}{secondary}); {practice}\n\n{table}",
            c.primary_domain, c.primary_confidence
        )
    }
}

pub async fn execute(args: ClassifyArgs, config: Config, json_mode: bool) -> Result<()> {
    let engine = Engine::open(config).await?;
    let classification = engine.classifier()?.classify(&args.text, args.hint.as_deref());

    output(
        &ClassifyOutput {
            text: args.text,
            classification,
        },
        json_mode,
    );
    Ok(())
}
