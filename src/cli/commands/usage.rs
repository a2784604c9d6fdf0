//! Implementation of the `emergence record-usage` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use uuid::Uuid;

use crate::cli::engine::Engine;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct UsageArgs {
    /// Heuristic ID
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct UsageOutput {
    pub id: Uuid,
    pub usage_count: u32,
}

impl CommandOutput for UsageOutput {
    fn to_human(&self) -> String {
        format!("Heuristic {} used {} time(s).", self.id, self.usage_count)
    }
}

pub async fn execute(args: UsageArgs, config: Config, json_mode: bool) -> Result<()> {
    let id = Uuid::parse_str(&args.id).with_context(|| format!("Invalid heuristic ID: {}", args.id))?;
    let engine = Engine::open(config).await?;

    engine.strategies.record_usage(id).await?;
    let usage_count = engine
        .strategies
        .snapshot()
        .await?
        .strategies()
        .iter()
        .find(|h| h.id == id)
        .map_or(0, |h| h.usage_count);

    output(&UsageOutput { id, usage_count }, json_mode);
    Ok(())
}
