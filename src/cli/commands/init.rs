//! Implementation of the `emergence init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tokio::fs;

use crate::cli::engine::Engine;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;
use crate::infrastructure::config::CONFIG_DIR;

/// Written when no constitution file is supplied on first init.
pub const DEFAULT_CONSTITUTION: &str = "\
Report practice outcomes exactly as observed; never fabricate success.
Adopt only improvements that originate from self-reflection and name a concrete capability.
Treat verification oracles as authoritative over self-assessment.
Never modify this constitution.";

#[derive(Args, Debug)]
pub struct InitArgs {
    /// File holding the constitution text (written once, never modified)
    #[arg(long)]
    pub constitution: Option<PathBuf>,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub directories_created: Vec<String>,
    pub config_written: bool,
    pub database_path: String,
    pub constitution_written: bool,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if !self.directories_created.is_empty() {
            lines.push("\nCreated directories:".to_string());
            for dir in &self.directories_created {
                lines.push(format!("  - {dir}"));
            }
        }
        if self.config_written {
            lines.push(format!("\nWrote default configuration to {CONFIG_DIR}/config.yaml"));
        }
        lines.push(format!("\nDatabase ready at {}", self.database_path));
        if self.constitution_written {
            lines.push("Constitution written.".to_string());
        } else {
            lines.push("Constitution already present; left untouched.".to_string());
        }
        lines.join("\n")
    }
}

pub async fn execute(args: InitArgs, config: Config, json_mode: bool) -> Result<()> {
    let config_dir = PathBuf::from(CONFIG_DIR);
    let mut directories_created = vec![];
    for dir in [config_dir.clone(), config_dir.join("logs")] {
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            directories_created.push(dir.to_string_lossy().to_string());
        }
    }

    let config_path = config_dir.join("config.yaml");
    let config_written = if config_path.exists() {
        false
    } else {
        let yaml = serde_yaml::to_string(&Config::default()).context("Failed to render default config")?;
        fs::write(&config_path, yaml)
            .await
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        true
    };

    let database_path = config.database.path.clone();
    let engine = Engine::open(config).await?;

    let constitution_written = match args.constitution {
        Some(path) => {
            let text = fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read constitution from {}", path.display()))?;
            engine
                .strategies
                .initialize(&text)
                .await
                .context("Failed to write constitution")?;
            true
        }
        None if engine.strategies.is_initialized().await? => false,
        None => {
            engine.strategies.initialize(DEFAULT_CONSTITUTION).await?;
            true
        }
    };

    tracing::info!(database = %database_path, constitution_written, "Project initialized");

    let output_data = InitOutput {
        success: true,
        message: "Project initialized successfully.".to_string(),
        directories_created,
        config_written,
        database_path,
        constitution_written,
    };
    output(&output_data, json_mode);
    Ok(())
}
