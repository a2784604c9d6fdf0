//! Oracle executor adapters.

pub mod command;
pub mod scripted;

pub use command::{parse_oracle_output, CommandOracleExecutor};
pub use scripted::ScriptedOracleExecutor;
