//! Runs oracles as child processes.
//!
//! The solution and oracle are written to a scratch directory as
//! `solution.<ext>` and `oracle.<ext>`; the oracle is then run with the
//! configured interpreter from inside that directory. The child is killed
//! if the execution future is dropped.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{OracleConfig, OracleReport, PracticeProblem};
use crate::domain::ports::OracleExecutor;
use crate::services::practice_runner::{FAIL_MARKER, PASS_MARKER};

const MAX_DETAIL_CHARS: usize = 2_000;

/// Oracle executor backed by an interpreter process.
pub struct CommandOracleExecutor {
    config: OracleConfig,
}

impl CommandOracleExecutor {
    pub fn new(config: OracleConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl OracleExecutor for CommandOracleExecutor {
    async fn execute(
        &self,
        problem: &PracticeProblem,
        oracle_code: &str,
        solution: &str,
    ) -> DomainResult<OracleReport> {
        let scratch = tempfile::tempdir()
            .map_err(|e| DomainError::OracleExecutionFailed(format!("scratch dir: {e}")))?;
        let ext = self.config.extension.trim_start_matches('.');
        let oracle_path = scratch.path().join(format!("oracle.{ext}"));
        tokio::fs::write(scratch.path().join(format!("solution.{ext}")), solution)
            .await
            .map_err(|e| DomainError::OracleExecutionFailed(format!("write solution: {e}")))?;
        tokio::fs::write(&oracle_path, oracle_code)
            .await
            .map_err(|e| DomainError::OracleExecutionFailed(format!("write oracle: {e}")))?;

        tracing::debug!(problem = %problem.id, interpreter = %self.config.interpreter, "Running oracle");
        let output = Command::new(&self.config.interpreter)
            .args(&self.config.args)
            .arg(&oracle_path)
            .current_dir(scratch.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                DomainError::OracleExecutionFailed(format!("failed to spawn {}: {e}", self.config.interpreter))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut report = parse_oracle_output(&stdout);
        if !output.status.success() && report.total == 0 {
            report.detail = truncate(&format!("oracle exited with {}: {}", output.status, stderr.trim()));
        }
        Ok(report)
    }
}

/// Count marker lines in oracle output. Failure lines become the detail.
pub fn parse_oracle_output(stdout: &str) -> OracleReport {
    let mut passed = 0;
    let mut total = 0;
    let mut failures = Vec::new();
    for line in stdout.lines().map(str::trim) {
        if line.starts_with(PASS_MARKER) {
            passed += 1;
            total += 1;
        } else if line.starts_with(FAIL_MARKER) {
            total += 1;
            failures.push(line);
        }
    }
    OracleReport {
        passed,
        total,
        timed_out: false,
        detail: truncate(&failures.join("\n")),
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_DETAIL_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_counts_markers() {
        let out = "warming up\nORACLE PASS a\nORACLE FAIL b: got 3\n  ORACLE PASS c\n";
        let report = parse_oracle_output(out);
        assert_eq!(report.passed, 2);
        assert_eq!(report.total, 3);
        assert_eq!(report.detail, "ORACLE FAIL b: got 3");
    }

    #[test]
    fn test_parse_without_markers() {
        let report = parse_oracle_output("Traceback ...");
        assert_eq!(report.total, 0);
        assert!(!report.all_passed());
    }
}
