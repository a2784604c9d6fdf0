//! Judgment capability port.
//!
//! A single, narrow abstraction over whatever model backs the engine's
//! generative and evaluative calls: specificity checks, problem and oracle
//! generation, solution attempts, logic re-derivations, heuristic
//! extraction and equivalence judgments. The deterministic engine logic
//! depends only on this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainResult;

/// What a judgment call is for. Adapters may route or log by task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgmentTask {
    SpecificityCheck,
    ProblemGeneration,
    OracleGeneration,
    SolutionAttempt,
    LogicDerivation,
    HeuristicExtraction,
    HeuristicEquivalence,
}

impl JudgmentTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SpecificityCheck => "specificity_check",
            Self::ProblemGeneration => "problem_generation",
            Self::OracleGeneration => "oracle_generation",
            Self::SolutionAttempt => "solution_attempt",
            Self::LogicDerivation => "logic_derivation",
            Self::HeuristicExtraction => "heuristic_extraction",
            Self::HeuristicEquivalence => "heuristic_equivalence",
        }
    }
}

/// Sampling regime for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingMode {
    /// Low temperature; used for classification, problem and oracle
    /// generation, extraction.
    Deterministic,
    /// Higher variance; used for solution attempts and re-derivations.
    Exploratory,
}

impl SamplingMode {
    pub fn temperature(&self) -> f32 {
        match self {
            Self::Deterministic => 0.0,
            Self::Exploratory => 0.8,
        }
    }
}

/// A short instruction plus the input text it applies to.
#[derive(Debug, Clone, PartialEq)]
pub struct JudgmentRequest {
    pub task: JudgmentTask,
    pub mode: SamplingMode,
    pub instruction: String,
    pub input: String,
}

impl JudgmentRequest {
    pub fn deterministic(task: JudgmentTask, instruction: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            task,
            mode: SamplingMode::Deterministic,
            instruction: instruction.into(),
            input: input.into(),
        }
    }

    pub fn exploratory(task: JudgmentTask, instruction: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            task,
            mode: SamplingMode::Exploratory,
            instruction: instruction.into(),
            input: input.into(),
        }
    }
}

/// Free-form generative/evaluative capability.
#[async_trait]
pub trait JudgmentCapability: Send + Sync {
    /// Return the raw text response for a request.
    async fn judge(&self, request: JudgmentRequest) -> DomainResult<String>;
}

/// Extract the first number in `text` and clamp it to `[0, 1]`.
///
/// Accepts either a fraction (`0.7`) or a percentage (`70%`).
pub fn parse_score(text: &str) -> Option<f64> {
    let mut number = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() || (c == '.' && !number.is_empty() && !number.contains('.')) {
            number.push(c);
        } else if !number.is_empty() {
            let percent = c == '%';
            return finish_score(&number, percent);
        }
        if number.is_empty() && c == '.' {
            if let Some(next) = chars.peek() {
                if next.is_ascii_digit() {
                    number.push_str("0.");
                }
            }
        }
    }
    finish_score(&number, false)
}

fn finish_score(number: &str, percent: bool) -> Option<f64> {
    let value: f64 = number.trim_end_matches('.').parse().ok()?;
    let value = if percent || value > 1.0 { value / 100.0 } else { value };
    Some(value.clamp(0.0, 1.0))
}

/// Interpret a yes/no answer. Unrecognized answers are `None`.
pub fn parse_yes_no(text: &str) -> Option<bool> {
    let first = text
        .trim()
        .split(|c: char| !c.is_alphanumeric())
        .find(|w| !w.is_empty())?
        .to_ascii_lowercase();
    match first.as_str() {
        "yes" | "true" | "equivalent" | "same" => Some(true),
        "no" | "false" | "different" | "distinct" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_score_fraction() {
        assert_eq!(parse_score("0.72"), Some(0.72));
        assert_eq!(parse_score("Score: 0.4 (moderately specific)"), Some(0.4));
    }

    #[test]
    fn test_parse_score_percent_and_clamp() {
        assert_eq!(parse_score("85%"), Some(0.85));
        assert_eq!(parse_score("1"), Some(1.0));
        assert_eq!(parse_score("150"), Some(1.0));
    }

    #[test]
    fn test_parse_score_leading_dot() {
        assert_eq!(parse_score("about .5"), Some(0.5));
    }

    #[test]
    fn test_parse_score_none() {
        assert_eq!(parse_score("no idea"), None);
    }

    #[test]
    fn test_parse_yes_no() {
        assert_eq!(parse_yes_no("Yes, they say the same thing."), Some(true));
        assert_eq!(parse_yes_no("  no."), Some(false));
        assert_eq!(parse_yes_no("maybe"), None);
    }
}
