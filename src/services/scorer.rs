//! Provenance and specificity scoring.
//!
//! Provenance is a table lookup against the architectural constants.
//! Specificity runs a two-stage check: a lexical fast path settles clearly
//! generic and clearly concrete descriptions, and only the ambiguous middle
//! is escalated to the judgment capability (or, without one, a
//! deterministic phrase model). Escalated results are memoized per
//! description, in a bounded map, so scoring the same candidate twice yields
//! the same numbers.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::errors::DomainResult;
use crate::domain::models::{ArchitecturalConstants, Candidate, Origin, Provenance, SpecificityPath};
use crate::domain::ports::{parse_score, JudgmentCapability, JudgmentRequest, JudgmentTask};
use crate::services::lexical::{count_matches, normalized, tokenize};

/// Nouns naming a concrete capability or weakness.
const CAPABILITY_TERMS: &[&str] = &[
    "arithmetic", "algebra", "calculus", "geometry", "probability", "statistics", "equation",
    "proof", "theorem", "calculation", "estimation", "memory", "recall", "retrieval", "reasoning",
    "deduction", "inference", "syllogism", "logic", "puzzle", "planning", "parsing", "parser",
    "debugging", "refactoring", "recursion", "sorting", "search", "regex", "sql", "query",
    "concurrency", "async", "test", "testing", "code", "function", "algorithm", "compiler",
    "summarization", "translation", "spelling", "grammar", "citation", "unit conversion",
    "error handling", "edge case", "data structure", "graph", "string", "api",
];

/// Qualifiers that make a capability concrete: scope, speed, accuracy.
const QUALIFIER_TERMS: &[&str] = &[
    "multi-step", "faster", "slower", "quicker", "accurate", "accuracy", "precise", "fewer",
    "longer", "larger", "nested", "complex", "efficient", "reliable", "consistent", "correct",
    "without", "within", "step-by-step", "large", "deep", "edge", "mistakes", "errors",
    "better at", "more accurate", "less often",
];

/// Disposition language: wishes about oneself with no target.
const DISPOSITION_TERMS: &[&str] = &[
    "better", "improve", "grow", "good", "great", "overall", "generally", "everything",
    "myself", "more", "become", "best", "wise", "smarter", "happier", "evolve",
];

const FAST_GENERIC_WORD_LIMIT: usize = 10;

/// Escalated assessments kept before the memo is cleared.
const DEFAULT_MEMO_CAPACITY: usize = 512;

const SPECIFICITY_INSTRUCTION: &str = "Rate how concretely this self-improvement \
description names a specific capability or weakness, from 0.0 (pure disposition, \
no target) to 1.0 (a named skill with a measurable qualifier). Reply with the \
number only.";

/// Specificity score plus how it was obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecificityAssessment {
    pub score: f64,
    pub path: SpecificityPath,
}

/// Scores candidates for provenance and specificity.
pub struct CandidateScorer {
    constants: ArchitecturalConstants,
    judgment: Option<Arc<dyn JudgmentCapability>>,
    memo: RwLock<HashMap<String, SpecificityAssessment>>,
    memo_capacity: usize,
}

impl CandidateScorer {
    pub fn new(constants: ArchitecturalConstants) -> Self {
        Self {
            constants,
            judgment: None,
            memo: RwLock::new(HashMap::new()),
            memo_capacity: DEFAULT_MEMO_CAPACITY,
        }
    }

    /// Bound on memoized escalations. Zero disables the memo.
    pub fn with_memo_capacity(mut self, capacity: usize) -> Self {
        self.memo_capacity = capacity;
        self
    }

    /// Escalate ambiguous descriptions to a judgment capability instead of
    /// the phrase model.
    pub fn with_judgment(mut self, judgment: Arc<dyn JudgmentCapability>) -> Self {
        self.judgment = Some(judgment);
        self
    }

    /// 1.0 for pure reflection, 0.2 for reflection with an attached
    /// external request, 0.0 otherwise.
    pub fn provenance_score(&self, provenance: &Provenance) -> f64 {
        match (provenance.origin, &provenance.external_request) {
            (Origin::Reflection, None) => self.constants.reflection_provenance(),
            (Origin::Reflection, Some(_)) => self.constants.mixed_provenance(),
            _ => self.constants.foreign_provenance(),
        }
    }

    /// Specificity of the candidate's description, in `[0, 1]`.
    ///
    /// Only judgment infrastructure failures are returned as errors.
    pub async fn specificity(&self, candidate: &Candidate) -> DomainResult<SpecificityAssessment> {
        let key = candidate.description.trim().to_lowercase();
        if let Some(hit) = self.memo.read().await.get(&key) {
            return Ok(*hit);
        }

        if let Some(assessment) = fast_path(&candidate.description) {
            return Ok(assessment);
        }
        let assessment = self.escalate(&candidate.description).await?;

        // Only judgment answers can vary between calls.
        if assessment.path == SpecificityPath::Escalated && self.memo_capacity > 0 {
            let mut memo = self.memo.write().await;
            if memo.len() >= self.memo_capacity {
                tracing::debug!(entries = memo.len(), "Specificity memo full, clearing");
                memo.clear();
            }
            memo.insert(key, assessment);
        }
        Ok(assessment)
    }

    async fn escalate(&self, description: &str) -> DomainResult<SpecificityAssessment> {
        let Some(judgment) = &self.judgment else {
            return Ok(phrase_model(description));
        };

        let request = JudgmentRequest::deterministic(
            JudgmentTask::SpecificityCheck,
            SPECIFICITY_INSTRUCTION,
            description,
        );
        let response = judgment.judge(request).await?;
        match parse_score(&response) {
            Some(score) => Ok(SpecificityAssessment {
                score,
                path: SpecificityPath::Escalated,
            }),
            None => {
                tracing::warn!(
                    response = %response,
                    "Unparseable specificity judgment, using phrase model"
                );
                Ok(phrase_model(description))
            }
        }
    }
}

/// Lexical fast path. `None` means the description is ambiguous.
pub fn fast_path(description: &str) -> Option<SpecificityAssessment> {
    let tokens = tokenize(description);
    let text = normalized(&tokens);
    let capabilities = count_matches(CAPABILITY_TERMS, &tokens, &text);
    let qualifiers = count_matches(QUALIFIER_TERMS, &tokens, &text);

    if capabilities == 0 && tokens.len() < FAST_GENERIC_WORD_LIMIT {
        let score = if qualifiers == 0 { 0.1 } else { 0.2 };
        return Some(SpecificityAssessment {
            score,
            path: SpecificityPath::FastGeneric,
        });
    }

    if capabilities > 0 && qualifiers > 0 {
        let extra = (capabilities + qualifiers - 2) as f64;
        return Some(SpecificityAssessment {
            score: (0.8 + 0.05 * extra).min(1.0),
            path: SpecificityPath::FastConcrete,
        });
    }

    None
}

/// Deterministic fallback for ambiguous descriptions. Stays inside the
/// band the fast path does not claim.
pub fn phrase_model(description: &str) -> SpecificityAssessment {
    let tokens = tokenize(description);
    let text = normalized(&tokens);
    let capabilities = count_matches(CAPABILITY_TERMS, &tokens, &text) as f64;
    let qualifiers = count_matches(QUALIFIER_TERMS, &tokens, &text) as f64;
    let dispositions = count_matches(DISPOSITION_TERMS, &tokens, &text) as f64;

    let score = 0.4 + 0.12 * capabilities.min(3.0) + 0.08 * qualifiers.min(2.0)
        - 0.05 * dispositions.min(4.0);
    SpecificityAssessment {
        score: score.clamp(0.2, 0.8),
        path: SpecificityPath::PhraseModel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::judgment::MockJudgment;

    fn scorer() -> CandidateScorer {
        CandidateScorer::new(ArchitecturalConstants::canonical())
    }

    #[test]
    fn test_provenance_table() {
        let s = scorer();
        assert!((s.provenance_score(&Provenance::reflection(vec![])) - 1.0).abs() < f64::EPSILON);
        let mixed = Provenance::reflection(vec![]).with_external_request("please");
        assert!((s.provenance_score(&mixed) - 0.2).abs() < f64::EPSILON);
        assert!(s.provenance_score(&Provenance::external("do it")).abs() < f64::EPSILON);
        assert!(s.provenance_score(&Provenance::bootstrap()).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fast_generic() {
        let a = fast_path("I want to grow and be better").expect("fast path");
        assert_eq!(a.path, SpecificityPath::FastGeneric);
        assert!(a.score <= 0.2);
    }

    #[test]
    fn test_fast_concrete() {
        let a = fast_path("faster multi-step arithmetic").expect("fast path");
        assert_eq!(a.path, SpecificityPath::FastConcrete);
        assert!(a.score >= 0.8);
    }

    #[test]
    fn test_ambiguous_goes_to_phrase_model() {
        assert!(fast_path("I keep thinking about memory").is_none());
        let a = phrase_model("I keep thinking about memory");
        assert!((0.2..=0.8).contains(&a.score));
    }

    #[tokio::test]
    async fn test_escalation_uses_judgment() {
        let judgment = Arc::new(MockJudgment::new().respond(JudgmentTask::SpecificityCheck, "0.55"));
        let s = scorer().with_judgment(judgment.clone());
        let c = Candidate::new("I keep thinking about memory", 1.0, Provenance::reflection(vec![]));

        let first = s.specificity(&c).await.unwrap();
        let second = s.specificity(&c).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.path, SpecificityPath::Escalated);
        assert!((first.score - 0.55).abs() < 1e-9);
        assert_eq!(judgment.calls_for(JudgmentTask::SpecificityCheck), 1);
    }

    #[tokio::test]
    async fn test_memo_holds_only_bounded_escalations() {
        let judgment = Arc::new(MockJudgment::new().respond(JudgmentTask::SpecificityCheck, "0.6"));
        let s = scorer().with_judgment(judgment.clone()).with_memo_capacity(2);

        let concrete = Candidate::new("faster multi-step arithmetic", 1.0, Provenance::reflection(vec![]));
        s.specificity(&concrete).await.unwrap();
        assert!(s.memo.read().await.is_empty());

        for topic in ["memory", "recall", "logic"] {
            let c = Candidate::new(format!("I keep thinking about {topic}"), 1.0, Provenance::reflection(vec![]));
            s.specificity(&c).await.unwrap();
            assert!(s.memo.read().await.len() <= 2);
        }
        assert_eq!(judgment.calls_for(JudgmentTask::SpecificityCheck), 3);

        // The most recent escalation is still served from the memo.
        let last = Candidate::new("I keep thinking about logic", 1.0, Provenance::reflection(vec![]));
        s.specificity(&last).await.unwrap();
        assert_eq!(judgment.calls_for(JudgmentTask::SpecificityCheck), 3);
    }
}
