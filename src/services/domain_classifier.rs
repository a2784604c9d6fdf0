//! Keyword/phrase domain classifier with a fail-closed default.

use std::cmp::Ordering;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ClassifierConfig, DomainClassification, DomainScore, PracticeDomain};
use crate::services::lexical::{normalized, term_matches, tokenize};

/// Weighted vocabulary for one domain.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    pub domain: PracticeDomain,
    pub terms: Vec<(String, f64)>,
}

impl Vocabulary {
    fn new(domain: PracticeDomain, terms: &[(&str, f64)]) -> Self {
        Self {
            domain,
            terms: terms.iter().map(|(t, w)| ((*t).to_string(), *w)).collect(),
        }
    }

    /// Normalizer: the sum of the three heaviest weights. A description
    /// hitting three strong terms saturates the score.
    fn max_score(&self) -> f64 {
        let mut weights: Vec<f64> = self.terms.iter().map(|(_, w)| *w).collect();
        weights.sort_by(|a, b| b.total_cmp(a));
        weights.iter().take(3).sum::<f64>().max(f64::EPSILON)
    }

    fn score(&self, tokens: &[String], text: &str) -> f64 {
        let matched: f64 = self
            .terms
            .iter()
            .filter(|(term, _)| term_matches(term, tokens, text))
            .map(|(_, w)| *w)
            .sum();
        (matched / self.max_score()).clamp(0.0, 1.0)
    }
}

/// The built-in vocabularies, in tie-break order.
pub fn default_vocabularies() -> Vec<Vocabulary> {
    vec![
        Vocabulary::new(
            PracticeDomain::Code,
            &[
                ("code", 1.0), ("coding", 1.0), ("program", 1.0), ("function", 0.8),
                ("debug", 1.0), ("refactor", 0.9), ("compile", 0.9), ("compiler", 0.9),
                ("algorithm", 0.8), ("recursion", 0.8), ("parser", 0.8), ("parsing", 0.8),
                ("regex", 0.9), ("sql", 0.9), ("api", 0.7), ("test", 0.6), ("unit test", 1.0),
                ("bug", 0.8), ("python", 1.0), ("rust", 1.0), ("javascript", 1.0),
                ("data structure", 0.9), ("sorting", 0.7), ("concurrency", 0.9),
                ("error handling", 0.8), ("software", 0.8), ("script", 0.7),
            ],
        ),
        Vocabulary::new(
            PracticeDomain::Math,
            &[
                ("math", 1.0), ("mathematics", 1.0), ("arithmetic", 1.0), ("algebra", 1.0),
                ("calculus", 1.0), ("geometry", 1.0), ("equation", 0.9), ("integral", 0.9),
                ("derivative", 0.8), ("probability", 0.9), ("statistics", 0.9),
                ("multiplication", 0.9), ("division", 0.7), ("fraction", 0.8), ("number", 0.5),
                ("calculation", 0.8), ("compute", 0.5), ("numeric", 0.7), ("matrix", 0.8),
                ("unit conversion", 0.8), ("estimation", 0.6), ("percent", 0.7),
            ],
        ),
        Vocabulary::new(
            PracticeDomain::Logic,
            &[
                ("logic", 1.0), ("logical", 1.0), ("deduction", 1.0), ("deductive", 1.0),
                ("inference", 0.9), ("syllogism", 1.0), ("reasoning", 0.8), ("argument", 0.6),
                ("premise", 0.9), ("conclusion", 0.6), ("fallacy", 0.9), ("contradiction", 0.8),
                ("puzzle", 0.8), ("riddle", 0.7), ("constraint", 0.6), ("proof", 0.7),
                ("implication", 0.8), ("multi-step reasoning", 1.0), ("consistency", 0.6),
            ],
        ),
        Vocabulary::new(
            PracticeDomain::Creative,
            &[
                ("creative", 1.0), ("creativity", 1.0), ("poem", 1.0), ("poetry", 1.0),
                ("story", 0.9), ("stories", 0.9), ("fiction", 0.9), ("narrative", 0.8),
                ("metaphor", 0.8), ("humor", 0.8), ("joke", 0.8), ("art", 0.6),
                ("music", 0.8), ("imagination", 0.9), ("style", 0.5), ("voice", 0.5),
                ("character", 0.6), ("writing", 0.6), ("brainstorm", 0.7),
            ],
        ),
    ]
}

/// Maps accepted candidate text to a practice domain.
pub struct DomainClassifier {
    vocabularies: Vec<Vocabulary>,
    confidence_floor: f64,
    secondary_ratio: f64,
}

impl DomainClassifier {
    pub fn new(config: &ClassifierConfig) -> DomainResult<Self> {
        Self::with_vocabularies(default_vocabularies(), config)
    }

    /// Build with custom (e.g. recalibrated) vocabularies.
    pub fn with_vocabularies(vocabularies: Vec<Vocabulary>, config: &ClassifierConfig) -> DomainResult<Self> {
        if !(0.0..1.0).contains(&config.confidence_floor) {
            return Err(DomainError::ValidationFailed(format!(
                "confidence_floor must be within [0, 1), got {}",
                config.confidence_floor
            )));
        }
        if !(0.0..=1.0).contains(&config.secondary_ratio) {
            return Err(DomainError::ValidationFailed(format!(
                "secondary_ratio must be within [0, 1], got {}",
                config.secondary_ratio
            )));
        }
        if vocabularies.iter().any(|v| !v.domain.permits_practice() && v.domain != PracticeDomain::Creative) {
            return Err(DomainError::ValidationFailed(
                "ambiguous is a fallback, not a vocabulary".to_string(),
            ));
        }
        Ok(Self {
            vocabularies,
            confidence_floor: config.confidence_floor,
            secondary_ratio: config.secondary_ratio,
        })
    }

    /// Classify a description. `domain_hint` only breaks exact ties.
    pub fn classify(&self, description: &str, domain_hint: Option<&str>) -> DomainClassification {
        let tokens = tokenize(description);
        let text = normalized(&tokens);
        let hint: Option<PracticeDomain> = domain_hint.and_then(|h| h.parse().ok());

        let scores: Vec<DomainScore> = self
            .vocabularies
            .iter()
            .map(|v| DomainScore {
                domain: v.domain,
                score: v.score(&tokens, &text),
            })
            .collect();

        // Stable sort keeps vocabulary order among equal scores; the hint
        // is promoted within its tie group.
        let mut ranked = scores.clone();
        ranked.sort_by(|a, b| match b.score.total_cmp(&a.score) {
            Ordering::Equal => match (Some(a.domain) == hint, Some(b.domain) == hint) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => Ordering::Equal,
            },
            other => other,
        });

        let top = ranked.first().copied().unwrap_or(DomainScore {
            domain: PracticeDomain::Ambiguous,
            score: 0.0,
        });

        if top.score < self.confidence_floor {
            return DomainClassification {
                primary_domain: PracticeDomain::Ambiguous,
                primary_confidence: top.score,
                secondary_domain: None,
                scores,
            };
        }

        let secondary_domain = ranked
            .get(1)
            .filter(|s| s.score > 0.0 && s.score >= self.secondary_ratio * top.score)
            .map(|s| s.domain);

        DomainClassification {
            primary_domain: top.domain,
            primary_confidence: top.score,
            secondary_domain,
            scores,
        }
    }
}
