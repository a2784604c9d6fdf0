//! Improvement candidates and their provenance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// Where a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Produced by the agent's own reflection step.
    Reflection,
    /// Explicitly requested by a human or another system.
    ExternalRequest,
    /// Seeded at system initialization.
    Bootstrap,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reflection => "reflection",
            Self::ExternalRequest => "external_request",
            Self::Bootstrap => "bootstrap",
        }
    }
}

/// Recorded origin of a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub origin: Origin,
    /// Opaque references to the reflections/experiences behind the candidate.
    #[serde(default)]
    pub source_ids: Vec<String>,
    /// Non-null only if someone explicitly asked for this improvement.
    #[serde(default)]
    pub external_request: Option<String>,
}

impl Provenance {
    pub fn reflection(source_ids: Vec<String>) -> Self {
        Self {
            origin: Origin::Reflection,
            source_ids,
            external_request: None,
        }
    }

    pub fn external(request: impl Into<String>) -> Self {
        Self {
            origin: Origin::ExternalRequest,
            source_ids: Vec::new(),
            external_request: Some(request.into()),
        }
    }

    pub fn bootstrap() -> Self {
        Self {
            origin: Origin::Bootstrap,
            source_ids: Vec::new(),
            external_request: None,
        }
    }

    /// Attach an external request to an otherwise reflective provenance.
    pub fn with_external_request(mut self, request: impl Into<String>) -> Self {
        self.external_request = Some(request.into());
        self
    }
}

/// A proposed improvement awaiting admission.
///
/// Created once per reflection cycle and consumed exactly once by the
/// emergence gate. The description is opaque text: nothing downstream
/// coerces it into a fixed vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub description: String,
    /// Caller-supplied relative weight, strictly positive.
    pub intensity: f64,
    pub provenance: Provenance,
    #[serde(default)]
    pub domain_hint: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Candidate {
    pub fn new(description: impl Into<String>, intensity: f64, provenance: Provenance) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            intensity,
            provenance,
            domain_hint: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_domain_hint(mut self, hint: impl Into<String>) -> Self {
        self.domain_hint = Some(hint.into());
        self
    }

    /// Check the structural contract: non-empty description and a finite,
    /// strictly positive intensity.
    pub fn validate(&self) -> DomainResult<()> {
        if self.description.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "candidate description cannot be empty".to_string(),
            ));
        }
        if !self.intensity.is_finite() || self.intensity <= 0.0 {
            return Err(DomainError::ValidationFailed(format!(
                "candidate intensity must be positive and finite, got {}",
                self.intensity
            )));
        }
        Ok(())
    }
}
