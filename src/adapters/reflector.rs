//! Reflector adapters: fixed candidate lists and JSON candidate files.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Candidate;
use crate::domain::ports::{ReflectionContext, Reflector};

/// Returns the same candidates on every call.
#[derive(Debug, Clone, Default)]
pub struct StaticReflector {
    candidates: Vec<Candidate>,
}

impl StaticReflector {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }
}

#[async_trait]
impl Reflector for StaticReflector {
    async fn reflect(&self, _context: &ReflectionContext) -> DomainResult<Vec<Candidate>> {
        Ok(self.candidates.clone())
    }
}

/// Accepted candidate file layouts: a bare array or `{"candidates": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum CandidateFile {
    List(Vec<Candidate>),
    Wrapped { candidates: Vec<Candidate> },
}

impl CandidateFile {
    fn into_candidates(self) -> Vec<Candidate> {
        match self {
            Self::List(candidates) | Self::Wrapped { candidates } => candidates,
        }
    }
}

/// Parse a candidate file body.
pub fn parse_candidates(json: &str) -> DomainResult<Vec<Candidate>> {
    let file: CandidateFile = serde_json::from_str(json)?;
    Ok(file.into_candidates())
}

/// Reads candidates from a JSON file each time it reflects, so an external
/// process can rewrite the file between cycles.
#[derive(Debug, Clone)]
pub struct JsonFileReflector {
    path: PathBuf,
}

impl JsonFileReflector {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl Reflector for JsonFileReflector {
    async fn reflect(&self, _context: &ReflectionContext) -> DomainResult<Vec<Candidate>> {
        let body = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            DomainError::ReflectionUnavailable(format!("{}: {e}", self.path.display()))
        })?;
        let candidates = parse_candidates(&body)?;
        tracing::debug!(path = %self.path.display(), count = candidates.len(), "Loaded candidates");
        Ok(candidates)
    }
}
