//! Architectural constants for the emergence gate.
//!
//! These values are not configuration. They are built once at startup,
//! copied by value into every component that needs them, and cannot be
//! constructed with any other values from outside this module.

use serde::Serialize;

/// Gate weights and the provenance score table.
///
/// Fields are private so that no caller, including a meta-level tuning
/// process, can build a variant with different weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArchitecturalConstants {
    provenance_weight: f64,
    specificity_weight: f64,
    reflection_provenance: f64,
    mixed_provenance: f64,
    foreign_provenance: f64,
}

impl ArchitecturalConstants {
    /// The only set of constants the engine runs with.
    pub const fn canonical() -> Self {
        Self {
            provenance_weight: 0.5,
            specificity_weight: 0.5,
            reflection_provenance: 1.0,
            mixed_provenance: 0.2,
            foreign_provenance: 0.0,
        }
    }

    pub const fn provenance_weight(&self) -> f64 {
        self.provenance_weight
    }

    pub const fn specificity_weight(&self) -> f64 {
        self.specificity_weight
    }

    /// Score for a purely self-reflective origin.
    pub const fn reflection_provenance(&self) -> f64 {
        self.reflection_provenance
    }

    /// Score for a reflective origin that also carries an external request.
    pub const fn mixed_provenance(&self) -> f64 {
        self.mixed_provenance
    }

    /// Score for any non-reflective origin.
    pub const fn foreign_provenance(&self) -> f64 {
        self.foreign_provenance
    }

    /// Weighted sum of the two sub-scores.
    pub fn combined_score(&self, provenance: f64, specificity: f64) -> f64 {
        self.provenance_weight * provenance + self.specificity_weight * specificity
    }
}

impl Default for ArchitecturalConstants {
    fn default() -> Self {
        Self::canonical()
    }
}
