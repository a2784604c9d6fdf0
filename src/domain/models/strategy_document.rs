//! The two-section strategy document.

use serde::Serialize;
use std::collections::BTreeMap;

use super::classification::PracticeDomain;
use super::heuristic::Heuristic;
use super::practice::VerificationTier;

/// Snapshot of the strategy document.
///
/// `constitution` is fixed at initialization; there is no setter. The
/// `strategies` section is only ever changed through the strategy document
/// service, which appends crystallized heuristics and runs the pruner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyDocument {
    constitution: String,
    strategies: Vec<Heuristic>,
}

impl StrategyDocument {
    pub fn new(constitution: impl Into<String>, mut strategies: Vec<Heuristic>) -> Self {
        strategies.sort_by(|a, b| a.domain.cmp(&b.domain).then(a.added_at.cmp(&b.added_at)));
        Self {
            constitution: constitution.into(),
            strategies,
        }
    }

    pub fn constitution(&self) -> &str {
        &self.constitution
    }

    pub fn strategies(&self) -> &[Heuristic] {
        &self.strategies
    }

    /// Render the mutable section, the part injected into the next
    /// reflection prompt.
    pub fn render_strategies(&self) -> String {
        render_strategies(&self.strategies)
    }

    /// Render both sections.
    pub fn render(&self) -> String {
        format!(
            "# Constitution\n\n{}\n\n{}",
            self.constitution.trim(),
            self.render_strategies()
        )
    }
}

/// Render a set of heuristics as the `Strategies` section.
pub fn render_strategies(heuristics: &[Heuristic]) -> String {
    let mut grouped: BTreeMap<PracticeDomain, Vec<&Heuristic>> = BTreeMap::new();
    for heuristic in heuristics {
        grouped.entry(heuristic.domain).or_default().push(heuristic);
    }

    let mut out = String::from("# Strategies\n");
    if grouped.is_empty() {
        out.push_str("\n(no strategies yet)\n");
        return out;
    }
    for (domain, mut entries) in grouped {
        entries.sort_by_key(|h| h.added_at);
        out.push_str(&format!("\n## {domain}\n\n"));
        for heuristic in entries {
            out.push_str(&format!("- {}", heuristic.content.trim()));
            // Consistency-validated advice is weaker evidence; say so.
            if heuristic.verification == VerificationTier::Consistency {
                out.push_str(" (consistency)");
            }
            out.push('\n');
        }
    }
    out
}
