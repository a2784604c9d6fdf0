//! Crystallization: distill repeated successes into one heuristic.
//!
//! A domain's first crystallization triggers at the bootstrap threshold;
//! once it has an accepted heuristic, later runs need the steady-state
//! number of successes since the previous run. Every attempt, accepted or
//! not, is recorded as a run, so a rejected extraction resets the count
//! instead of re-firing on every following success.

use std::sync::Arc;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    CrystallizationOutcome, CrystallizationRun, CrystallizerConfig, Heuristic, PracticeDomain,
    Trajectory, VerificationTier,
};
use crate::domain::ports::{parse_yes_no, JudgmentCapability, JudgmentRequest, JudgmentTask, TrajectoryRepository};
use crate::services::lexical::{content_tokens, cosine_similarity, tokenize};
use crate::services::strategy_document::StrategyDocumentService;

const SUMMARY_CHARS: usize = 240;
const MAX_HEURISTIC_WORDS: usize = 40;
const MIN_HEURISTIC_WORDS: usize = 4;
const VERB_WINDOW: usize = 6;

const ACTION_VERBS: &[&str] = &[
    "add", "align", "assert", "avoid", "break", "cache", "check", "compare", "compute",
    "confirm", "convert", "count", "decompose", "define", "derive", "draw", "eliminate",
    "enumerate", "estimate", "factor", "guard", "handle", "identify", "initialize", "isolate",
    "keep", "label", "list", "name", "normalize", "plan", "prefer", "prove", "read", "reduce",
    "remove", "restate", "reuse", "rewrite", "round", "simplify", "sketch", "solve", "sort",
    "split", "start", "substitute", "test", "trace", "track", "translate", "use", "validate",
    "verify", "work", "write",
];

const VAGUE_PHRASES: &[&str] = &[
    "be better", "do your best", "try harder", "work harder", "be careful", "think carefully",
    "stay focused", "pay attention", "keep going", "improve yourself", "do well", "be good",
];

const EXTRACTION_INSTRUCTION: &str = "The trajectories below are successful practice attempts \
in one domain. Write exactly one short imperative sentence (an action verb and its object) \
stating a concrete technique that generalizes across them. Reply with the sentence only.";

const EQUIVALENCE_INSTRUCTION: &str = "Do heuristics A and B below give the same advice? \
Reply yes or no.";

/// Whether a domain is due for crystallization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerCheck {
    pub total_successes: u64,
    pub successes_since_last_run: u64,
    pub threshold: u64,
    pub bootstrapped: bool,
}

impl TriggerCheck {
    pub fn is_due(&self) -> bool {
        self.successes_since_last_run >= self.threshold
    }
}

/// What one call to [`Crystallizer::crystallize`] did.
#[derive(Debug, Clone)]
pub enum CrystallizationResult {
    NotTriggered(TriggerCheck),
    Ran {
        run: CrystallizationRun,
        heuristic: Option<Heuristic>,
        pruned: Vec<Heuristic>,
    },
}

/// Extracts, filters and deduplicates heuristics.
pub struct Crystallizer {
    judgment: Arc<dyn JudgmentCapability>,
    trajectories: Arc<dyn TrajectoryRepository>,
    strategies: Arc<StrategyDocumentService>,
    config: CrystallizerConfig,
}

impl Crystallizer {
    pub fn new(
        judgment: Arc<dyn JudgmentCapability>,
        trajectories: Arc<dyn TrajectoryRepository>,
        strategies: Arc<StrategyDocumentService>,
        config: CrystallizerConfig,
    ) -> Self {
        Self {
            judgment,
            trajectories,
            strategies,
            config,
        }
    }

    pub async fn check_trigger(&self, domain: PracticeDomain) -> DomainResult<TriggerCheck> {
        let runs = self.strategies.crystallization_runs(domain).await?;
        let bootstrapped = runs.iter().any(|r| r.outcome.is_accepted());
        let last = runs.iter().map(|r| r.success_count_at_run).max().unwrap_or(0);
        let total = self.trajectories.count_successes(domain).await?;
        Ok(TriggerCheck {
            total_successes: total,
            successes_since_last_run: total.saturating_sub(last),
            threshold: if bootstrapped {
                self.config.steady_threshold
            } else {
                self.config.bootstrap_threshold
            },
            bootstrapped,
        })
    }

    /// Crystallize `domain` if it is due.
    ///
    /// The whole pass runs under the strategy document's crystallization
    /// lock, so a trigger is acted on at most once.
    pub async fn crystallize(&self, domain: PracticeDomain) -> DomainResult<CrystallizationResult> {
        let _pass = self.strategies.lock_crystallization().await;
        let check = self.check_trigger(domain).await?;
        if !check.is_due() {
            tracing::debug!(
                domain = %domain,
                since = check.successes_since_last_run,
                threshold = check.threshold,
                "Crystallization not due"
            );
            return Ok(CrystallizationResult::NotTriggered(check));
        }

        let successes = self.trajectories.successes(domain).await?;
        let sample = stratified_sample(&successes, self.config.sample_size);
        let input = sample
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}. {}", i + 1, t.summary(SUMMARY_CHARS)))
            .collect::<Vec<_>>()
            .join("\n");

        let raw = self
            .judgment
            .judge(JudgmentRequest::deterministic(
                JudgmentTask::HeuristicExtraction,
                EXTRACTION_INSTRUCTION,
                input,
            ))
            .await?;
        let content = first_sentence(&raw);

        let (outcome, heuristic) = if is_actionable(&content) {
            match self.find_duplicate(domain, &content).await? {
                Some((duplicate_of, similarity)) => (
                    CrystallizationOutcome::RejectedDuplicate {
                        content,
                        duplicate_of,
                        similarity,
                    },
                    None,
                ),
                None => {
                    let verification = weakest_tier(&successes);
                    let heuristic = Heuristic::new(
                        domain,
                        content.clone(),
                        u32::try_from(check.total_successes).unwrap_or(u32::MAX),
                        verification,
                    );
                    (
                        CrystallizationOutcome::Accepted {
                            heuristic_id: heuristic.id,
                            content,
                        },
                        Some(heuristic),
                    )
                }
            }
        } else {
            (CrystallizationOutcome::RejectedVague { content }, None)
        };

        let run = CrystallizationRun::new(domain, check.total_successes, outcome);
        let pruned = self
            .strategies
            .commit_crystallization(heuristic.as_ref(), &run)
            .await?;
        tracing::info!(
            domain = %domain,
            accepted = run.outcome.is_accepted(),
            successes = check.total_successes,
            pruned = pruned.len(),
            "Crystallization run recorded"
        );

        Ok(CrystallizationResult::Ran { run, heuristic, pruned })
    }

    /// Fast lexical similarity against the domain's heuristics, escalating
    /// only the borderline band to a yes/no equivalence judgment.
    async fn find_duplicate(&self, domain: PracticeDomain, content: &str) -> DomainResult<Option<(uuid::Uuid, f64)>> {
        let existing = self.strategies.heuristics_for_domain(domain).await?;
        let closest = existing
            .iter()
            .map(|h| (h, cosine_similarity(content, &h.content)))
            .max_by(|a, b| a.1.total_cmp(&b.1));

        let Some((nearest, similarity)) = closest else {
            return Ok(None);
        };
        if similarity >= self.config.duplicate_cutoff {
            return Ok(Some((nearest.id, similarity)));
        }
        if similarity < self.config.novel_cutoff {
            return Ok(None);
        }

        let answer = self
            .judgment
            .judge(JudgmentRequest::deterministic(
                JudgmentTask::HeuristicEquivalence,
                EQUIVALENCE_INSTRUCTION,
                format!("A: {}\nB: {}", nearest.content, content),
            ))
            .await?;
        // An unreadable answer keeps the document as is.
        let equivalent = parse_yes_no(&answer).unwrap_or(true);
        Ok(equivalent.then_some((nearest.id, similarity)))
    }
}

/// Evenly spaced picks from the oldest, middle and newest thirds of the
/// history (oldest first), so the extractor does not only see recent work.
pub fn stratified_sample(history: &[Trajectory], size: usize) -> Vec<Trajectory> {
    let n = history.len();
    let k = size.min(n);
    if k == 0 {
        return Vec::new();
    }
    if k == n {
        return history.to_vec();
    }

    let bounds = [(0, n / 3), (n / 3, 2 * n / 3), (2 * n / 3, n)];
    let base = k / 3;
    let mut quotas = [base; 3];
    // Remainder goes to the newest strata first.
    for slot in quotas.iter_mut().rev().take(k % 3) {
        *slot += 1;
    }

    let mut picks = Vec::with_capacity(k);
    for ((start, end), quota) in bounds.iter().zip(quotas) {
        let len = end - start;
        let quota = quota.min(len);
        for j in 0..quota {
            picks.push(history[start + j * len / quota].clone());
        }
    }
    picks
}

/// First sentence of the extractor's reply, stripped of list markers and
/// quotes, ending in a period.
pub fn first_sentence(raw: &str) -> String {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    let line = line
        .trim_start_matches(|c: char| c == '-' || c == '*' || c == '•' || c.is_ascii_digit() || c == '.' || c == ')')
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`')
        .trim();
    let sentence = match line.find(". ") {
        Some(end) => &line[..end],
        None => line.trim_end_matches('.'),
    };
    if sentence.is_empty() {
        String::new()
    } else {
        format!("{sentence}.")
    }
}

/// Deterministic actionability check: an action verb early in the
/// sentence, something for it to act on, and no stock vague phrasing.
pub fn is_actionable(sentence: &str) -> bool {
    let tokens = tokenize(sentence);
    if tokens.len() < MIN_HEURISTIC_WORDS || tokens.len() > MAX_HEURISTIC_WORDS {
        return false;
    }
    let lowered = format!(" {} ", tokens.join(" "));
    if VAGUE_PHRASES.iter().any(|p| lowered.contains(&format!(" {p} "))) {
        return false;
    }
    let Some(verb_at) = tokens
        .iter()
        .take(VERB_WINDOW)
        .position(|t| ACTION_VERBS.contains(&t.as_str()))
    else {
        return false;
    };
    let object = tokens[verb_at + 1..].join(" ");
    !content_tokens(&object).is_empty()
}

fn weakest_tier(trajectories: &[Trajectory]) -> VerificationTier {
    trajectories
        .iter()
        .map(|t| t.verification)
        .min()
        .unwrap_or(VerificationTier::Consistency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::judgment::MockJudgment;
    use crate::adapters::memory::{InMemoryStrategyStore, InMemoryTrajectoryLog};
    use crate::domain::models::{CompletedPractice, Oracle, PracticeProblem, StrategyConfig};
    use crate::services::token_counter::TokenCounter;
    use std::time::Duration;
    use uuid::Uuid;

    const EXISTING: &str = "Check units before combining quantities.";

    fn success(index: usize, verification: VerificationTier) -> Trajectory {
        let oracle = match verification {
            VerificationTier::Oracle => Oracle::TestSuite {
                code: "print('ORACLE PASS sum')".to_string(),
            },
            VerificationTier::Consistency => Oracle::Consistency {
                runs: 5,
                divergence_threshold: 0.35,
            },
        };
        Trajectory::from_practice(
            Uuid::new_v4(),
            &CompletedPractice {
                problem: PracticeProblem {
                    id: Uuid::new_v4(),
                    domain: PracticeDomain::Math,
                    difficulty: 1,
                    specification: format!("problem {index}"),
                    oracle,
                },
                solution: "answer".to_string(),
                success: true,
                partial_score: 1.0,
                verification,
                solution_attempts: 1,
                divergence: None,
            },
        )
    }

    struct Fixture {
        judgment: Arc<MockJudgment>,
        trajectories: Arc<InMemoryTrajectoryLog>,
        strategies: Arc<StrategyDocumentService>,
    }

    impl Fixture {
        fn new(judgment: MockJudgment) -> Self {
            Self {
                judgment: Arc::new(judgment),
                trajectories: Arc::new(InMemoryTrajectoryLog::new()),
                strategies: Arc::new(StrategyDocumentService::new(
                    Arc::new(InMemoryStrategyStore::new()),
                    TokenCounter::estimating(),
                    StrategyConfig::default(),
                )),
            }
        }

        fn crystallizer(&self) -> Crystallizer {
            Crystallizer::new(
                self.judgment.clone(),
                self.trajectories.clone(),
                self.strategies.clone(),
                CrystallizerConfig::default(),
            )
        }

        async fn add_successes(&self, count: usize, verification: VerificationTier) {
            for i in 0..count {
                self.trajectories.append(&success(i, verification)).await.unwrap();
            }
        }

        async fn seed_heuristic(&self, content: &str) -> Heuristic {
            let heuristic = Heuristic::new(PracticeDomain::Math, content, 10, VerificationTier::Oracle);
            let run = CrystallizationRun::new(
                PracticeDomain::Math,
                0,
                CrystallizationOutcome::Accepted {
                    heuristic_id: heuristic.id,
                    content: heuristic.content.clone(),
                },
            );
            self.strategies
                .commit_crystallization(Some(&heuristic), &run)
                .await
                .unwrap();
            heuristic
        }
    }

    #[tokio::test]
    async fn test_fresh_domain_bootstraps_at_ten_successes() {
        let fixture = Fixture::new(
            MockJudgment::new().respond(JudgmentTask::HeuristicExtraction, EXISTING),
        );
        let crystallizer = fixture.crystallizer();

        fixture.add_successes(9, VerificationTier::Oracle).await;
        let result = crystallizer.crystallize(PracticeDomain::Math).await.unwrap();
        let CrystallizationResult::NotTriggered(check) = result else {
            panic!("nine successes should not trigger");
        };
        assert_eq!(check.successes_since_last_run, 9);
        assert_eq!(check.threshold, 10);
        assert!(!check.bootstrapped);
        assert_eq!(fixture.judgment.calls_for(JudgmentTask::HeuristicExtraction), 0);

        fixture.add_successes(1, VerificationTier::Oracle).await;
        let result = crystallizer.crystallize(PracticeDomain::Math).await.unwrap();
        let CrystallizationResult::Ran { run, heuristic, .. } = result else {
            panic!("ten successes should trigger");
        };
        assert!(run.outcome.is_accepted());
        assert_eq!(run.success_count_at_run, 10);
        let heuristic = heuristic.unwrap();
        assert_eq!(heuristic.content, EXISTING);
        assert_eq!(heuristic.supporting_trajectory_count, 10);
        assert_eq!(heuristic.verification, VerificationTier::Oracle);

        let check = crystallizer.check_trigger(PracticeDomain::Math).await.unwrap();
        assert!(check.bootstrapped);
        assert_eq!(check.threshold, 20);
        assert_eq!(check.successes_since_last_run, 0);
    }

    #[tokio::test]
    async fn test_heuristic_takes_weakest_supporting_tier() {
        let fixture = Fixture::new(
            MockJudgment::new().respond(JudgmentTask::HeuristicExtraction, EXISTING),
        );
        fixture.add_successes(9, VerificationTier::Oracle).await;
        fixture.add_successes(1, VerificationTier::Consistency).await;

        let result = fixture.crystallizer().crystallize(PracticeDomain::Math).await.unwrap();
        let CrystallizationResult::Ran { heuristic, .. } = result else {
            panic!("expected a run");
        };
        assert_eq!(heuristic.unwrap().verification, VerificationTier::Consistency);
    }

    #[tokio::test]
    async fn test_vague_extraction_is_recorded_and_resets_count() {
        let fixture = Fixture::new(
            MockJudgment::new().respond(JudgmentTask::HeuristicExtraction, "Try harder and be careful."),
        );
        let crystallizer = fixture.crystallizer();
        fixture.add_successes(10, VerificationTier::Oracle).await;

        let result = crystallizer.crystallize(PracticeDomain::Math).await.unwrap();
        let CrystallizationResult::Ran { run, heuristic, .. } = result else {
            panic!("expected a run");
        };
        assert!(matches!(run.outcome, CrystallizationOutcome::RejectedVague { .. }));
        assert!(heuristic.is_none());

        let runs = fixture.strategies.crystallization_runs(PracticeDomain::Math).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert!(fixture.strategies.heuristics_for_domain(PracticeDomain::Math).await.unwrap().is_empty());

        let check = crystallizer.check_trigger(PracticeDomain::Math).await.unwrap();
        assert_eq!(check.successes_since_last_run, 0);
        assert!(!check.bootstrapped);
        assert!(!check.is_due());

        fixture.add_successes(10, VerificationTier::Oracle).await;
        assert!(crystallizer.check_trigger(PracticeDomain::Math).await.unwrap().is_due());
    }

    #[tokio::test]
    async fn test_near_identical_heuristic_is_duplicate_without_judgment() {
        let fixture = Fixture::new(MockJudgment::new());
        let existing = fixture.seed_heuristic(EXISTING).await;

        let found = fixture
            .crystallizer()
            .find_duplicate(PracticeDomain::Math, "Check units before combining quantities carefully.")
            .await
            .unwrap();
        let (id, similarity) = found.unwrap();
        assert_eq!(id, existing.id);
        assert!(similarity >= CrystallizerConfig::default().duplicate_cutoff);
        assert_eq!(fixture.judgment.calls_for(JudgmentTask::HeuristicEquivalence), 0);
    }

    #[tokio::test]
    async fn test_dissimilar_heuristic_is_novel_without_judgment() {
        let fixture = Fixture::new(MockJudgment::new());
        fixture.seed_heuristic(EXISTING).await;

        let found = fixture
            .crystallizer()
            .find_duplicate(PracticeDomain::Math, "Sort the input before searching it.")
            .await
            .unwrap();
        assert!(found.is_none());
        assert_eq!(fixture.judgment.calls_for(JudgmentTask::HeuristicEquivalence), 0);
    }

    #[tokio::test]
    async fn test_borderline_similarity_asks_for_equivalence() {
        let fixture = Fixture::new(
            MockJudgment::new().respond_many(JudgmentTask::HeuristicEquivalence, ["No, different.", "hard to say"]),
        );
        let existing = fixture.seed_heuristic(EXISTING).await;
        let crystallizer = fixture.crystallizer();
        let candidate = "Check units before adding fractions.";
        let similarity = cosine_similarity(candidate, EXISTING);
        assert!(similarity >= 0.5 && similarity < 0.85, "similarity {similarity}");

        let first = crystallizer.find_duplicate(PracticeDomain::Math, candidate).await.unwrap();
        assert!(first.is_none());

        // An unreadable answer counts as a duplicate.
        let second = crystallizer.find_duplicate(PracticeDomain::Math, candidate).await.unwrap();
        assert_eq!(second.map(|(id, _)| id), Some(existing.id));
        assert_eq!(fixture.judgment.calls_for(JudgmentTask::HeuristicEquivalence), 2);
    }

    #[tokio::test]
    async fn test_concurrent_passes_act_on_trigger_once() {
        let fixture = Fixture::new(
            MockJudgment::new()
                .with_latency(Duration::from_millis(20))
                .respond(JudgmentTask::HeuristicExtraction, EXISTING),
        );
        fixture.add_successes(10, VerificationTier::Oracle).await;
        let first = fixture.crystallizer();
        let second = fixture.crystallizer();

        let (a, b) = tokio::join!(
            first.crystallize(PracticeDomain::Math),
            second.crystallize(PracticeDomain::Math)
        );
        let ran = [a.unwrap(), b.unwrap()]
            .iter()
            .filter(|r| matches!(r, CrystallizationResult::Ran { .. }))
            .count();
        assert_eq!(ran, 1);

        let runs = fixture.strategies.crystallization_runs(PracticeDomain::Math).await.unwrap();
        assert_eq!(runs.len(), 1);
        let heuristics = fixture.strategies.heuristics_for_domain(PracticeDomain::Math).await.unwrap();
        assert_eq!(heuristics.len(), 1);
        assert_eq!(fixture.judgment.calls_for(JudgmentTask::HeuristicExtraction), 1);
    }

    #[test]
    fn test_stratified_sample_covers_every_third() {
        let history: Vec<Trajectory> = (0..30).map(|i| success(i, VerificationTier::Oracle)).collect();
        let sample = stratified_sample(&history, 6);
        let picked: Vec<&str> = sample.iter().map(|t| t.problem.specification.as_str()).collect();
        assert_eq!(
            picked,
            vec!["problem 0", "problem 5", "problem 10", "problem 15", "problem 20", "problem 25"]
        );

        let index = |t: &Trajectory| -> usize {
            t.problem.specification.trim_start_matches("problem ").parse().unwrap()
        };
        for (start, end) in [(0, 10), (10, 20), (20, 30)] {
            assert!(sample.iter().any(|t| (start..end).contains(&index(t))));
        }

        assert_eq!(stratified_sample(&history[..4], 12).len(), 4);
        assert!(stratified_sample(&history, 0).is_empty());
    }

    #[test]
    fn test_actionable_sentences() {
        assert!(is_actionable("Check units before combining quantities."));
        assert!(is_actionable("Always write the failing test before the fix."));
        assert!(!is_actionable("Try harder and be careful."));
        assert!(!is_actionable("Math is interesting sometimes."));
        assert!(!is_actionable("Check."));
    }

    #[test]
    fn test_first_sentence_cleanup() {
        assert_eq!(
            first_sentence("\n- \"Check units first. Then add.\"\nextra"),
            "Check units first."
        );
        assert_eq!(first_sentence("1. Sort the input"), "Sort the input.");
        assert_eq!(first_sentence("   "), "");
    }
}
