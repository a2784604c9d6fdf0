//! Oracle-constrained practice.
//!
//! Code and math: generate a problem, then its test-suite oracle, validate
//! the oracle, and only then ask for a solution. The solution runs against
//! the oracle under a time bound, with one feedback retry. Logic: generate
//! a problem and re-derive its answer several times, scoring agreement.
//! Creative and ambiguous candidates are blocked.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    CompletedPractice, Oracle, OracleReport, PracticeConfig, PracticeDomain, PracticeOutcome,
    PracticeProblem, VerificationTier, NO_ORACLE_REASON,
};
use crate::domain::ports::{JudgmentCapability, JudgmentRequest, JudgmentTask, OracleExecutor};
use crate::services::lexical::jaccard_distance;

pub const PASS_MARKER: &str = "ORACLE PASS";
pub const FAIL_MARKER: &str = "ORACLE FAIL";

const ANSWER_PREFIX: &str = "ANSWER:";

/// Runs one practice attempt for an accepted, routed candidate.
pub struct PracticeRunner {
    judgment: Arc<dyn JudgmentCapability>,
    executor: Arc<dyn OracleExecutor>,
    config: PracticeConfig,
}

impl PracticeRunner {
    pub fn new(
        judgment: Arc<dyn JudgmentCapability>,
        executor: Arc<dyn OracleExecutor>,
        config: PracticeConfig,
    ) -> Self {
        Self {
            judgment,
            executor,
            config,
        }
    }

    /// Practice `description` in `domain` at `difficulty`.
    ///
    /// Generation failures, blocked domains and failed solutions are all
    /// values. Only infrastructure failures are errors.
    pub async fn run(
        &self,
        description: &str,
        domain: PracticeDomain,
        difficulty: u8,
    ) -> DomainResult<PracticeOutcome> {
        match domain {
            PracticeDomain::Code | PracticeDomain::Math => {
                self.run_oracle_practice(description, domain, difficulty).await
            }
            PracticeDomain::Logic => self.run_consistency_practice(description, difficulty).await,
            PracticeDomain::Creative | PracticeDomain::Ambiguous => {
                tracing::info!(domain = %domain, reason = NO_ORACLE_REASON, "Practice blocked");
                Ok(PracticeOutcome::Blocked {
                    domain,
                    reason: NO_ORACLE_REASON.to_string(),
                })
            }
        }
    }

    // ------------------------------------------------------------------
    // Code / math
    // ------------------------------------------------------------------

    async fn run_oracle_practice(
        &self,
        description: &str,
        domain: PracticeDomain,
        difficulty: u8,
    ) -> DomainResult<PracticeOutcome> {
        let problem = match self.generate_problem_with_oracle(description, domain, difficulty).await? {
            Ok(problem) => problem,
            Err(failure) => return Ok(failure),
        };
        let Oracle::TestSuite { code: oracle_code } = &problem.oracle else {
            return Err(DomainError::ValidationFailed(
                "code and math problems carry a test-suite oracle".to_string(),
            ));
        };

        let mut solution = self.attempt_solution(&problem.specification, None).await?;
        let mut report = self.execute_bounded(&problem, oracle_code, &solution).await?;
        let mut attempts = 1;

        if !report.all_passed() {
            tracing::debug!(problem = %problem.id, detail = %report.detail, "First solution failed, retrying with feedback");
            let feedback = Feedback {
                previous_solution: &solution,
                report: &report,
            };
            solution = self.attempt_solution(&problem.specification, Some(feedback)).await?;
            report = self.execute_bounded(&problem, oracle_code, &solution).await?;
            attempts = 2;
        }

        tracing::info!(
            domain = %domain,
            difficulty,
            passed = report.passed,
            total = report.total,
            timed_out = report.timed_out,
            "Practice attempt scored against oracle"
        );

        Ok(PracticeOutcome::Completed(CompletedPractice {
            success: report.all_passed(),
            partial_score: report.fraction(),
            verification: VerificationTier::Oracle,
            solution_attempts: attempts,
            divergence: None,
            solution,
            problem,
        }))
    }

    /// Generate the specification, then the oracle, retrying up to the
    /// configured bound. The inner `Err` is a `GenerationFailed` outcome.
    async fn generate_problem_with_oracle(
        &self,
        description: &str,
        domain: PracticeDomain,
        difficulty: u8,
    ) -> DomainResult<Result<PracticeProblem, PracticeOutcome>> {
        let attempts = self.config.generation_attempts.max(1);
        let mut specification: Option<String> = None;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            if specification.is_none() {
                let text = self
                    .judgment
                    .judge(JudgmentRequest::deterministic(
                        JudgmentTask::ProblemGeneration,
                        problem_instruction(domain, difficulty, self.config.max_difficulty),
                        description,
                    ))
                    .await?;
                if text.trim().is_empty() {
                    last_error = "empty problem specification".to_string();
                    tracing::warn!(attempt, "Problem generation returned nothing");
                    continue;
                }
                specification = Some(text.trim().to_string());
            }
            let Some(spec) = specification.as_deref() else {
                continue;
            };

            let oracle_text = self
                .judgment
                .judge(JudgmentRequest::deterministic(
                    JudgmentTask::OracleGeneration,
                    ORACLE_INSTRUCTION,
                    spec,
                ))
                .await?;
            let code = extract_code(&oracle_text);
            match validate_oracle_structure(&code) {
                Ok(()) => {
                    return Ok(Ok(PracticeProblem {
                        id: Uuid::new_v4(),
                        domain,
                        difficulty,
                        specification: spec.to_string(),
                        oracle: Oracle::TestSuite { code },
                    }));
                }
                Err(reason) => {
                    tracing::warn!(attempt, reason = %reason, "Generated oracle is invalid");
                    last_error = reason;
                }
            }
        }

        Ok(Err(PracticeOutcome::GenerationFailed {
            domain,
            attempts,
            last_error,
        }))
    }

    async fn attempt_solution(&self, specification: &str, feedback: Option<Feedback<'_>>) -> DomainResult<String> {
        let input = match feedback {
            None => specification.to_string(),
            Some(f) => format!(
                "{specification}\n\nYour previous solution:\n{}\n\nIt failed the hidden checks ({} of {} passed{}):\n{}",
                f.previous_solution,
                f.report.passed,
                f.report.total,
                if f.report.timed_out { ", timed out" } else { "" },
                f.report.detail
            ),
        };
        let text = self
            .judgment
            .judge(JudgmentRequest::exploratory(
                JudgmentTask::SolutionAttempt,
                SOLUTION_INSTRUCTION,
                input,
            ))
            .await?;
        Ok(extract_code(&text))
    }

    /// Run the solution against the oracle. Exceeding the bound drops the
    /// execution future and counts as a failed attempt.
    async fn execute_bounded(
        &self,
        problem: &PracticeProblem,
        oracle_code: &str,
        solution: &str,
    ) -> DomainResult<OracleReport> {
        let limit = self.config.solution_timeout_secs;
        match tokio::time::timeout(
            Duration::from_secs(limit),
            self.executor.execute(problem, oracle_code, solution),
        )
        .await
        {
            Err(_) => {
                tracing::warn!(problem = %problem.id, limit, "Solution run timed out");
                Ok(OracleReport::timed_out(limit))
            }
            Ok(Ok(report)) => Ok(report),
            Ok(Err(DomainError::OracleExecutionFailed(detail))) => Ok(OracleReport::failed(detail)),
            Ok(Err(e)) => Err(e),
        }
    }

    // ------------------------------------------------------------------
    // Logic
    // ------------------------------------------------------------------

    async fn run_consistency_practice(&self, description: &str, difficulty: u8) -> DomainResult<PracticeOutcome> {
        let domain = PracticeDomain::Logic;
        let attempts = self.config.generation_attempts.max(1);
        let mut specification = None;
        for attempt in 1..=attempts {
            let text = self
                .judgment
                .judge(JudgmentRequest::deterministic(
                    JudgmentTask::ProblemGeneration,
                    problem_instruction(domain, difficulty, self.config.max_difficulty),
                    description,
                ))
                .await?;
            if text.trim().is_empty() {
                tracing::warn!(attempt, "Logic problem generation returned nothing");
            } else {
                specification = Some(text.trim().to_string());
                break;
            }
        }
        let Some(specification) = specification else {
            return Ok(PracticeOutcome::GenerationFailed {
                domain,
                attempts,
                last_error: "empty problem specification".to_string(),
            });
        };

        let runs = self.config.consistency_runs.max(2);
        let threshold = self.config.divergence_threshold;
        let mut answers = Vec::with_capacity(runs as usize);
        for _ in 0..runs {
            let text = self
                .judgment
                .judge(JudgmentRequest::exploratory(
                    JudgmentTask::LogicDerivation,
                    DERIVATION_INSTRUCTION,
                    specification.as_str(),
                ))
                .await?;
            answers.push(extract_answer(&text));
        }

        let divergence = mean_pairwise_divergence(&answers);
        let success = divergence <= threshold;
        tracing::info!(runs, divergence, threshold, success, "Logic consistency check");

        Ok(PracticeOutcome::Completed(CompletedPractice {
            problem: PracticeProblem {
                id: Uuid::new_v4(),
                domain,
                difficulty,
                specification,
                oracle: Oracle::Consistency {
                    runs,
                    divergence_threshold: threshold,
                },
            },
            solution: modal_answer(&answers),
            success,
            partial_score: (1.0 - divergence).clamp(0.0, 1.0),
            verification: VerificationTier::Consistency,
            solution_attempts: runs,
            divergence: Some(divergence),
        }))
    }
}

struct Feedback<'a> {
    previous_solution: &'a str,
    report: &'a OracleReport,
}

const ORACLE_INSTRUCTION: &str = "Write a self-contained test script for the problem below, \
before any solution exists. Import the solution with `from solution import *`. Run every \
check independently and print exactly one line per check: `ORACLE PASS <name>` or \
`ORACLE FAIL <name>: <detail>`. Do not solve the problem inside the test script. Reply \
with the script only.";

const SOLUTION_INSTRUCTION: &str = "Solve the problem below. Reply with a single code block \
defining everything the problem asks for. Do not include tests.";

const DERIVATION_INSTRUCTION: &str = "Work through the problem below independently, step by \
step. End with one line of the form `ANSWER: <final answer>`.";

fn problem_instruction(domain: PracticeDomain, difficulty: u8, max: u8) -> String {
    format!(
        "Write one self-contained {domain} practice problem, difficulty {difficulty} of {max}, \
that exercises the capability described below. State inputs, expected outputs and any \
function names precisely. Do not include a solution."
    )
}

/// Strip a fenced code block if present; otherwise return trimmed text.
pub fn extract_code(text: &str) -> String {
    let Some(start) = text.find("```") else {
        return text.trim().to_string();
    };
    let after_fence = &text[start + 3..];
    let body = match after_fence.find('\n') {
        Some(newline) => &after_fence[newline + 1..],
        None => after_fence,
    };
    match body.find("```") {
        Some(end) => body[..end].trim().to_string(),
        None => body.trim().to_string(),
    }
}

/// Structural validity of a test-suite oracle: non-empty, reports through
/// both markers, and brackets balance outside strings and comments.
pub fn validate_oracle_structure(code: &str) -> Result<(), String> {
    if code.trim().is_empty() {
        return Err("oracle is empty".to_string());
    }
    if !code.contains(PASS_MARKER) || !code.contains(FAIL_MARKER) {
        return Err(format!("oracle must report with `{PASS_MARKER}` and `{FAIL_MARKER}`"));
    }

    let mut stack = Vec::new();
    let mut chars = code.chars();
    while let Some(c) = chars.next() {
        match c {
            '#' => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        break;
                    }
                }
            }
            '"' | '\'' => {
                let mut escaped = false;
                let mut closed = false;
                for s in chars.by_ref() {
                    if escaped {
                        escaped = false;
                    } else if s == '\\' {
                        escaped = true;
                    } else if s == c {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err("unterminated string literal".to_string());
                }
            }
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if stack.pop() != Some(expected) {
                    return Err(format!("unbalanced `{c}`"));
                }
            }
            _ => {}
        }
    }
    if let Some(open) = stack.pop() {
        return Err(format!("unclosed `{open}`"));
    }
    Ok(())
}

/// Text after the last `ANSWER:` marker, else the last non-empty line.
pub fn extract_answer(text: &str) -> String {
    if let Some(pos) = text.rfind(ANSWER_PREFIX) {
        return text[pos + ANSWER_PREFIX.len()..].trim().to_string();
    }
    text.lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("")
        .trim()
        .to_string()
}

/// Mean Jaccard distance over all answer pairs.
pub fn mean_pairwise_divergence(answers: &[String]) -> f64 {
    let mut total = 0.0;
    let mut pairs = 0usize;
    for (i, a) in answers.iter().enumerate() {
        for b in &answers[i + 1..] {
            total += jaccard_distance(a, b);
            pairs += 1;
        }
    }
    if pairs == 0 {
        0.0
    } else {
        total / pairs as f64
    }
}

/// Most frequent answer, ties going to the earliest.
fn modal_answer(answers: &[String]) -> String {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for answer in answers {
        *counts.entry(answer.trim().to_lowercase()).or_insert(0) += 1;
    }
    let best = answers
        .iter()
        .map(|a| counts.get(&a.trim().to_lowercase()).copied().unwrap_or(0))
        .max()
        .unwrap_or(0);
    answers
        .iter()
        .find(|a| counts.get(&a.trim().to_lowercase()).copied().unwrap_or(0) == best)
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::judgment::MockJudgment;
    use crate::adapters::oracle::ScriptedOracleExecutor;

    const GOOD_ORACLE: &str = "```python\nfrom solution import *\nif add(2, 2) == 4:\n    print('ORACLE PASS add')\nelse:\n    print('ORACLE FAIL add')\n```";

    fn report(passed: u32, total: u32) -> OracleReport {
        OracleReport {
            passed,
            total,
            timed_out: false,
            detail: String::new(),
        }
    }

    fn runner(judgment: MockJudgment, executor: ScriptedOracleExecutor) -> PracticeRunner {
        PracticeRunner::new(Arc::new(judgment), Arc::new(executor), PracticeConfig::default())
    }

    #[test]
    fn test_oracle_structure() {
        assert!(validate_oracle_structure(&extract_code(GOOD_ORACLE)).is_ok());
        assert!(validate_oracle_structure("").is_err());
        assert!(validate_oracle_structure("print('ORACLE PASS x')").is_err());
        assert!(validate_oracle_structure("print('ORACLE PASS (x'); print(\"ORACLE FAIL\"").is_err());
        assert!(validate_oracle_structure("# ( stray\nprint('ORACLE PASS'); print('ORACLE FAIL')").is_ok());
    }

    #[test]
    fn test_extract_answer() {
        assert_eq!(extract_answer("steps...\nANSWER: Alice is the knight"), "Alice is the knight");
        assert_eq!(extract_answer("first\nlast line\n\n"), "last line");
    }

    #[test]
    fn test_divergence() {
        let same = vec!["x".to_string(); 5];
        assert!(mean_pairwise_divergence(&same).abs() < f64::EPSILON);
        let split = vec!["alice".to_string(), "bob".to_string()];
        assert!((mean_pairwise_divergence(&split) - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_blocked_domains_do_not_call_judgment() {
        let judgment = MockJudgment::new();
        let r = runner(judgment, ScriptedOracleExecutor::new(vec![]));
        let outcome = r.run("funnier jokes", PracticeDomain::Creative, 1).await.unwrap();
        assert!(matches!(outcome, PracticeOutcome::Blocked { ref reason, .. } if reason == NO_ORACLE_REASON));
    }

    #[tokio::test]
    async fn test_oracle_generated_before_solution() {
        let judgment = Arc::new(
            MockJudgment::new()
                .respond(JudgmentTask::ProblemGeneration, "Implement add(a, b).")
                .respond(JudgmentTask::OracleGeneration, GOOD_ORACLE)
                .respond(JudgmentTask::SolutionAttempt, "def add(a, b):\n    return a + b"),
        );
        let r = PracticeRunner::new(
            judgment.clone(),
            Arc::new(ScriptedOracleExecutor::new(vec![report(1, 1)])),
            PracticeConfig::default(),
        );
        let outcome = r.run("arithmetic", PracticeDomain::Math, 1).await.unwrap();
        let PracticeOutcome::Completed(done) = outcome else {
            panic!("expected completed practice");
        };
        assert!(done.success);
        assert_eq!(done.solution_attempts, 1);

        let order: Vec<JudgmentTask> = judgment.calls().iter().map(|c| c.task).collect();
        let oracle_at = order.iter().position(|t| *t == JudgmentTask::OracleGeneration).unwrap();
        let solution_at = order.iter().position(|t| *t == JudgmentTask::SolutionAttempt).unwrap();
        assert!(oracle_at < solution_at);
    }

    #[tokio::test]
    async fn test_invalid_oracles_exhaust_attempts() {
        let judgment = MockJudgment::new()
            .respond(JudgmentTask::ProblemGeneration, "Implement add(a, b).")
            .respond(JudgmentTask::OracleGeneration, "assert add(1, 1) == 2");
        let r = runner(judgment, ScriptedOracleExecutor::new(vec![]));
        let outcome = r.run("arithmetic", PracticeDomain::Code, 1).await.unwrap();
        assert!(matches!(outcome, PracticeOutcome::GenerationFailed { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_failed_solution_retried_once_with_partial_score() {
        let judgment = Arc::new(
            MockJudgment::new()
                .respond(JudgmentTask::ProblemGeneration, "Implement add(a, b).")
                .respond(JudgmentTask::OracleGeneration, GOOD_ORACLE)
                .respond(JudgmentTask::SolutionAttempt, "def add(a, b): return a - b"),
        );
        let r = PracticeRunner::new(
            judgment.clone(),
            Arc::new(ScriptedOracleExecutor::new(vec![report(1, 4), report(3, 4)])),
            PracticeConfig::default(),
        );
        let PracticeOutcome::Completed(done) = r.run("arithmetic", PracticeDomain::Math, 2).await.unwrap() else {
            panic!("expected completed practice");
        };
        assert!(!done.success);
        assert_eq!(done.solution_attempts, 2);
        assert!((done.partial_score - 0.75).abs() < f64::EPSILON);
        assert_eq!(judgment.calls_for(JudgmentTask::SolutionAttempt), 2);
        let calls = judgment.calls();
        let retry = calls.last().unwrap();
        assert!(retry.input.contains("previous solution"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_a_failed_attempt() {
        let judgment = MockJudgment::new()
            .respond(JudgmentTask::ProblemGeneration, "Implement add(a, b).")
            .respond(JudgmentTask::OracleGeneration, GOOD_ORACLE)
            .respond(JudgmentTask::SolutionAttempt, "while True: pass");
        let executor = ScriptedOracleExecutor::new(vec![report(1, 1)]).with_delay(Duration::from_secs(600));
        let r = runner(judgment, executor);
        let PracticeOutcome::Completed(done) = r.run("loops", PracticeDomain::Code, 1).await.unwrap() else {
            panic!("expected completed practice");
        };
        assert!(!done.success);
        assert!(done.partial_score.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_logic_consistency_tagged_weaker() {
        let judgment = MockJudgment::new()
            .respond(JudgmentTask::ProblemGeneration, "Knights always tell the truth...")
            .respond(JudgmentTask::LogicDerivation, "reasoning\nANSWER: Alice is the knight");
        let r = runner(judgment, ScriptedOracleExecutor::new(vec![]));
        let PracticeOutcome::Completed(done) = r.run("deduction", PracticeDomain::Logic, 1).await.unwrap() else {
            panic!("expected completed practice");
        };
        assert!(done.success);
        assert_eq!(done.verification, VerificationTier::Consistency);
        assert_eq!(done.divergence, Some(0.0));
        assert_eq!(done.solution_attempts, 5);
    }

    #[tokio::test]
    async fn test_logic_high_divergence_is_recorded_weakness() {
        let judgment = MockJudgment::new()
            .respond(JudgmentTask::ProblemGeneration, "Who is the knave?")
            .respond_many(
                JudgmentTask::LogicDerivation,
                ["ANSWER: alice", "ANSWER: bob", "ANSWER: carol", "ANSWER: dave", "ANSWER: erin"],
            );
        let r = runner(judgment, ScriptedOracleExecutor::new(vec![]));
        let PracticeOutcome::Completed(done) = r.run("deduction", PracticeDomain::Logic, 1).await.unwrap() else {
            panic!("expected completed practice");
        };
        assert!(!done.success);
        assert!(done.partial_score.abs() < f64::EPSILON);
    }
}
