use serde::{Deserialize, Serialize};

/// Main configuration structure for the emergence engine
///
/// Gate weights and the selection algorithm are deliberately absent: they
/// are architectural constants, not configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Shared limiter for external judgment and random calls
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Emergence gate configuration
    #[serde(default)]
    pub gate: GateConfig,

    /// Domain classifier configuration
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Practice runner configuration
    #[serde(default)]
    pub practice: PracticeConfig,

    /// Crystallizer configuration
    #[serde(default)]
    pub crystallizer: CrystallizerConfig,

    /// Strategy document budget and pruning
    #[serde(default)]
    pub strategy: StrategyConfig,

    /// External random source
    #[serde(default)]
    pub random: RandomConfig,

    /// Judgment capability backend
    #[serde(default)]
    pub judgment: JudgmentConfig,

    /// Oracle execution
    #[serde(default)]
    pub oracle: OracleConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".emergence/emergence.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation policy for file logs: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RateLimitConfig {
    /// Minimum interval between two external calls, in milliseconds
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Maximum number of external calls per window
    #[serde(default = "default_requests_per_window")]
    pub requests_per_window: u32,

    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

const fn default_min_interval_ms() -> u64 {
    200
}

const fn default_requests_per_window() -> u32 {
    50
}

const fn default_window_secs() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
            requests_per_window: default_requests_per_window(),
            window_secs: default_window_secs(),
        }
    }
}

/// Emergence gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GateConfig {
    /// Minimum combined score for admission
    #[serde(default = "default_gate_threshold")]
    pub threshold: f64,
}

const fn default_gate_threshold() -> f64 {
    0.65
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            threshold: default_gate_threshold(),
        }
    }
}

/// Domain classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClassifierConfig {
    /// Top scores below this floor classify as ambiguous
    #[serde(default = "default_confidence_floor")]
    pub confidence_floor: f64,

    /// Second-best score must reach this fraction of the top score to be
    /// reported as secondary
    #[serde(default = "default_secondary_ratio")]
    pub secondary_ratio: f64,
}

const fn default_confidence_floor() -> f64 {
    0.15
}

const fn default_secondary_ratio() -> f64 {
    0.5
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            confidence_floor: default_confidence_floor(),
            secondary_ratio: default_secondary_ratio(),
        }
    }
}

/// Practice runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PracticeConfig {
    /// Bound on problem/oracle generation attempts
    #[serde(default = "default_generation_attempts")]
    pub generation_attempts: u32,

    /// Execution bound for one solution run, in seconds
    #[serde(default = "default_solution_timeout_secs")]
    pub solution_timeout_secs: u64,

    /// Independent re-derivations for the logic consistency check
    #[serde(default = "default_consistency_runs")]
    pub consistency_runs: u32,

    /// Maximum mean pairwise divergence for a consistency success
    #[serde(default = "default_divergence_threshold")]
    pub divergence_threshold: f64,

    /// Consecutive successes that raise difficulty
    #[serde(default = "default_success_streak")]
    pub success_streak: u32,

    /// Consecutive failures that lower difficulty
    #[serde(default = "default_failure_streak")]
    pub failure_streak: u32,

    /// Highest difficulty level
    #[serde(default = "default_max_difficulty")]
    pub max_difficulty: u8,
}

const fn default_generation_attempts() -> u32 {
    3
}

const fn default_solution_timeout_secs() -> u64 {
    30
}

const fn default_consistency_runs() -> u32 {
    5
}

const fn default_divergence_threshold() -> f64 {
    0.35
}

const fn default_success_streak() -> u32 {
    3
}

const fn default_failure_streak() -> u32 {
    2
}

const fn default_max_difficulty() -> u8 {
    5
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            generation_attempts: default_generation_attempts(),
            solution_timeout_secs: default_solution_timeout_secs(),
            consistency_runs: default_consistency_runs(),
            divergence_threshold: default_divergence_threshold(),
            success_streak: default_success_streak(),
            failure_streak: default_failure_streak(),
            max_difficulty: default_max_difficulty(),
        }
    }
}

/// Crystallizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CrystallizerConfig {
    /// Successes needed for a domain's first crystallization
    #[serde(default = "default_bootstrap_threshold")]
    pub bootstrap_threshold: u64,

    /// Successes since the last run needed afterwards
    #[serde(default = "default_steady_threshold")]
    pub steady_threshold: u64,

    /// Trajectories presented to the extractor
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Similarity at or above which a heuristic is a duplicate
    #[serde(default = "default_duplicate_cutoff")]
    pub duplicate_cutoff: f64,

    /// Similarity below which a heuristic is novel without further checks
    #[serde(default = "default_novel_cutoff")]
    pub novel_cutoff: f64,
}

const fn default_bootstrap_threshold() -> u64 {
    10
}

const fn default_steady_threshold() -> u64 {
    20
}

const fn default_sample_size() -> usize {
    12
}

const fn default_duplicate_cutoff() -> f64 {
    0.85
}

const fn default_novel_cutoff() -> f64 {
    0.5
}

impl Default for CrystallizerConfig {
    fn default() -> Self {
        Self {
            bootstrap_threshold: default_bootstrap_threshold(),
            steady_threshold: default_steady_threshold(),
            sample_size: default_sample_size(),
            duplicate_cutoff: default_duplicate_cutoff(),
            novel_cutoff: default_novel_cutoff(),
        }
    }
}

/// Strategy document configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StrategyConfig {
    /// Token budget for the strategies section
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,

    /// Pruning stops once cost is at or below this fraction of the budget
    #[serde(default = "default_prune_target_ratio")]
    pub prune_target_ratio: f64,

    /// Heuristics younger than this are never pruned
    #[serde(default = "default_min_age_days")]
    pub min_age_days: i64,
}

const fn default_token_budget() -> usize {
    2_000
}

const fn default_prune_target_ratio() -> f64 {
    0.8
}

const fn default_min_age_days() -> i64 {
    30
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            token_budget: default_token_budget(),
            prune_target_ratio: default_prune_target_ratio(),
            min_age_days: default_min_age_days(),
        }
    }
}

/// External random source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RandomConfig {
    /// Quantum RNG endpoint; the local CSPRNG is used when unset
    #[serde(default = "default_random_endpoint")]
    pub endpoint: Option<String>,

    /// Request timeout in milliseconds
    #[serde(default = "default_random_timeout_ms")]
    pub timeout_ms: u64,
}

#[allow(clippy::unnecessary_wraps)]
fn default_random_endpoint() -> Option<String> {
    Some("https://qrng.anu.edu.au/API/jsonI.php?length=1&type=uint16".to_string())
}

const fn default_random_timeout_ms() -> u64 {
    2_000
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self {
            endpoint: default_random_endpoint(),
            timeout_ms: default_random_timeout_ms(),
        }
    }
}

/// Judgment capability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JudgmentConfig {
    /// API base URL
    #[serde(default = "default_judgment_base_url")]
    pub base_url: String,

    /// Model identifier
    #[serde(default = "default_judgment_model")]
    pub model: String,

    /// Max tokens to generate
    #[serde(default = "default_judgment_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_judgment_timeout_secs")]
    pub timeout_secs: u64,

    /// Total time budget for retrying transient failures, in seconds
    #[serde(default = "default_judgment_retry_budget_secs")]
    pub retry_budget_secs: u64,
}

fn default_judgment_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_judgment_model() -> String {
    "claude-sonnet-4-5".to_string()
}

const fn default_judgment_max_tokens() -> u32 {
    2048
}

const fn default_judgment_timeout_secs() -> u64 {
    120
}

const fn default_judgment_retry_budget_secs() -> u64 {
    60
}

impl Default for JudgmentConfig {
    fn default() -> Self {
        Self {
            base_url: default_judgment_base_url(),
            model: default_judgment_model(),
            max_tokens: default_judgment_max_tokens(),
            timeout_secs: default_judgment_timeout_secs(),
            retry_budget_secs: default_judgment_retry_budget_secs(),
        }
    }
}

/// Oracle execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OracleConfig {
    /// Interpreter that runs solution + oracle scripts
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Extra interpreter arguments placed before the script path
    #[serde(default)]
    pub args: Vec<String>,

    /// Script file extension
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_extension() -> String {
    "py".to_string()
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            args: Vec::new(),
            extension: default_extension(),
        }
    }
}
