//! Judgment capability adapters.

pub mod anthropic;
pub mod mock;

pub use anthropic::{AnthropicJudgment, AnthropicJudgmentConfig};
pub use mock::{MockJudgment, MockReply};
