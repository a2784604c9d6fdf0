//! Token estimates for the strategy document budget.

use std::sync::OnceLock;
use tiktoken_rs::{cl100k_base, CoreBPE};

static ENCODER: OnceLock<Option<CoreBPE>> = OnceLock::new();

fn encoder() -> Option<&'static CoreBPE> {
    ENCODER.get_or_init(|| cl100k_base().ok()).as_ref()
}

/// Counts tokens with the cl100k_base encoding, falling back to a
/// four-characters-per-token estimate when the encoder cannot load.
#[derive(Clone, Copy)]
pub struct TokenCounter {
    encoder: Option<&'static CoreBPE>,
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter")
            .field("encoder", &self.encoder.map(|_| "<cl100k_base>"))
            .finish()
    }
}

impl TokenCounter {
    pub fn new() -> Self {
        let encoder = encoder();
        if encoder.is_none() {
            tracing::error!("Failed to initialize tiktoken cl100k_base encoder, using character estimates");
        }
        Self { encoder }
    }

    /// Character-estimate counter, independent of the encoder.
    pub fn estimating() -> Self {
        Self { encoder: None }
    }

    pub fn count(&self, text: &str) -> usize {
        match self.encoder {
            Some(encoder) => encoder.encode_ordinary(text).len(),
            None => text.chars().count().div_ceil(4),
        }
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}
