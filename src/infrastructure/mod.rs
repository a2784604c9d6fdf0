//! Infrastructure layer module
//!
//! Cross-cutting concerns shared by adapters and the CLI:
//! - Configuration management (figment)
//! - Logging (tracing-subscriber, tracing-appender)
//! - Outbound call rate limiting (governor)

pub mod config;
pub mod logging;
pub mod rate_limiter;

pub use rate_limiter::RateLimiter;
