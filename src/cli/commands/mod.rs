//! CLI command implementations.

pub mod calibrate;
pub mod classify;
pub mod cycle;
pub mod gate;
pub mod history;
pub mod init;
pub mod prune;
pub mod strategies;
pub mod trajectories;
pub mod usage;
