pub mod addons;
pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod kubectl;
pub mod orchestrator;
pub mod platform;
pub mod provider;
pub mod readiness;
pub mod state;
pub mod topology;

// Re-export for main.rs
pub use crate::cli::Cli;
pub use crate::error::{Error, Result};
