//! Content orchestrator for the generation pipeline.
//!
//! Each sweep takes every pending record through generation, one at a time,
//! and leaves it in review or failed. Sweeps never overlap.

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::ContentOrchestrator;
pub use types::{
    ItemOutcome, ItemReport, OrchestratorError, PipelineStatus, SweepOutcome, SweepReport,
};
