//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the sweep scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Enable/disable the interval scheduler.
    /// When disabled, sweeps only run when triggered through the API.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Time between scheduled sweeps (seconds).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Run one sweep immediately when the scheduler starts.
    #[serde(default)]
    pub run_on_startup: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_sweep_interval() -> u64 {
    300 // 5 minutes
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            sweep_interval_secs: default_sweep_interval(),
            run_on_startup: false,
        }
    }
}
