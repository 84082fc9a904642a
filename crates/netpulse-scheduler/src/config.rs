//! Scheduler configuration, parsed from a TOML `[worker]` table.
//!
//! ```toml
//! [worker]
//! scheduler = "least_load_random"
//! bind_retries = 3
//! weight_perturbation = 0.1
//! dead_timeout_secs = 30
//! ```
//!
//! Out-of-range values are rejected at load time; a scheduler must
//! never start with a perturbation it cannot honor.

use std::path::Path;

use serde::{Deserialize, Serialize};

use netpulse_policy::PolicyKind;

use crate::error::{ScheduleError, ScheduleResult};

/// Top-level scheduler configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// The `[worker]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Node-selection policy.
    #[serde(default)]
    pub scheduler: PolicyKind,

    /// Additional whole-attempt retries after a lost bind race.
    #[serde(default = "default_bind_retries")]
    pub bind_retries: u32,

    /// Perturbation strength ε for the weighted policy, in `[0, 1)`.
    #[serde(default = "default_weight_perturbation")]
    pub weight_perturbation: f64,

    /// Heartbeat age beyond which a node counts as dead.
    #[serde(default = "default_dead_timeout_secs")]
    pub dead_timeout_secs: u64,
}

fn default_bind_retries() -> u32 {
    3
}

fn default_weight_perturbation() -> f64 {
    0.1
}

fn default_dead_timeout_secs() -> u64 {
    30
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            scheduler: PolicyKind::default(),
            bind_retries: default_bind_retries(),
            weight_perturbation: default_weight_perturbation(),
            dead_timeout_secs: default_dead_timeout_secs(),
        }
    }
}

impl SchedulerConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> ScheduleResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScheduleError::Config(format!("read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> ScheduleResult<Self> {
        let config: SchedulerConfig =
            toml::from_str(content).map_err(|e| ScheduleError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> ScheduleResult<()> {
        let eps = self.worker.weight_perturbation;
        if !(0.0..1.0).contains(&eps) || !eps.is_finite() {
            return Err(ScheduleError::Config(format!(
                "worker.weight_perturbation must be in [0, 1), got {eps}"
            )));
        }
        Ok(())
    }
}
