//! Engine configuration: safety margins and learning parameters

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Hard floor the engine keeps for local work plus the filter thresholds
/// applied to candidate targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyMargins {
    /// Compute usage below which the host is underutilized (0.0-1.0)
    pub min_local_compute: f64,

    /// Memory usage below which the host is underutilized (0.0-1.0)
    pub min_local_memory: f64,

    /// Maximum offload decisions awaiting an outcome report
    pub max_concurrent_offloads: usize,

    /// Maximum target latency tolerated for real-time workloads
    pub max_latency_tolerance: Duration,

    /// Minimum target reliability considered viable (0.0-1.0)
    pub min_reliability: f64,
}

impl Default for SafetyMargins {
    fn default() -> Self {
        Self {
            min_local_compute: 0.2,
            min_local_memory: 0.2,
            max_concurrent_offloads: 10,
            max_latency_tolerance: Duration::from_millis(500),
            min_reliability: 0.5,
        }
    }
}

impl SafetyMargins {
    /// Set the underutilization floor for compute
    pub fn with_min_local_compute(mut self, value: f64) -> Self {
        self.min_local_compute = value;
        self
    }

    /// Set the underutilization floor for memory
    pub fn with_min_local_memory(mut self, value: f64) -> Self {
        self.min_local_memory = value;
        self
    }

    /// Set the in-flight offload cap
    pub fn with_max_concurrent_offloads(mut self, value: usize) -> Self {
        self.max_concurrent_offloads = value;
        self
    }

    /// Set the real-time latency tolerance
    pub fn with_max_latency_tolerance(mut self, value: Duration) -> Self {
        self.max_latency_tolerance = value;
        self
    }

    /// Set the reliability floor
    pub fn with_min_reliability(mut self, value: f64) -> Self {
        self.min_reliability = value;
        self
    }

    /// Validate the margin ranges
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("min_local_compute", self.min_local_compute),
            ("min_local_memory", self.min_local_memory),
            ("min_reliability", self.min_reliability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ModelError::InvalidConfig(format!(
                    "{name} outside [0, 1]: {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Parameters of the adaptive layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Outcome window capacity and weight-history bound
    pub window_size: usize,

    /// Gradient step size for weight updates
    pub learning_rate: f64,

    /// Amplitude of the deterministic exploration perturbation
    pub exploration_rate: f64,

    /// Outcomes required before pattern discovery runs, and applications
    /// required before a pattern validates
    pub min_samples: u64,

    /// Per-component variance below which the learner is converged
    pub convergence_threshold: f64,

    /// Pattern collection capacity
    pub max_patterns: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            window_size: 100,
            learning_rate: 0.1,
            exploration_rate: 0.1,
            min_samples: 10,
            convergence_threshold: 0.01,
            max_patterns: 50,
        }
    }
}

impl LearningConfig {
    /// Set the window capacity
    pub fn with_window_size(mut self, value: usize) -> Self {
        self.window_size = value;
        self
    }

    /// Set the learning rate
    pub fn with_learning_rate(mut self, value: f64) -> Self {
        self.learning_rate = value;
        self
    }

    /// Set the exploration amplitude
    pub fn with_exploration_rate(mut self, value: f64) -> Self {
        self.exploration_rate = value;
        self
    }

    /// Set the discovery/validation sample floor
    pub fn with_min_samples(mut self, value: u64) -> Self {
        self.min_samples = value;
        self
    }

    /// Set the convergence variance threshold
    pub fn with_convergence_threshold(mut self, value: f64) -> Self {
        self.convergence_threshold = value;
        self
    }

    /// Validate the parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(ModelError::InvalidConfig("window_size must be positive".into()));
        }
        if !(self.learning_rate > 0.0) {
            return Err(ModelError::InvalidConfig("learning_rate must be positive".into()));
        }
        if !(self.exploration_rate >= 0.0) {
            return Err(ModelError::InvalidConfig(
                "exploration_rate must be non-negative".into(),
            ));
        }
        if !(self.convergence_threshold > 0.0) {
            return Err(ModelError::InvalidConfig(
                "convergence_threshold must be positive".into(),
            ));
        }
        if self.max_patterns == 0 {
            return Err(ModelError::InvalidConfig("max_patterns must be positive".into()));
        }
        Ok(())
    }
}
