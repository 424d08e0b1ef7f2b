//! Measured outcomes reported back after a placement runs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ModelError, Result};
use crate::weights::ScoreComponent;

/// Slack allowed on the attribution-mass sum
const ATTRIBUTION_SUM_TOLERANCE: f64 = 1e-6;

/// Measured result of executing a previously decided placement
///
/// Outcomes drive the adaptive layer: the reward moves the weight vector
/// along the attribution gradient, and the flags feed pattern discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Decision this outcome reports on
    pub decision_id: Uuid,

    /// Workload that ran
    pub workload_id: String,

    /// Target it ran on
    pub target_id: String,

    /// Did the placement succeed
    pub success: bool,

    /// Measured execution time
    pub execution_time: Duration,

    /// Was the deadline met
    pub deadline_met: bool,

    /// Measured network cost
    pub network_cost: f64,

    /// Measured round-trip latency
    pub latency: Duration,

    /// Measured energy cost
    pub energy_cost: f64,

    /// Local work was delayed by the placement
    pub local_work_delayed: bool,

    /// Network congestion was observed
    pub network_congestion: bool,

    /// The target was overloaded
    pub target_overloaded: bool,

    /// A policy violation was observed during execution
    pub policy_violation: bool,

    /// Scalar reward in [-1, 1]
    pub reward: f64,

    /// Per-component credit/blame mass; values are non-negative and sum
    /// to at most 1
    pub attribution: BTreeMap<ScoreComponent, f64>,
}

impl Outcome {
    /// Successful outcome skeleton with neutral measurements
    pub fn success(decision_id: Uuid, workload_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            decision_id,
            workload_id: workload_id.into(),
            target_id: target_id.into(),
            success: true,
            execution_time: Duration::ZERO,
            deadline_met: true,
            network_cost: 0.0,
            latency: Duration::ZERO,
            energy_cost: 0.0,
            local_work_delayed: false,
            network_congestion: false,
            target_overloaded: false,
            policy_violation: false,
            reward: 0.0,
            attribution: BTreeMap::new(),
        }
    }

    /// Failed outcome skeleton with neutral measurements
    pub fn failure(decision_id: Uuid, workload_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            success: false,
            deadline_met: false,
            ..Self::success(decision_id, workload_id, target_id)
        }
    }

    /// Set the scalar reward
    pub fn with_reward(mut self, reward: f64) -> Self {
        self.reward = reward;
        self
    }

    /// Attribute credit/blame mass to one component
    pub fn with_attribution(mut self, component: ScoreComponent, mass: f64) -> Self {
        self.attribution.insert(component, mass);
        self
    }

    /// Validate the reward range and the attribution-mass invariant
    pub fn validate(&self) -> Result<()> {
        if !(-1.0..=1.0).contains(&self.reward) {
            return Err(ModelError::InvalidOutcome(format!(
                "reward outside [-1, 1]: {}",
                self.reward
            )));
        }
        let mut sum = 0.0;
        for (component, mass) in &self.attribution {
            if !(*mass >= 0.0) {
                return Err(ModelError::InvalidOutcome(format!(
                    "negative attribution for {}",
                    component.as_str()
                )));
            }
            sum += mass;
        }
        if sum > 1.0 + ATTRIBUTION_SUM_TOLERANCE {
            return Err(ModelError::InvalidOutcome(format!(
                "attribution mass sums to {sum}, above 1"
            )));
        }
        Ok(())
    }
}
