//! Score breakdowns: the audit surface of a decision

use serde::{Deserialize, Serialize};

use crate::weights::{AdaptiveWeights, ScoreComponent};

/// The six per-component sub-scores that produced a final score, plus a
/// snapshot of the weight vector used. All sub-scores are in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Pressure-relief benefit of draining the local queue
    pub queue_impact: f64,

    /// Load-balance fit between host and target
    pub load_balance: f64,

    /// Network cost sub-score (higher = cheaper)
    pub network_cost: f64,

    /// Deadline headroom on the target
    pub latency_impact: f64,

    /// Energy cost sub-score (higher = cheaper)
    pub energy_impact: f64,

    /// Policy/capability compatibility
    pub policy_match: f64,

    /// Weight vector snapshot used for the weighted sum
    pub weights: AdaptiveWeights,
}

impl ScoreBreakdown {
    /// Empty breakdown carrying a weight snapshot (used for local
    /// decisions that never scored a target)
    pub fn empty(weights: AdaptiveWeights) -> Self {
        Self {
            weights,
            ..Self::default()
        }
    }

    /// Read one sub-score by component
    pub fn get(&self, component: ScoreComponent) -> f64 {
        match component {
            ScoreComponent::QueueDepth => self.queue_impact,
            ScoreComponent::ProcessorLoad => self.load_balance,
            ScoreComponent::NetworkCost => self.network_cost,
            ScoreComponent::LatencyCost => self.latency_impact,
            ScoreComponent::EnergyCost => self.energy_impact,
            ScoreComponent::PolicyCost => self.policy_match,
        }
    }

    /// Sub-scores in weight-vector order
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.queue_impact,
            self.load_balance,
            self.network_cost,
            self.latency_impact,
            self.energy_impact,
            self.policy_match,
        ]
    }

    /// The weighted sum of the sub-scores under the recorded weights,
    /// clamped to [0, 1]
    pub fn weighted_total(&self) -> f64 {
        let subs = self.as_array();
        let weights = self.weights.as_array();
        let total: f64 = subs.iter().zip(weights.iter()).map(|(s, w)| s * w).sum();
        total.clamp(0.0, 1.0)
    }
}
