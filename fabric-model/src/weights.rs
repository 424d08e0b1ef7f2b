//! Adaptive scoring weights
//!
//! The six weights form a probability vector: non-negative components
//! summing to 1 (± 1e-3). `normalize` is the single invariant-preserving
//! primitive shared by every writer; the learner, the pattern re-weighting
//! step, and the public `update_weights` entry point all go through it.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Tolerance on the simplex sum invariant
pub const SIMPLEX_TOLERANCE: f64 = 1e-3;

/// The six scoring components, used to index weights, breakdowns, and
/// outcome attribution maps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ScoreComponent {
    /// Pressure relief from draining the local queue
    QueueDepth,
    /// Load-balance fit between host and target
    ProcessorLoad,
    /// Cheapness of moving the workload's data
    NetworkCost,
    /// Deadline headroom on the target
    LatencyCost,
    /// Cheapness of the target's energy
    EnergyCost,
    /// Policy/capability compatibility
    PolicyCost,
}

impl ScoreComponent {
    /// All components in weight-vector order
    pub const ALL: [ScoreComponent; 6] = [
        ScoreComponent::QueueDepth,
        ScoreComponent::ProcessorLoad,
        ScoreComponent::NetworkCost,
        ScoreComponent::LatencyCost,
        ScoreComponent::EnergyCost,
        ScoreComponent::PolicyCost,
    ];

    /// Position in the weight vector
    pub fn index(self) -> usize {
        match self {
            Self::QueueDepth => 0,
            Self::ProcessorLoad => 1,
            Self::NetworkCost => 2,
            Self::LatencyCost => 3,
            Self::EnergyCost => 4,
            Self::PolicyCost => 5,
        }
    }

    /// Stable name used in diagnostics and audit records
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QueueDepth => "queue_depth",
            Self::ProcessorLoad => "processor_load",
            Self::NetworkCost => "network_cost",
            Self::LatencyCost => "latency_cost",
            Self::EnergyCost => "energy_cost",
            Self::PolicyCost => "policy_cost",
        }
    }
}

/// Weight vector over the six scoring components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveWeights {
    /// Weight of the queue-impact sub-score
    pub queue_depth: f64,

    /// Weight of the load-balance sub-score
    pub processor_load: f64,

    /// Weight of the network-cost sub-score
    pub network_cost: f64,

    /// Weight of the latency-impact sub-score
    pub latency_cost: f64,

    /// Weight of the energy-impact sub-score
    pub energy_cost: f64,

    /// Weight of the policy-match sub-score
    pub policy_cost: f64,
}

impl Default for AdaptiveWeights {
    /// The fixed default vector {0.2, 0.2, 0.2, 0.2, 0.1, 0.1}
    fn default() -> Self {
        Self {
            queue_depth: 0.2,
            processor_load: 0.2,
            network_cost: 0.2,
            latency_cost: 0.2,
            energy_cost: 0.1,
            policy_cost: 0.1,
        }
    }
}

impl AdaptiveWeights {
    /// Read one component
    pub fn get(&self, component: ScoreComponent) -> f64 {
        match component {
            ScoreComponent::QueueDepth => self.queue_depth,
            ScoreComponent::ProcessorLoad => self.processor_load,
            ScoreComponent::NetworkCost => self.network_cost,
            ScoreComponent::LatencyCost => self.latency_cost,
            ScoreComponent::EnergyCost => self.energy_cost,
            ScoreComponent::PolicyCost => self.policy_cost,
        }
    }

    /// Write one component
    pub fn set(&mut self, component: ScoreComponent, value: f64) {
        match component {
            ScoreComponent::QueueDepth => self.queue_depth = value,
            ScoreComponent::ProcessorLoad => self.processor_load = value,
            ScoreComponent::NetworkCost => self.network_cost = value,
            ScoreComponent::LatencyCost => self.latency_cost = value,
            ScoreComponent::EnergyCost => self.energy_cost = value,
            ScoreComponent::PolicyCost => self.policy_cost = value,
        }
    }

    /// Components in vector order
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.queue_depth,
            self.processor_load,
            self.network_cost,
            self.latency_cost,
            self.energy_cost,
            self.policy_cost,
        ]
    }

    /// Build from a vector-ordered array
    pub fn from_array(values: [f64; 6]) -> Self {
        Self {
            queue_depth: values[0],
            processor_load: values[1],
            network_cost: values[2],
            latency_cost: values[3],
            energy_cost: values[4],
            policy_cost: values[5],
        }
    }

    /// Restore the weight vector to the simplex: clamp each component to
    /// [0, 1], then divide by the sum. A vector whose clamped sum is zero
    /// re-initializes to the default.
    pub fn normalize(&mut self) {
        let mut values = self.as_array();
        for v in &mut values {
            *v = v.clamp(0.0, 1.0);
        }
        let sum: f64 = values.iter().sum();
        if sum <= 0.0 {
            *self = Self::default();
            return;
        }
        for v in &mut values {
            *v /= sum;
        }
        *self = Self::from_array(values);
    }

    /// True when every component is in [0, 1] and the sum is 1 ± 1e-3
    pub fn is_normalized(&self) -> bool {
        let values = self.as_array();
        values.iter().all(|v| (0.0..=1.0).contains(v))
            && (values.iter().sum::<f64>() - 1.0).abs() <= SIMPLEX_TOLERANCE
    }

    /// Validate the simplex invariant
    pub fn validate(&self) -> Result<()> {
        if self.as_array().iter().any(|v| !v.is_finite()) {
            return Err(ModelError::InvalidWeights(
                "non-finite component".to_string(),
            ));
        }
        if !self.is_normalized() {
            return Err(ModelError::InvalidWeights(format!(
                "not on the simplex: {:?}",
                self.as_array()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_is_normalized() {
        assert!(AdaptiveWeights::default().is_normalized());
    }

    #[test]
    fn test_normalize_restores_simplex() {
        let mut w = AdaptiveWeights::from_array([2.0, 2.0, 2.0, 2.0, 1.0, 1.0]);
        w.normalize();
        assert!(w.is_normalized());
        // clamped to 1.0 each, then divided by 6
        assert!((w.queue_depth - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_all_zero_reinitializes_to_default() {
        let mut w = AdaptiveWeights::from_array([0.0; 6]);
        w.normalize();
        assert_eq!(w, AdaptiveWeights::default());
    }

    #[test]
    fn test_negative_components_clamped() {
        let mut w = AdaptiveWeights::from_array([-1.0, 0.5, 0.0, 0.0, 0.0, 0.5]);
        w.normalize();
        assert!(w.is_normalized());
        assert_eq!(w.queue_depth, 0.0);
        assert!((w.processor_load - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_idempotent_on_simplex() {
        let mut w = AdaptiveWeights::default();
        let before = w;
        w.normalize();
        assert_eq!(w, before);
    }

    #[test]
    fn test_component_round_trip() {
        let mut w = AdaptiveWeights::default();
        for (i, component) in ScoreComponent::ALL.iter().enumerate() {
            assert_eq!(component.index(), i);
            w.set(*component, i as f64);
            assert_eq!(w.get(*component), i as f64);
        }
    }

    proptest! {
        #[test]
        fn prop_normalize_lands_on_simplex(values in proptest::array::uniform6(-10.0f64..10.0)) {
            let mut w = AdaptiveWeights::from_array(values);
            w.normalize();
            prop_assert!(w.is_normalized());
        }
    }
}
