//! Adaptive weight learner
//!
//! Moves the scoring weight vector along the attribution gradient of each
//! reported outcome. All updates funnel through the shared
//! `AdaptiveWeights::normalize` primitive, so the vector never leaves the
//! simplex. Exploration noise is a pure function of the update counter:
//! replaying the same outcome sequence reproduces the same trajectory.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use fabric_model::{AdaptiveWeights, LearningConfig, Outcome, ScoreComponent};

/// Vectors inspected when testing for convergence
const CONVERGENCE_WINDOW: usize = 20;

/// Base amplitude of the exploration perturbation before scaling by the
/// exploration rate
const PERTURBATION_AMPLITUDE: f64 = 0.01;

/// Deterministic low-amplitude exploration noise, keyed to the update
/// counter and the component index. A sine of the counter keeps the
/// sequence reproducible when an outcome stream is replayed; nothing in
/// the learner draws from a process-wide random source.
pub fn exploration_perturbation(update_index: u64, component_index: usize) -> f64 {
    let phase = update_index as f64 * 0.7 + component_index as f64 * 1.3;
    PERTURBATION_AMPLITUDE * phase.sin()
}

/// Learner state: the weight vector, its recent history, and the
/// convergence latch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveLearner {
    weights: AdaptiveWeights,
    learning_rate: f64,
    exploration_rate: f64,
    convergence_threshold: f64,
    history_bound: usize,
    history: VecDeque<AdaptiveWeights>,
    update_count: u64,
    converged: bool,
    converged_at: Option<u64>,
}

impl AdaptiveLearner {
    /// Learner starting from the given weights (renormalized on entry)
    pub fn new(mut weights: AdaptiveWeights, config: &LearningConfig) -> Self {
        weights.normalize();
        let history_bound = config.window_size.clamp(CONVERGENCE_WINDOW, 100);
        let mut history = VecDeque::with_capacity(history_bound);
        history.push_back(weights);
        Self {
            weights,
            learning_rate: config.learning_rate,
            exploration_rate: config.exploration_rate,
            convergence_threshold: config.convergence_threshold,
            history_bound,
            history,
            update_count: 0,
            converged: false,
            converged_at: None,
        }
    }

    /// Current weight vector
    pub fn weights(&self) -> AdaptiveWeights {
        self.weights
    }

    /// Updates applied so far
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// True once the vector has settled; latched until `reset`
    pub fn is_converged(&self) -> bool {
        self.converged
    }

    /// Update index at which convergence was first detected
    pub fn converged_at(&self) -> Option<u64> {
        self.converged_at
    }

    /// Recent weight vectors, oldest first
    pub fn history(&self) -> impl Iterator<Item = &AdaptiveWeights> {
        self.history.iter()
    }

    /// Apply one outcome: gradient step along the attribution, clamp,
    /// renormalize, record history, test convergence.
    pub fn update(&mut self, outcome: &Outcome) {
        let mut values = self.weights.as_array();
        let uniform = outcome.attribution.is_empty();

        for component in ScoreComponent::ALL {
            let index = component.index();
            let gradient = if uniform {
                self.learning_rate * outcome.reward / 6.0
            } else {
                let mass = outcome.attribution.get(&component).copied().unwrap_or(0.0);
                self.learning_rate * outcome.reward * mass
            };
            let noise =
                self.exploration_rate * exploration_perturbation(self.update_count, index);
            values[index] = (values[index] + gradient + noise).clamp(0.0, 1.0);
        }

        let mut next = AdaptiveWeights::from_array(values);
        next.normalize();
        self.weights = next;
        self.update_count += 1;
        self.push_history(next);
        self.check_convergence();

        debug!(
            update = self.update_count,
            reward = outcome.reward,
            converged = self.converged,
            "weight update applied"
        );
    }

    /// Replace the weight vector directly (renormalized on entry).
    /// Counts as history but not as a learning update.
    pub fn set_weights(&mut self, mut weights: AdaptiveWeights) {
        weights.normalize();
        self.weights = weights;
        self.push_history(weights);
    }

    /// Clear the convergence latch and the trajectory, keeping the
    /// current weights
    pub fn reset(&mut self) {
        self.converged = false;
        self.converged_at = None;
        self.update_count = 0;
        self.history.clear();
        self.history.push_back(self.weights);
    }

    fn push_history(&mut self, weights: AdaptiveWeights) {
        if self.history.len() == self.history_bound {
            self.history.pop_front();
        }
        self.history.push_back(weights);
    }

    /// After at least 20 updates, the learner is converged when every
    /// component's sample variance over the last 20 vectors is below the
    /// threshold. The predicate is latched.
    fn check_convergence(&mut self) {
        if self.converged || self.update_count < CONVERGENCE_WINDOW as u64 {
            return;
        }
        let recent: Vec<&AdaptiveWeights> = self
            .history
            .iter()
            .rev()
            .take(CONVERGENCE_WINDOW)
            .collect();
        if recent.len() < CONVERGENCE_WINDOW {
            return;
        }

        let n = recent.len() as f64;
        for component in ScoreComponent::ALL {
            let mean: f64 = recent.iter().map(|w| w.get(component)).sum::<f64>() / n;
            let variance: f64 = recent
                .iter()
                .map(|w| {
                    let d = w.get(component) - mean;
                    d * d
                })
                .sum::<f64>()
                / (n - 1.0);
            if variance >= self.convergence_threshold {
                return;
            }
        }
        self.converged = true;
        self.converged_at = Some(self.update_count);
        debug!(update = self.update_count, "learner converged");
    }
}
