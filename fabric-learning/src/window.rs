//! Bounded ring of recent outcomes

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use fabric_model::Outcome;

/// Fixed-capacity FIFO of outcomes with running aggregates
///
/// Insertion is the only write path; the oldest outcome is evicted on
/// overflow. Submission order is preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeWindow {
    capacity: usize,
    outcomes: VecDeque<Outcome>,
    inserted: u64,
}

impl OutcomeWindow {
    /// Window holding at most `capacity` outcomes (at least one)
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            outcomes: VecDeque::with_capacity(capacity.max(1)),
            inserted: 0,
        }
    }

    /// Insert an outcome, evicting the oldest when full
    pub fn push(&mut self, outcome: Outcome) {
        if self.outcomes.len() == self.capacity {
            self.outcomes.pop_front();
        }
        self.outcomes.push_back(outcome);
        self.inserted += 1;
    }

    /// Outcomes currently held
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// True when nothing has been inserted yet
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Monotone count of all insertions, including evicted ones
    pub fn total_inserted(&self) -> u64 {
        self.inserted
    }

    /// Mean reward over the held outcomes; zero when empty
    pub fn average_reward(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.outcomes.iter().map(|o| o.reward).sum::<f64>() / self.outcomes.len() as f64
    }

    /// Fraction of held outcomes that succeeded; zero when empty
    pub fn success_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.outcomes.iter().filter(|o| o.success).count() as f64 / self.outcomes.len() as f64
    }

    /// Outcomes oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter()
    }
}
