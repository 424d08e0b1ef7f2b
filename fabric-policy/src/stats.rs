//! Online violation statistics

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::rule::RuleKind;

/// Counters maintained online as rules are evaluated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViolationStatistics {
    /// Target evaluations performed
    pub total_evaluations: u64,

    /// Total rule violations observed
    pub total_violations: u64,

    /// Hard-rule violations
    pub hard_violations: u64,

    /// Soft-rule violations
    pub soft_violations: u64,

    /// Violations per rule description
    pub by_rule: BTreeMap<String, u64>,

    /// Corrective actions that exhausted their time budget
    pub action_timeouts: u64,

    /// Cumulative evaluation wall time
    pub total_evaluation_time: Duration,
}

impl ViolationStatistics {
    /// Record one target evaluation's wall time
    pub fn record_evaluation(&mut self, elapsed: Duration) {
        self.total_evaluations += 1;
        self.total_evaluation_time += elapsed;
    }

    /// Record one rule violation
    pub fn record_violation(&mut self, rule: &str, kind: RuleKind) {
        self.total_violations += 1;
        match kind {
            RuleKind::Hard => self.hard_violations += 1,
            RuleKind::Soft => self.soft_violations += 1,
        }
        *self.by_rule.entry(rule.to_string()).or_insert(0) += 1;
    }

    /// Average wall time per target evaluation
    pub fn avg_evaluation_time(&self) -> Duration {
        if self.total_evaluations == 0 {
            return Duration::ZERO;
        }
        self.total_evaluation_time / self.total_evaluations as u32
    }
}
