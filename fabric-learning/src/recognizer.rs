//! Pattern recognizer: mines conditional rules from outcome history
//!
//! On each reported outcome the recognizer partitions its history into
//! successes and failures, proposes candidate patterns characterizing each
//! partition, merges them with the existing collection by stable name,
//! promotes or deprecates patterns on their success rate, and prunes the
//! collection to its capacity. Only validated patterns ever influence a
//! decision.

use std::collections::VecDeque;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use fabric_model::{
    Comparison, ConditionValue, FeatureTag, LearningConfig, Outcome, Pattern, PatternCondition,
    RecommendedAction, ScoreComponent, SystemState, ValidationStatus, Workload,
};

/// Aggregated match score a pattern must exceed to be applied
pub const PATTERN_MATCH_THRESHOLD: f64 = 0.7;

/// Success rate above which a sampled pattern validates
const VALIDATION_SUCCESS_RATE: f64 = 0.8;

/// Success rate below which a repeatedly applied pattern deprecates
const DEPRECATION_SUCCESS_RATE: f64 = 0.5;

/// Applications after which a poor pattern may deprecate
const DEPRECATION_MIN_APPLICATIONS: u64 = 5;

/// Queue depth beyond which the canonical high-queue candidate fires
const HIGH_QUEUE_DEPTH: f64 = 20.0;

/// Network usage beyond which the canonical congestion candidate fires
const CONGESTED_NETWORK_USAGE: f64 = 0.7;

/// Pattern mining and matching over a bounded outcome history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRecognizer {
    patterns: Vec<Pattern>,
    history: VecDeque<Outcome>,
    history_bound: usize,
    min_samples: u64,
    max_patterns: usize,
}

impl PatternRecognizer {
    /// Recognizer configured from the learning parameters
    pub fn new(config: &LearningConfig) -> Self {
        Self {
            patterns: Vec::new(),
            history: VecDeque::with_capacity(config.window_size),
            history_bound: config.window_size.max(1),
            min_samples: config.min_samples,
            max_patterns: config.max_patterns,
        }
    }

    /// Current pattern collection
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Look up a pattern by id
    pub fn pattern(&self, id: Uuid) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.id == id)
    }

    /// Insert a pattern directly, bypassing discovery. Subject to the
    /// same capacity pruning as discovered patterns.
    pub fn add_pattern(&mut self, pattern: Pattern) {
        if let Some(existing) = self.patterns.iter_mut().find(|p| p.name == pattern.name) {
            *existing = pattern;
        } else {
            self.patterns.push(pattern);
        }
        self.prune();
    }

    /// Feed one outcome: extend history and evolve the pattern
    /// collection once enough samples have accumulated.
    pub fn observe(&mut self, outcome: Outcome) {
        if self.history.len() == self.history_bound {
            self.history.pop_front();
        }
        self.history.push_back(outcome);

        if (self.history.len() as u64) < self.min_samples {
            return;
        }
        self.discover();
        self.validate();
        self.prune();
    }

    /// Best validated pattern whose aggregated condition match exceeds
    /// the threshold. Ties resolve to the first maximal pattern in
    /// collection order, keeping matching deterministic.
    pub fn find_best_pattern(&self, workload: &Workload, state: &SystemState) -> Option<&Pattern> {
        let mut best: Option<(&Pattern, f64)> = None;
        for pattern in &self.patterns {
            if pattern.status != ValidationStatus::Validated {
                continue;
            }
            let score = pattern.match_score(workload, state);
            if score <= PATTERN_MATCH_THRESHOLD {
                continue;
            }
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((pattern, score)),
            }
        }
        best.map(|(pattern, _)| pattern)
    }

    /// Record that a decision applied the pattern. The sole mutation
    /// path for usage counters; decisions hold pattern ids only.
    pub fn record_application(&mut self, id: Uuid) {
        if let Some(pattern) = self.patterns.iter_mut().find(|p| p.id == id) {
            pattern.applications += 1;
            pattern.last_used = Utc::now();
        }
    }

    /// Propose candidates from the success/failure partition of history
    /// and merge them into the collection by name.
    fn discover(&mut self) {
        let total = self.history.len() as f64;
        let successes = self.history.iter().filter(|o| o.success).count() as f64;
        let failures = total - successes;
        let success_share = successes / total;

        // Success partition dominant: offloading under queue pressure
        // has been paying off.
        if success_share > 0.5 {
            let candidate = Pattern::new("high-queue-offload", RecommendedAction::Offload)
                .with_description("high local queue depth favors offloading")
                .with_condition(PatternCondition {
                    field: FeatureTag::QueueDepth,
                    op: Comparison::Gt,
                    value: ConditionValue::Number(HIGH_QUEUE_DEPTH),
                    weight: 1.0,
                })
                .with_adjustment(ScoreComponent::QueueDepth, 0.3);
            self.merge(candidate, success_share, successes, failures);
        }

        // Failures flagged with congestion: the network was the problem.
        let congested_failures = self
            .history
            .iter()
            .filter(|o| !o.success && o.network_congestion)
            .count() as f64;
        if congested_failures > 0.0 {
            let candidate = Pattern::new("congestion-keep-local", RecommendedAction::KeepLocal)
                .with_description("network congestion favors local execution")
                .with_condition(PatternCondition {
                    field: FeatureTag::NetworkUsage,
                    op: Comparison::Gt,
                    value: ConditionValue::Number(CONGESTED_NETWORK_USAGE),
                    weight: 1.0,
                })
                .with_adjustment(ScoreComponent::NetworkCost, 0.4);
            let group_share = congested_failures / total;
            // Within the congested group the observed placements failed.
            self.merge(candidate, group_share, 0.0, congested_failures);
        }
    }

    /// Merge a candidate by stable name: existing patterns accumulate
    /// evidence, new candidates join the collection.
    fn merge(&mut self, mut candidate: Pattern, share: f64, successes: f64, failures: f64) {
        let success_rate = if successes + failures > 0.0 {
            successes / (successes + failures)
        } else {
            0.0
        };
        candidate.confidence = share.clamp(0.0, 1.0);
        candidate.success_rate = success_rate;
        candidate.min_samples = self.min_samples;

        if let Some(existing) = self
            .patterns
            .iter_mut()
            .find(|p| p.name == candidate.name)
        {
            existing.applications += 1;
            existing.confidence = candidate.confidence;
            // Drift the stability metric toward how much the rate moved.
            let delta = (existing.success_rate - success_rate).abs();
            existing.stability = 0.9 * existing.stability + 0.1 * (1.0 - delta);
            existing.success_rate = success_rate;
            existing.updated_at = Utc::now();
            existing.last_used = Utc::now();
        } else {
            debug!(pattern = %candidate.name, "candidate pattern proposed");
            candidate.applications = 1;
            self.patterns.push(candidate);
        }
    }

    /// Promote well-evidenced patterns, deprecate persistent failures
    fn validate(&mut self) {
        for pattern in &mut self.patterns {
            match pattern.status {
                ValidationStatus::Discovering | ValidationStatus::Validated => {
                    if pattern.applications >= pattern.min_samples.max(1)
                        && pattern.success_rate > VALIDATION_SUCCESS_RATE
                    {
                        if pattern.status != ValidationStatus::Validated {
                            debug!(pattern = %pattern.name, "pattern validated");
                        }
                        pattern.status = ValidationStatus::Validated;
                    } else if pattern.success_rate < DEPRECATION_SUCCESS_RATE
                        && pattern.applications > DEPRECATION_MIN_APPLICATIONS
                    {
                        debug!(pattern = %pattern.name, "pattern deprecated");
                        pattern.status = ValidationStatus::Deprecated;
                    }
                }
                ValidationStatus::Deprecated => {}
            }
        }
    }

    /// Keep the best `max_patterns` by (status, success rate, recency)
    fn prune(&mut self) {
        if self.patterns.len() <= self.max_patterns {
            return;
        }
        self.patterns.sort_by(|a, b| {
            b.status
                .rank()
                .cmp(&a.status.rank())
                .then(
                    b.success_rate
                        .partial_cmp(&a.success_rate)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
                .then(b.last_used.cmp(&a.last_used))
        });
        self.patterns.truncate(self.max_patterns);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LearningConfig {
        LearningConfig::default().with_min_samples(5)
    }

    fn success_outcome(i: u32) -> Outcome {
        Outcome::success(Uuid::nil(), format!("w{i}"), "t1").with_reward(0.8)
    }

    fn congested_failure(i: u32) -> Outcome {
        let mut o = Outcome::failure(Uuid::nil(), format!("w{i}"), "t1").with_reward(-0.6);
        o.network_congestion = true;
        o
    }

    fn state_with_queue(depth: u32) -> SystemState {
        let mut s = SystemState::idle();
        s.queue_depth = depth;
        s
    }

    #[test]
    fn test_no_discovery_below_min_samples() {
        let mut recognizer = PatternRecognizer::new(&config());
        for i in 0..4 {
            recognizer.observe(success_outcome(i));
        }
        assert!(recognizer.patterns().is_empty());
    }

    #[test]
    fn test_success_history_proposes_queue_pattern() {
        let mut recognizer = PatternRecognizer::new(&config());
        for i in 0..10 {
            recognizer.observe(success_outcome(i));
        }
        assert!(recognizer
            .patterns()
            .iter()
            .any(|p| p.name == "high-queue-offload"));
    }

    #[test]
    fn test_congested_failures_propose_keep_local() {
        let mut recognizer = PatternRecognizer::new(&config());
        for i in 0..10 {
            recognizer.observe(congested_failure(i));
        }
        let pattern = recognizer
            .patterns()
            .iter()
            .find(|p| p.name == "congestion-keep-local")
            .unwrap();
        assert_eq!(pattern.action, RecommendedAction::KeepLocal);
        assert_eq!(pattern.success_rate, 0.0);
    }

    #[test]
    fn test_pattern_validates_after_sustained_success() {
        let mut recognizer = PatternRecognizer::new(&config());
        for i in 0..20 {
            recognizer.observe(success_outcome(i));
        }
        let pattern = recognizer
            .patterns()
            .iter()
            .find(|p| p.name == "high-queue-offload")
            .unwrap();
        assert_eq!(pattern.status, ValidationStatus::Validated);
    }

    #[test]
    fn test_poor_pattern_deprecates() {
        let mut recognizer = PatternRecognizer::new(&config());
        // Mixed history keeps proposing the queue pattern while its
        // success rate collapses.
        for i in 0..12 {
            recognizer.observe(success_outcome(i));
        }
        for i in 0..40 {
            recognizer.observe(congested_failure(100 + i));
        }
        let pattern = recognizer
            .patterns()
            .iter()
            .find(|p| p.name == "congestion-keep-local")
            .unwrap();
        assert_eq!(pattern.status, ValidationStatus::Deprecated);
    }

    #[test]
    fn test_find_best_pattern_requires_validation() {
        let mut recognizer = PatternRecognizer::new(&config());
        let mut pattern = Pattern::new("manual", RecommendedAction::Offload).with_condition(
            PatternCondition::numeric(FeatureTag::QueueDepth, Comparison::Gt, 20.0),
        );
        pattern.confidence = 0.9;
        recognizer.add_pattern(pattern.clone());

        let w = Workload::new("w", "batch");
        assert!(recognizer.find_best_pattern(&w, &state_with_queue(30)).is_none());

        pattern.status = ValidationStatus::Validated;
        recognizer.add_pattern(pattern);
        let found = recognizer.find_best_pattern(&w, &state_with_queue(30));
        assert!(found.is_some());
        assert!(recognizer
            .find_best_pattern(&w, &state_with_queue(10))
            .is_none());
    }

    #[test]
    fn test_capacity_pruning_prefers_validated() {
        let mut recognizer = PatternRecognizer::new(&LearningConfig {
            max_patterns: 3,
            ..config()
        });
        for i in 0..5 {
            let mut p = Pattern::new(format!("p{i}"), RecommendedAction::Offload);
            p.success_rate = f64::from(i) / 10.0;
            if i == 0 {
                p.status = ValidationStatus::Validated;
            }
            recognizer.add_pattern(p);
        }
        assert_eq!(recognizer.patterns().len(), 3);
        // The validated pattern survives despite its low success rate.
        assert!(recognizer.patterns().iter().any(|p| p.name == "p0"));
    }

    #[test]
    fn test_record_application_updates_counters() {
        let mut recognizer = PatternRecognizer::new(&config());
        let mut pattern = Pattern::new("manual", RecommendedAction::Offload);
        pattern.status = ValidationStatus::Validated;
        let id = pattern.id;
        let before = pattern.applications;
        recognizer.add_pattern(pattern);

        recognizer.record_application(id);
        assert_eq!(recognizer.pattern(id).unwrap().applications, before + 1);
    }
}
