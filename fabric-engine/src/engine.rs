//! The offload decision engine
//!
//! Owns the mutable state of the whole pipeline behind one lock: the
//! policy engine, the adaptive learner, the pattern recognizer, and the
//! outcome window. One decision observes a consistent snapshot of all of
//! them for its full duration; outcome reports and configuration changes
//! serialize behind the same lock.

use std::collections::BTreeSet;
use std::time::Instant;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

use fabric_learning::{AdaptiveLearner, OutcomeWindow, PatternRecognizer};
use fabric_model::{
    AdaptiveWeights, Decision, LearningConfig, Outcome, Pattern, SafetyMargins, ScoreBreakdown,
    Strategy, SystemState, Target, TargetType, Workload,
};
use fabric_policy::{
    AuditLog, AuditLevel, PolicyEngine, PolicyRule, PolicyViolation, Predicate,
    ViolationStatistics,
};

use crate::error::Result;
use crate::scoring;
use crate::{ACCEPTANCE_THRESHOLD, ALGORITHM_VERSION, DECISION_BUDGET_MILLIS};

/// Load score above which offloading is considered without other signals
const LOAD_SCORE_TRIGGER: f64 = 0.6;

/// Target wait time above which the delayed strategy is recommended
const DELAYED_WAIT_SECS: u64 = 10;

/// Blend factors for winner score vs pattern confidence
const CONFIDENCE_SCORE_BLEND: f64 = 0.7;
const CONFIDENCE_PATTERN_BLEND: f64 = 0.3;

/// Monotone counters describing engine activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Decisions made
    pub decisions_total: u64,

    /// Decisions that chose a remote target
    pub offload_decisions: u64,

    /// Decisions that kept the workload local
    pub local_decisions: u64,

    /// Decisions that exceeded the 500 ms soft budget
    pub over_budget_decisions: u64,

    /// Decisions that applied a matched pattern
    pub patterns_applied: u64,

    /// Outcomes reported back
    pub outcomes_reported: u64,
}

struct EngineState {
    learning: LearningConfig,
    policy: PolicyEngine,
    learner: AdaptiveLearner,
    recognizer: PatternRecognizer,
    window: OutcomeWindow,
    inflight: BTreeSet<Uuid>,
    decision_count: u64,
    stats: EngineStats,
}

/// The process-offloading decision engine
pub struct OffloadEngine {
    state: RwLock<EngineState>,
}

impl OffloadEngine {
    /// Build an engine from initial weights, safety margins, learning
    /// parameters, and host policy rules. The safety gates (security
    /// coverage, safety-critical pinning) are installed as built-in hard
    /// rules ahead of the host's, so every placement evaluation leaves
    /// an audit trail for them.
    pub fn new(
        weights: AdaptiveWeights,
        margins: SafetyMargins,
        learning: LearningConfig,
        rules: Vec<PolicyRule>,
    ) -> Result<Self> {
        margins.validate()?;
        learning.validate()?;

        let mut all_rules = vec![
            PolicyRule::hard(
                0,
                Predicate::SafetyCriticalLocal,
                "safety-critical workloads run locally",
            )
            .with_audit_level(AuditLevel::Full),
            PolicyRule::hard(
                0,
                Predicate::SecurityLevelSatisfied,
                "target security level covers workload",
            )
            .with_audit_level(AuditLevel::Full),
        ];
        all_rules.extend(rules);

        Ok(Self {
            state: RwLock::new(EngineState {
                learning,
                policy: PolicyEngine::with_rules(margins, all_rules),
                learner: AdaptiveLearner::new(weights, &learning),
                recognizer: PatternRecognizer::new(&learning),
                window: OutcomeWindow::new(learning.window_size),
                inflight: BTreeSet::new(),
                decision_count: 0,
                stats: EngineStats::default(),
            }),
        })
    }

    /// Engine with default weights, margins, and learning parameters
    pub fn with_defaults() -> Result<Self> {
        Self::new(
            AdaptiveWeights::default(),
            SafetyMargins::default(),
            LearningConfig::default(),
            Vec::new(),
        )
    }

    /// Decide whether to run `workload` locally or forward it to one of
    /// `targets`, given the host's `state`.
    pub fn make_decision(
        &self,
        workload: &Workload,
        targets: &[Target],
        state: &SystemState,
    ) -> Result<Decision> {
        let started = Instant::now();
        workload.validate()?;
        state.validate()?;

        let mut guard = self.state.write();
        let engine = &mut *guard;
        let margins = engine.policy.safety_margins();
        let base_weights = engine.learner.weights();

        // Local gate: does anything even suggest offloading?
        if state.compute_usage < margins.min_local_compute
            && state.memory_usage < margins.min_local_memory
        {
            return Ok(Self::finish_local(
                engine,
                workload,
                base_weights,
                "local resources underutilized",
                1.0,
                Vec::new(),
                started,
            ));
        }
        let trigger = if state.queue_depth > state.queue_threshold {
            "queue pressure"
        } else if state.is_high_load() {
            "high system load"
        } else if state.load_score() > LOAD_SCORE_TRIGGER {
            "load score above threshold"
        } else {
            return Ok(Self::finish_local(
                engine,
                workload,
                base_weights,
                "no offload trigger",
                1.0,
                Vec::new(),
                started,
            ));
        };
        debug!(workload = %workload.id, trigger, "offload considered");

        if engine.inflight.len() >= margins.max_concurrent_offloads {
            return Ok(Self::finish_local(
                engine,
                workload,
                base_weights,
                "concurrent offload limit reached",
                1.0,
                Vec::new(),
                started,
            ));
        }

        // Hard policy gates first (audited), then the structural filter.
        let violations_before = engine.policy.get_violations().len();
        let policy_survivors = engine.policy.filter_targets(workload, targets);
        let violations: Vec<String> = engine.policy.get_violations()[violations_before..]
            .iter()
            .map(|v: &PolicyViolation| v.rule.clone())
            .collect();

        let now = Utc::now();
        let survivors: Vec<Target> = policy_survivors
            .into_iter()
            .filter(|t| {
                t.is_healthy(now)
                    && t.reliability >= margins.min_reliability
                    && t.can_accommodate(workload)
                    && (!workload.real_time || t.network.latency <= margins.max_latency_tolerance)
                    && (!workload.safety_critical || t.target_type == TargetType::Local)
                    && workload.security_level <= t.security_level
                    && (!workload.locality_required || t.target_type.is_local_or_edge())
            })
            .collect();

        if survivors.is_empty() {
            return Ok(Self::finish_local(
                engine,
                workload,
                base_weights,
                "no viable targets",
                1.0,
                violations,
                started,
            ));
        }

        // Pattern re-weighting.
        let matched = engine
            .recognizer
            .find_best_pattern(workload, state)
            .map(|p| (p.id, p.confidence, p.weight_adjustments.clone()));
        let weights = match &matched {
            Some((_, _, adjustments)) => {
                let mut reweighted = base_weights;
                for (component, delta) in adjustments {
                    reweighted.set(*component, reweighted.get(*component) * (1.0 + delta));
                }
                reweighted.normalize();
                reweighted
            }
            None => base_weights,
        };

        // Score survivors; a strictly greater score takes the lead, so
        // ties resolve to the earliest target in submission order.
        let mut winner: Option<(&Target, ScoreBreakdown, f64)> = None;
        for target in &survivors {
            let breakdown = scoring::score_target(workload, target, state, weights);
            let score = (breakdown.weighted_total() + target.policy_bonus).clamp(0.0, 1.0);
            debug!(target_id = %target.id, score, "target scored");
            if winner.as_ref().map_or(true, |(_, _, best)| score > *best) {
                winner = Some((target, breakdown, score));
            }
        }
        // The survivor set is non-empty here.
        let Some((winner, breakdown, score)) = winner else {
            unreachable!("non-empty survivor set always yields a winner");
        };

        if score < ACCEPTANCE_THRESHOLD {
            return Ok(Self::finish_local(
                engine,
                workload,
                weights,
                "scores below threshold",
                1.0 - score,
                violations,
                started,
            ));
        }

        // Build the offload decision.
        let estimate = winner.estimated_execution_time(workload);
        let duration = workload.estimated_duration.as_secs_f64();
        let expected_benefit = ((duration - estimate.as_secs_f64()) / duration).max(0.0);
        let estimated_cost = winner.total_cost(workload).max(0.0);
        let strategy = if workload.pipeline.is_some() {
            Strategy::Pipelined
        } else if winner.estimated_wait.as_secs() > DELAYED_WAIT_SECS {
            Strategy::Delayed
        } else {
            Strategy::Immediate
        };
        let confidence = match &matched {
            Some((_, pattern_confidence, _)) => {
                (CONFIDENCE_SCORE_BLEND * score + CONFIDENCE_PATTERN_BLEND * pattern_confidence)
                    .clamp(0.0, 1.0)
            }
            None => score,
        };

        let applied_pattern = matched.as_ref().map(|(id, _, _)| *id);
        if let Some(id) = applied_pattern {
            engine.recognizer.record_application(id);
            engine.stats.patterns_applied += 1;
        }

        engine.decision_count += 1;
        let id = decision_id(engine.decision_count, &workload.id);
        engine.inflight.insert(id);
        engine.stats.decisions_total += 1;
        engine.stats.offload_decisions += 1;

        let latency = started.elapsed();
        if latency.as_millis() > u128::from(DECISION_BUDGET_MILLIS) {
            engine.stats.over_budget_decisions += 1;
            warn!(
                workload = %workload.id,
                latency_ms = latency.as_millis() as u64,
                "decision exceeded its latency budget"
            );
        }

        Ok(Decision {
            id,
            should_offload: true,
            target_id: Some(winner.id.clone()),
            confidence,
            score,
            breakdown,
            applied_pattern,
            violations,
            strategy,
            expected_benefit,
            estimated_cost,
            reason: "scored best among viable targets".to_string(),
            decided_at: Utc::now(),
            latency,
            algorithm_version: ALGORITHM_VERSION.to_string(),
        })
    }

    /// Report a measured outcome for a previous decision. Feeds the
    /// learner, the pattern recognizer, and the outcome window, and
    /// releases the decision's concurrency slot.
    pub fn report_outcome(&self, outcome: Outcome) -> Result<()> {
        outcome.validate()?;
        let mut guard = self.state.write();
        let engine = &mut *guard;
        engine.inflight.remove(&outcome.decision_id);
        engine.learner.update(&outcome);
        engine.recognizer.observe(outcome.clone());
        engine.window.push(outcome);
        engine.stats.outcomes_reported += 1;
        Ok(())
    }

    /// Replace the weight vector; renormalized before storing
    pub fn update_weights(&self, weights: AdaptiveWeights) {
        self.state.write().learner.set_weights(weights);
    }

    /// Insert a pattern directly, bypassing discovery; the collection
    /// capacity still applies
    pub fn add_pattern(&self, pattern: Pattern) {
        self.state.write().recognizer.add_pattern(pattern);
    }

    /// Replace the safety margins; a no-op while an execution epoch is
    /// open
    pub fn set_safety_margins(&self, margins: SafetyMargins) {
        self.state.write().policy.set_safety_constraints(margins);
    }

    /// Open an execution epoch: hard policy rules become immutable
    pub fn start_execution(&self) {
        self.state.write().policy.start_execution();
    }

    /// Close the execution epoch
    pub fn stop_execution(&self) {
        self.state.write().policy.stop_execution();
    }

    /// Add a policy rule (hard rules rejected during execution epochs)
    pub fn add_rule(&self, rule: PolicyRule) -> Result<()> {
        self.state.write().policy.add_rule(rule)?;
        Ok(())
    }

    /// Remove a policy rule by description
    pub fn remove_rule(&self, description: &str) -> Result<bool> {
        Ok(self.state.write().policy.remove_rule(description)?)
    }

    /// Descriptions of the installed policy rules, in insertion order
    pub fn rule_descriptions(&self) -> Vec<String> {
        self.state
            .read()
            .policy
            .rules()
            .iter()
            .map(|r| r.description.clone())
            .collect()
    }

    /// Current weight vector
    pub fn get_weights(&self) -> AdaptiveWeights {
        self.state.read().learner.weights()
    }

    /// Snapshot of the pattern collection
    pub fn get_patterns(&self) -> Vec<Pattern> {
        self.state.read().recognizer.patterns().to_vec()
    }

    /// Snapshot of the audit log
    pub fn get_audit_log(&self) -> AuditLog {
        self.state.read().policy.get_audit_log().clone()
    }

    /// Verify the audit chain end to end
    pub fn verify_audit_log_integrity(&self) -> Result<()> {
        Ok(self.state.read().policy.verify_audit_log_integrity()?)
    }

    /// Snapshot of the violation statistics
    pub fn get_violation_statistics(&self) -> ViolationStatistics {
        self.state.read().policy.get_violation_statistics()
    }

    /// Learning parameters the engine was built with
    pub fn learning_config(&self) -> LearningConfig {
        self.state.read().learning
    }

    /// Snapshot of the engine counters
    pub fn stats(&self) -> EngineStats {
        self.state.read().stats
    }

    /// True once the learner's weight vector has settled
    pub fn is_converged(&self) -> bool {
        self.state.read().learner.is_converged()
    }

    /// Outcome-window aggregates: (held, total inserted, average reward,
    /// success rate)
    pub fn window_summary(&self) -> (usize, u64, f64, f64) {
        let guard = self.state.read();
        (
            guard.window.len(),
            guard.window.total_inserted(),
            guard.window.average_reward(),
            guard.window.success_rate(),
        )
    }

    /// Build a local decision, stamp counters and latency, and warn when
    /// over budget.
    #[allow(clippy::too_many_arguments)]
    fn finish_local(
        engine: &mut EngineState,
        workload: &Workload,
        weights: AdaptiveWeights,
        reason: &str,
        confidence: f64,
        violations: Vec<String>,
        started: Instant,
    ) -> Decision {
        engine.decision_count += 1;
        engine.stats.decisions_total += 1;
        engine.stats.local_decisions += 1;

        let latency = started.elapsed();
        if latency.as_millis() > u128::from(DECISION_BUDGET_MILLIS) {
            engine.stats.over_budget_decisions += 1;
            warn!(
                workload = %workload.id,
                latency_ms = latency.as_millis() as u64,
                "decision exceeded its latency budget"
            );
        }
        debug!(workload = %workload.id, reason, "local decision");

        Decision {
            id: decision_id(engine.decision_count, &workload.id),
            should_offload: false,
            target_id: None,
            confidence: confidence.clamp(0.0, 1.0),
            score: 0.0,
            breakdown: ScoreBreakdown::empty(weights),
            applied_pattern: None,
            violations,
            strategy: Strategy::Immediate,
            expected_benefit: 0.0,
            estimated_cost: 0.0,
            reason: reason.to_string(),
            decided_at: Utc::now(),
            latency,
            algorithm_version: ALGORITHM_VERSION.to_string(),
        }
    }
}

/// Decision identity derived from the engine's decision counter and the
/// workload id, so replaying identical inputs against an identical
/// engine snapshot reproduces the same id.
fn decision_id(count: u64, workload_id: &str) -> Uuid {
    let mut hasher = Sha256::new();
    hasher.update(count.to_le_bytes());
    hasher.update(workload_id.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_model::Capacity;
    use std::time::Duration;

    fn engine() -> OffloadEngine {
        OffloadEngine::with_defaults().unwrap()
    }

    fn workload() -> Workload {
        Workload::new("w1", "batch").with_estimated_duration(Duration::from_secs(30))
    }

    fn edge_target(id: &str) -> Target {
        Target::new(id, TargetType::Edge)
            .with_reliability(0.95)
            .with_capacity(Capacity {
                total_cpu: 8.0,
                available_cpu: 6.0,
                total_memory: 1 << 34,
                available_memory: 1 << 34,
            })
    }

    fn pressured_state() -> SystemState {
        let mut s = SystemState::idle();
        s.compute_usage = 0.75;
        s.memory_usage = 0.6;
        s.queue_depth = 25;
        s.queue_threshold = 20;
        s
    }

    #[test]
    fn test_underutilized_host_stays_local() {
        let mut s = SystemState::idle();
        s.compute_usage = 0.1;
        s.memory_usage = 0.1;
        let d = engine()
            .make_decision(&workload(), &[edge_target("e1")], &s)
            .unwrap();
        assert!(!d.should_offload);
        assert_eq!(d.reason, "local resources underutilized");
        assert!(d.is_consistent());
    }

    #[test]
    fn test_no_trigger_stays_local() {
        let mut s = SystemState::idle();
        s.compute_usage = 0.4;
        s.memory_usage = 0.4;
        let d = engine()
            .make_decision(&workload(), &[edge_target("e1")], &s)
            .unwrap();
        assert!(!d.should_offload);
        assert_eq!(d.reason, "no offload trigger");
    }

    #[test]
    fn test_queue_pressure_offloads() {
        let d = engine()
            .make_decision(&workload(), &[edge_target("e1")], &pressured_state())
            .unwrap();
        assert!(d.should_offload);
        assert_eq!(d.target_id.as_deref(), Some("e1"));
        assert!(d.score >= ACCEPTANCE_THRESHOLD);
        assert_eq!(d.strategy, Strategy::Immediate);
    }

    #[test]
    fn test_invalid_workload_is_typed_error() {
        let mut w = workload();
        w.estimated_duration = Duration::ZERO;
        let err = engine()
            .make_decision(&w, &[edge_target("e1")], &pressured_state())
            .unwrap_err();
        assert!(matches!(err, crate::EngineError::InvalidInput(_)));
    }

    #[test]
    fn test_no_viable_targets_falls_back_local() {
        let mut t = edge_target("e1");
        t.reliability = 0.1; // below the default floor
        let d = engine()
            .make_decision(&workload(), &[t], &pressured_state())
            .unwrap();
        assert!(!d.should_offload);
        assert_eq!(d.reason, "no viable targets");
    }

    #[test]
    fn test_stale_target_not_viable() {
        let mut t = edge_target("e1");
        t.last_seen = Utc::now() - chrono::Duration::seconds(120);
        let d = engine()
            .make_decision(&workload(), &[t], &pressured_state())
            .unwrap();
        assert!(!d.should_offload);
    }

    #[test]
    fn test_concurrent_offload_cap() {
        let engine = OffloadEngine::new(
            AdaptiveWeights::default(),
            SafetyMargins::default().with_max_concurrent_offloads(1),
            LearningConfig::default(),
            Vec::new(),
        )
        .unwrap();

        let first = engine
            .make_decision(&workload(), &[edge_target("e1")], &pressured_state())
            .unwrap();
        assert!(first.should_offload);

        let second = engine
            .make_decision(&workload(), &[edge_target("e1")], &pressured_state())
            .unwrap();
        assert!(!second.should_offload);
        assert_eq!(second.reason, "concurrent offload limit reached");

        // Reporting the outcome releases the slot.
        engine
            .report_outcome(Outcome::success(first.id, "w1", "e1").with_reward(0.5))
            .unwrap();
        let third = engine
            .make_decision(&workload(), &[edge_target("e1")], &pressured_state())
            .unwrap();
        assert!(third.should_offload);
    }

    #[test]
    fn test_pipelined_strategy_for_dag_workloads() {
        let w = workload().with_pipeline(fabric_model::PipelineSpec {
            stages: vec![fabric_model::PipelineStage {
                id: "s1".to_string(),
                depends_on: Vec::new(),
            }],
        });
        let d = engine()
            .make_decision(&w, &[edge_target("e1")], &pressured_state())
            .unwrap();
        assert!(d.should_offload);
        assert_eq!(d.strategy, Strategy::Pipelined);
    }

    #[test]
    fn test_delayed_strategy_for_busy_targets() {
        let mut t = edge_target("e1");
        t.estimated_wait = Duration::from_secs(15);
        let d = engine()
            .make_decision(&workload(), &[t], &pressured_state())
            .unwrap();
        if d.should_offload {
            assert_eq!(d.strategy, Strategy::Delayed);
        }
    }

    #[test]
    fn test_decision_content_is_deterministic() {
        let make = || {
            engine()
                .make_decision(
                    &workload(),
                    &[edge_target("e1"), edge_target("e2")],
                    &pressured_state(),
                )
                .unwrap()
        };
        let a = make();
        let b = make();
        assert_eq!(a.id, b.id);
        assert_eq!(a.target_id, b.target_id);
        assert_eq!(a.score, b.score);
        assert_eq!(a.breakdown, b.breakdown);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.strategy, b.strategy);
        assert_eq!(a.reason, b.reason);
    }

    #[test]
    fn test_engine_stats_track_decisions() {
        let engine = engine();
        let mut s = SystemState::idle();
        s.compute_usage = 0.1;
        s.memory_usage = 0.1;
        engine
            .make_decision(&workload(), &[edge_target("e1")], &s)
            .unwrap();
        engine
            .make_decision(&workload(), &[edge_target("e1")], &pressured_state())
            .unwrap();

        let stats = engine.stats();
        assert_eq!(stats.decisions_total, 2);
        assert_eq!(stats.local_decisions, 1);
        assert_eq!(stats.offload_decisions, 1);
    }

    #[test]
    fn test_outcome_with_bad_attribution_rejected() {
        let engine = engine();
        let outcome = Outcome::success(Uuid::nil(), "w1", "e1")
            .with_attribution(fabric_model::ScoreComponent::QueueDepth, 0.8)
            .with_attribution(fabric_model::ScoreComponent::NetworkCost, 0.8);
        assert!(engine.report_outcome(outcome).is_err());
    }

    #[test]
    fn test_update_weights_renormalizes() {
        let engine = engine();
        engine.update_weights(AdaptiveWeights::from_array([3.0, 0.0, 0.0, 0.0, 0.0, 0.0]));
        let w = engine.get_weights();
        assert!(w.is_normalized());
        assert!((w.queue_depth - 1.0).abs() < 1e-12);
    }
}
