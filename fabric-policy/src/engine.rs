//! Policy engine: rule evaluation, immutability epochs, audit wiring
//!
//! Rules evaluate in ascending priority, hard before soft within a
//! priority. Every hard rule is evaluated exactly once per target even
//! after the first failure, so the audit trail is complete; soft rules
//! only contribute bonuses to targets that survived the hard gates.

use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use fabric_model::{SafetyMargins, Target, Workload};

use crate::audit::{AuditEvent, AuditEventKind, AuditLevel, AuditLog, AuditRecord, RuleEvaluation};
use crate::error::{PolicyError, Result};
use crate::rule::{ActionStatus, PolicyRule, PolicyViolation, RuleKind};
use crate::stats::ViolationStatistics;

/// Base magnitude of a soft rule's bonus at priority 1
const SOFT_BONUS_BASE: f64 = 0.1;

/// Result of evaluating the rule set against one (workload, target) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDecision {
    /// False iff any hard rule failed
    pub allowed: bool,

    /// Descriptions of the rules that failed
    pub violated_rules: Vec<String>,

    /// Accumulated soft-rule bonus (positive when satisfied, negative
    /// when violated, scaled by rule priority)
    pub score_adjustment: f64,
}

/// The policy engine
pub struct PolicyEngine {
    rules: Vec<PolicyRule>,
    margins: SafetyMargins,
    executing: bool,
    violations: Vec<PolicyViolation>,
    audit: AuditLog,
    stats: ViolationStatistics,
}

impl PolicyEngine {
    /// Engine with the given safety margins and no rules
    pub fn new(margins: SafetyMargins) -> Self {
        Self {
            rules: Vec::new(),
            margins,
            executing: false,
            violations: Vec::new(),
            audit: AuditLog::new(),
            stats: ViolationStatistics::default(),
        }
    }

    /// Engine preloaded with rules
    pub fn with_rules(margins: SafetyMargins, rules: Vec<PolicyRule>) -> Self {
        let mut engine = Self::new(margins);
        for rule in rules {
            // Not executing yet, so this cannot fail.
            let _ = engine.add_rule(rule);
        }
        engine
    }

    /// True while an execution epoch is open
    pub fn is_executing(&self) -> bool {
        self.executing
    }

    /// Current safety margins
    pub fn safety_margins(&self) -> SafetyMargins {
        self.margins
    }

    /// Installed rules in insertion order
    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// Add a rule. Hard rules are rejected while an execution epoch is
    /// open; soft rules are accepted at all times.
    pub fn add_rule(&mut self, rule: PolicyRule) -> Result<()> {
        if self.executing && rule.kind == RuleKind::Hard {
            return Err(PolicyError::Immutable(format!(
                "cannot add hard rule '{}'",
                rule.description
            )));
        }
        self.audit.append(AuditEvent::summary(
            AuditEventKind::RuleAdded,
            rule.description.clone(),
            format!("{:?} priority {}", rule.kind, rule.priority),
        ));
        self.rules.push(rule);
        Ok(())
    }

    /// Remove a rule by description. Returns whether a rule was removed.
    pub fn remove_rule(&mut self, description: &str) -> Result<bool> {
        let Some(index) = self.rules.iter().position(|r| r.description == description) else {
            return Ok(false);
        };
        if self.executing && self.rules[index].kind == RuleKind::Hard {
            return Err(PolicyError::Immutable(format!(
                "cannot remove hard rule '{description}'"
            )));
        }
        self.rules.remove(index);
        self.audit.append(AuditEvent::summary(
            AuditEventKind::RuleRemoved,
            description,
            "removed",
        ));
        Ok(true)
    }

    /// Change a rule's priority. Returns whether a rule was updated.
    pub fn update_rule_priority(&mut self, description: &str, priority: u32) -> Result<bool> {
        let Some(index) = self.rules.iter().position(|r| r.description == description) else {
            return Ok(false);
        };
        if self.executing && self.rules[index].kind == RuleKind::Hard {
            return Err(PolicyError::Immutable(format!(
                "cannot reprioritize hard rule '{description}'"
            )));
        }
        self.rules[index].priority = priority;
        self.audit.append(AuditEvent::summary(
            AuditEventKind::RuleUpdated,
            description,
            format!("priority {priority}"),
        ));
        Ok(true)
    }

    /// Open an execution epoch; hard rules become immutable
    pub fn start_execution(&mut self) {
        self.executing = true;
        self.audit.append(AuditEvent::summary(
            AuditEventKind::ExecutionStarted,
            "execution epoch",
            "started",
        ));
    }

    /// Close the execution epoch
    pub fn stop_execution(&mut self) {
        self.executing = false;
        self.audit.append(AuditEvent::summary(
            AuditEventKind::ExecutionStopped,
            "execution epoch",
            "stopped",
        ));
    }

    /// Replace the safety margins; a no-op while an execution epoch is
    /// open
    pub fn set_safety_constraints(&mut self, margins: SafetyMargins) {
        if self.executing {
            warn!("ignoring safety constraint update during execution epoch");
            return;
        }
        self.margins = margins;
        self.audit.append(AuditEvent::summary(
            AuditEventKind::ConstraintsUpdated,
            "safety margins",
            "replaced",
        ));
    }

    /// Rule indices in evaluation order: ascending priority, hard before
    /// soft within equal priority, insertion order as the final tiebreak
    fn evaluation_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.rules.len()).collect();
        order.sort_by_key(|&i| {
            let rule = &self.rules[i];
            (rule.priority, matches!(rule.kind, RuleKind::Soft), i)
        });
        order
    }

    /// Evaluate every rule once against (workload, target), recording
    /// violations, firing corrective actions, and appending one audit
    /// record carrying the trace.
    fn evaluate_rules(&mut self, workload: &Workload, target: &Target) -> PolicyDecision {
        let started = Instant::now();
        let mut allowed = true;
        let mut violated_rules = Vec::new();
        let mut score_adjustment = 0.0;
        let mut trace = Vec::new();
        let mut wants_full = false;

        for index in self.evaluation_order() {
            let rule = &self.rules[index];
            let passed = rule.predicate.evaluate(workload, target);
            wants_full |= rule.audit_level == AuditLevel::Full;
            trace.push(RuleEvaluation {
                rule: rule.description.clone(),
                kind: rule.kind,
                passed,
            });

            match (rule.kind, passed) {
                (RuleKind::Hard, false) => {
                    allowed = false;
                    violated_rules.push(rule.description.clone());

                    let mut violation = PolicyViolation {
                        rule: rule.description.clone(),
                        kind: RuleKind::Hard,
                        workload_id: workload.id.clone(),
                        target_id: target.id.clone(),
                        occurred_at: Utc::now(),
                        action: ActionStatus::NotRequired,
                    };
                    let (status, timeout) = rule.run_corrective_action(&violation);
                    violation.action = status;
                    if timeout.is_some() {
                        self.stats.action_timeouts += 1;
                    }
                    self.stats
                        .record_violation(&violation.rule, RuleKind::Hard);
                    self.violations.push(violation);
                }
                (RuleKind::Soft, false) => {
                    violated_rules.push(rule.description.clone());
                    score_adjustment -= SOFT_BONUS_BASE / f64::from(rule.priority.max(1));
                    self.stats
                        .record_violation(&rule.description, RuleKind::Soft);
                    self.violations.push(PolicyViolation {
                        rule: rule.description.clone(),
                        kind: RuleKind::Soft,
                        workload_id: workload.id.clone(),
                        target_id: target.id.clone(),
                        occurred_at: Utc::now(),
                        action: ActionStatus::NotRequired,
                    });
                }
                (RuleKind::Soft, true) => {
                    score_adjustment += SOFT_BONUS_BASE / f64::from(rule.priority.max(1));
                }
                (RuleKind::Hard, true) => {}
            }
        }

        self.stats.record_evaluation(started.elapsed());

        let level = if wants_full {
            AuditLevel::Full
        } else {
            AuditLevel::Summary
        };
        let headline = violated_rules
            .first()
            .cloned()
            .unwrap_or_else(|| "all rules".to_string());
        self.audit.append(AuditEvent {
            event: AuditEventKind::TargetEvaluation,
            workload_id: workload.id.clone(),
            target_id: Some(target.id.clone()),
            rule: headline,
            decision: if allowed { "allowed" } else { "denied" }.to_string(),
            level,
            workload_snapshot: (level == AuditLevel::Full).then(|| workload.clone()),
            target_snapshot: (level == AuditLevel::Full).then(|| target.clone()),
            evaluations: if level == AuditLevel::Full {
                trace
            } else {
                Vec::new()
            },
        });

        PolicyDecision {
            allowed,
            violated_rules,
            score_adjustment,
        }
    }

    /// Targets for which every hard rule holds, returned as clones
    /// carrying the accumulated soft-rule bonus
    pub fn filter_targets(&mut self, workload: &Workload, targets: &[Target]) -> Vec<Target> {
        let mut survivors = Vec::new();
        for target in targets {
            let decision = self.evaluate_rules(workload, target);
            if decision.allowed {
                let mut survivor = target.clone();
                survivor.policy_bonus += decision.score_adjustment;
                survivors.push(survivor);
            } else {
                debug!(
                    target_id = %target.id,
                    violated = ?decision.violated_rules,
                    "target eliminated by hard rules"
                );
            }
        }
        survivors
    }

    /// Evaluate the rule set without mutating the target
    pub fn evaluate_policy(&mut self, workload: &Workload, target: &Target) -> PolicyDecision {
        self.evaluate_rules(workload, target)
    }

    /// Violations recorded since the last clear
    pub fn get_violations(&self) -> &[PolicyViolation] {
        &self.violations
    }

    /// Drop all recorded violations (statistics are unaffected)
    pub fn clear_violations(&mut self) {
        self.violations.clear();
    }

    /// The audit log
    pub fn get_audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// Verify a single record's signature
    pub fn verify_audit_record(&self, record: &AuditRecord) -> Result<()> {
        AuditLog::verify_record(record)
    }

    /// Verify the whole audit chain
    pub fn verify_audit_log_integrity(&self) -> Result<()> {
        self.audit.verify_integrity()
    }

    /// Violation statistics snapshot
    pub fn get_violation_statistics(&self) -> ViolationStatistics {
        self.stats.clone()
    }
}
