//! Policy rules: predicates over (workload, target) pairs
//!
//! Predicates are first-class values: a closed set of built-ins covering
//! the safety and compliance gates of the decision pipeline, plus a
//! host-supplied escape hatch. Predicates must be pure and must not block;
//! corrective actions run on their own thread under a 1 s budget.

use std::fmt;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use fabric_model::{Target, Workload};

use crate::audit::AuditLevel;
use crate::error::PolicyError;
use crate::CORRECTIVE_ACTION_TIMEOUT_SECS;

/// Whether a rule filters targets or only shifts scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Must hold; a failing target is eliminated
    Hard,
    /// Shifts the score but never filters
    Soft,
}

/// Host-supplied predicate
pub type HostPredicate = Arc<dyn Fn(&Workload, &Target) -> bool + Send + Sync>;

/// Host-supplied corrective action, invoked synchronously on hard
/// violations. Receives the violation and returns a completion note or a
/// failure reason.
pub type CorrectiveAction =
    Arc<dyn Fn(PolicyViolation) -> std::result::Result<String, String> + Send + Sync + 'static>;

/// Rule predicate: built-ins for the standard gates, `Custom` for
/// host-supplied logic
#[derive(Clone)]
pub enum Predicate {
    /// Target security level covers the workload's requirement
    SecurityLevelSatisfied,
    /// Safety-critical workloads only pass on local targets
    SafetyCriticalLocal,
    /// Locality-required workloads only pass on local or edge targets
    LocalityRespected,
    /// Target heartbeat is within the staleness bound
    TargetHealthy,
    /// Target reliability is at least the given floor
    MinReliability(f64),
    /// Target round-trip latency is at most the given bound
    MaxLatency(Duration),
    /// Target can hold the workload's resource demand
    CanAccommodate,
    /// Target carries the given compliance tag
    ComplianceTagRequired(String),
    /// Target jurisdiction is one of the allowed tags
    JurisdictionAllowed(Vec<String>),
    /// Host-supplied predicate
    Custom(HostPredicate),
}

impl Predicate {
    /// Evaluate the predicate. Pure; must not block.
    pub fn evaluate(&self, workload: &Workload, target: &Target) -> bool {
        match self {
            Self::SecurityLevelSatisfied => workload.security_level <= target.security_level,
            Self::SafetyCriticalLocal => {
                !workload.safety_critical
                    || target.target_type == fabric_model::TargetType::Local
            }
            Self::LocalityRespected => {
                !workload.locality_required || target.target_type.is_local_or_edge()
            }
            Self::TargetHealthy => target.is_healthy(Utc::now()),
            Self::MinReliability(floor) => target.reliability >= *floor,
            Self::MaxLatency(bound) => target.network.latency <= *bound,
            Self::CanAccommodate => target.can_accommodate(workload),
            Self::ComplianceTagRequired(tag) => target.compliance_tags.contains(tag),
            Self::JurisdictionAllowed(allowed) => allowed.contains(&target.jurisdiction),
            Self::Custom(predicate) => predicate(workload, target),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SecurityLevelSatisfied => write!(f, "SecurityLevelSatisfied"),
            Self::SafetyCriticalLocal => write!(f, "SafetyCriticalLocal"),
            Self::LocalityRespected => write!(f, "LocalityRespected"),
            Self::TargetHealthy => write!(f, "TargetHealthy"),
            Self::MinReliability(floor) => write!(f, "MinReliability({floor})"),
            Self::MaxLatency(bound) => write!(f, "MaxLatency({bound:?})"),
            Self::CanAccommodate => write!(f, "CanAccommodate"),
            Self::ComplianceTagRequired(tag) => write!(f, "ComplianceTagRequired({tag})"),
            Self::JurisdictionAllowed(allowed) => write!(f, "JurisdictionAllowed({allowed:?})"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Completion state of a hard violation's corrective action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ActionStatus {
    /// The rule has no corrective action
    NotRequired,
    /// The action completed within its budget
    Completed {
        /// When it completed
        at: DateTime<Utc>,
        /// Note returned by the action
        note: String,
    },
    /// The action did not complete within its budget and is still running
    Pending,
    /// The action returned a failure
    Failed {
        /// Reason returned by the action
        reason: String,
    },
}

/// A recorded rule violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyViolation {
    /// Description of the violated rule
    pub rule: String,

    /// Rule kind
    pub kind: RuleKind,

    /// Workload being placed
    pub workload_id: String,

    /// Target that failed the rule
    pub target_id: String,

    /// When the violation occurred
    pub occurred_at: DateTime<Utc>,

    /// Corrective-action completion state
    pub action: ActionStatus,
}

/// A policy rule
#[derive(Clone)]
pub struct PolicyRule {
    /// Hard (filtering) or soft (scoring)
    pub kind: RuleKind,

    /// Evaluation priority; lower numbers evaluate first
    pub priority: u32,

    /// The predicate that must hold
    pub predicate: Predicate,

    /// Description, also the rule's identity for mutation by name
    pub description: String,

    /// Audit verbosity for evaluations of this rule
    pub audit_level: AuditLevel,

    /// Invoked synchronously on hard violations, under a 1 s budget
    pub corrective_action: Option<CorrectiveAction>,
}

impl fmt::Debug for PolicyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyRule")
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .field("predicate", &self.predicate)
            .field("description", &self.description)
            .field("audit_level", &self.audit_level)
            .field("has_corrective_action", &self.corrective_action.is_some())
            .finish()
    }
}

impl PolicyRule {
    /// Create a rule with summary auditing and no corrective action
    pub fn new(
        kind: RuleKind,
        priority: u32,
        predicate: Predicate,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            priority,
            predicate,
            description: description.into(),
            audit_level: AuditLevel::Summary,
            corrective_action: None,
        }
    }

    /// Shorthand for a hard rule
    pub fn hard(priority: u32, predicate: Predicate, description: impl Into<String>) -> Self {
        Self::new(RuleKind::Hard, priority, predicate, description)
    }

    /// Shorthand for a soft rule
    pub fn soft(priority: u32, predicate: Predicate, description: impl Into<String>) -> Self {
        Self::new(RuleKind::Soft, priority, predicate, description)
    }

    /// Set the audit verbosity
    pub fn with_audit_level(mut self, level: AuditLevel) -> Self {
        self.audit_level = level;
        self
    }

    /// Attach a corrective action
    pub fn with_corrective_action(mut self, action: CorrectiveAction) -> Self {
        self.corrective_action = Some(action);
        self
    }

    /// Run the rule's corrective action for a violation, enforcing the
    /// 1 s budget. An action that does not answer in time leaves the
    /// violation `Pending` and surfaces as a `ResourceExhausted` event;
    /// the decision pipeline proceeds either way.
    pub fn run_corrective_action(
        &self,
        violation: &PolicyViolation,
    ) -> (ActionStatus, Option<PolicyError>) {
        let Some(action) = &self.corrective_action else {
            return (ActionStatus::NotRequired, None);
        };

        let (tx, rx) = mpsc::channel();
        let action = Arc::clone(action);
        let violation_for_action = violation.clone();
        std::thread::spawn(move || {
            // The receiver may be gone if the budget elapsed; ignore.
            let _ = tx.send(action(violation_for_action));
        });

        match rx.recv_timeout(Duration::from_secs(CORRECTIVE_ACTION_TIMEOUT_SECS)) {
            Ok(Ok(note)) => (
                ActionStatus::Completed {
                    at: Utc::now(),
                    note,
                },
                None,
            ),
            Ok(Err(reason)) => (ActionStatus::Failed { reason }, None),
            Err(_) => {
                warn!(rule = %self.description, "corrective action exceeded its budget");
                (
                    ActionStatus::Pending,
                    Some(PolicyError::ResourceExhausted {
                        rule: self.description.clone(),
                    }),
                )
            }
        }
    }
}
