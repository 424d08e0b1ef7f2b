//! # Fabric Policy - Constraint Enforcement with Tamper-Evident Auditing
//!
//! Policy layer of the fabric offload decision engine. HARD rules are
//! never violated: a target failing any hard rule is eliminated from
//! placement. SOFT rules only shift scores, contributing an additive
//! policy bonus scaled by rule priority. During an execution epoch
//! (`start_execution` .. `stop_execution`) hard rules are immutable.
//!
//! Every evaluation is observed by an append-only audit log whose records
//! carry a signature chained to the previous record, so any mutation or
//! reordering of the log is detectable after the fact.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::all)]

pub mod audit;
pub mod engine;
pub mod error;
pub mod rule;
pub mod stats;

pub use audit::{AuditEventKind, AuditLevel, AuditLog, AuditRecord, RuleEvaluation};
pub use engine::{PolicyDecision, PolicyEngine};
pub use error::{PolicyError, Result};
pub use rule::{ActionStatus, CorrectiveAction, PolicyRule, PolicyViolation, Predicate, RuleKind};
pub use stats::ViolationStatistics;

/// Budget for a hard-rule corrective action before it is recorded as
/// pending.
pub const CORRECTIVE_ACTION_TIMEOUT_SECS: u64 = 1;
