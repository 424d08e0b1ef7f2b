//! # Fabric Model - Offload Decision Data Model
//!
//! Shared data model for the fabric process-offloading decision engine:
//! workloads, execution targets, system state, adaptive scoring weights,
//! decisions, measured outcomes, and learned patterns.
//!
//! Ownership contract: workloads and targets are owned by the caller and
//! passed by read-only reference into a decision. The engine owns the
//! mutable weight vector, pattern collection, outcome window, and audit
//! log. No entity in this crate holds a back-reference to the engine.
//!
//! Every type with a lifecycle is plain serializable data so a host can
//! persist it in whatever format it chooses. Map-like fields use ordered
//! containers so serialized encodings are deterministic (the policy audit
//! chain hashes them).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod decision;
pub mod error;
pub mod outcome;
pub mod pattern;
pub mod score;
pub mod state;
pub mod target;
pub mod weights;
pub mod workload;

pub use config::{LearningConfig, SafetyMargins};
pub use decision::{Decision, Strategy};
pub use error::{ModelError, Result};
pub use outcome::Outcome;
pub use pattern::{
    Comparison, ConditionValue, FeatureTag, Pattern, PatternCondition, RecommendedAction,
    ValidationStatus,
};
pub use score::ScoreBreakdown;
pub use state::SystemState;
pub use target::{Capacity, NetworkProfile, Target, TargetType};
pub use weights::{AdaptiveWeights, ScoreComponent};
pub use workload::{
    DataProfile, PipelineSpec, PipelineStage, ResourceDemand, Workload, WorkloadStatus,
};

/// Staleness bound after which a target is considered unhealthy.
pub const TARGET_STALENESS_SECS: i64 = 90;

/// Maximum data-sensitivity and security level.
pub const MAX_SECURITY_LEVEL: u8 = 5;
