//! # Fabric Engine - Process-Offloading Decisions
//!
//! End-to-end decision pipeline for a distributed compute fabric: given a
//! candidate workload, the current pool of execution targets, and the
//! local host's load, decide whether to execute locally or forward to a
//! specific target, with an explainable score breakdown.
//!
//! One decision flows gate → policy filter → structural filter → pattern
//! match → score → select → explain. Reported outcomes feed back into the
//! adaptive layer so scoring weights and pattern rules improve over time.
//!
//! The pipeline is deterministic: identical inputs against an identical
//! engine snapshot produce identical decision content. No randomness
//! appears anywhere in the scoring path.
//!
//! ## Example
//!
//! ```rust,no_run
//! use fabric_engine::OffloadEngine;
//! use fabric_model::{
//!     AdaptiveWeights, LearningConfig, SafetyMargins, SystemState, Target, TargetType, Workload,
//! };
//!
//! # fn main() -> Result<(), fabric_engine::EngineError> {
//! let engine = OffloadEngine::new(
//!     AdaptiveWeights::default(),
//!     SafetyMargins::default(),
//!     LearningConfig::default(),
//!     Vec::new(),
//! )?;
//!
//! let workload = Workload::new("w1", "batch");
//! let targets = vec![Target::new("edge-1", TargetType::Edge)];
//! let state = SystemState::idle();
//!
//! let decision = engine.make_decision(&workload, &targets, &state)?;
//! println!("offload: {} ({})", decision.should_offload, decision.reason);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod engine;
pub mod error;
pub mod scoring;

pub use engine::{EngineStats, OffloadEngine};
pub use error::{EngineError, Result};

/// Version tag stamped into every decision record
pub const ALGORITHM_VERSION: &str = concat!("fabric/", env!("CARGO_PKG_VERSION"));

/// Soft wall-time budget for one decision; overruns are warned about,
/// never failed
pub const DECISION_BUDGET_MILLIS: u64 = 500;

/// Minimum winning score for an offload to be worth it
pub const ACCEPTANCE_THRESHOLD: f64 = 0.3;
