//! Decision records returned by the engine

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::score::ScoreBreakdown;

/// Execution strategy recommended with an offload decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Forward now
    Immediate,
    /// Forward once the target's queue drains
    Delayed,
    /// Accumulate with similar workloads before forwarding (host-driven;
    /// the scoring path never emits this)
    Batched,
    /// Workload carries a pipeline DAG; forward stage-wise
    Pipelined,
}

/// The engine's answer for one workload placement
///
/// Invariant: `target_id` is present iff `should_offload` is true. The
/// matched pattern is referenced by id only; usage counters are updated
/// through the recognizer's mutator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Decision identity, derived deterministically from the engine's
    /// decision counter and the workload id
    pub id: Uuid,

    /// True when the workload should run on `target_id` instead of locally
    pub should_offload: bool,

    /// Chosen target; absent for local decisions
    pub target_id: Option<String>,

    /// Confidence in the decision (0.0-1.0)
    pub confidence: f64,

    /// Final selection score of the winner (0.0-1.0); zero for local
    /// decisions that never scored a target
    pub score: f64,

    /// Per-component sub-scores and the weight snapshot that produced them
    pub breakdown: ScoreBreakdown,

    /// Pattern applied during scoring, when one matched
    pub applied_pattern: Option<Uuid>,

    /// Descriptions of policy rules violated by rejected targets
    pub violations: Vec<String>,

    /// Recommended execution strategy
    pub strategy: Strategy,

    /// Expected fractional duration saving from offloading (>= 0)
    pub expected_benefit: f64,

    /// Estimated monetary cost on the chosen target (>= 0)
    pub estimated_cost: f64,

    /// Why the engine decided this way (gate or fallback reason for local
    /// decisions, "scored best" for offloads)
    pub reason: String,

    /// When the decision was made
    pub decided_at: DateTime<Utc>,

    /// Wall time the decision took
    pub latency: Duration,

    /// Version of the decision algorithm that produced this record
    pub algorithm_version: String,
}

impl Decision {
    /// True when the record satisfies its structural invariant
    pub fn is_consistent(&self) -> bool {
        self.should_offload == self.target_id.is_some()
    }
}
