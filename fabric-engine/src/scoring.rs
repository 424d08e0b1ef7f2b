//! Scoring kernel
//!
//! Computes six sub-scores in [0, 1] for a (workload, target, state)
//! triple and their weighted sum under the current weight vector. The
//! kernel is pure: no side effects, deterministic in its inputs.

use fabric_model::{AdaptiveWeights, ScoreBreakdown, SystemState, Target, Workload};

/// Data volume against which transfer size is normalized (100 MiB)
const DATA_REFERENCE_BYTES: f64 = 100.0 * 1024.0 * 1024.0;

/// Latency against which target latency is normalized (100 ms)
const LATENCY_REFERENCE_SECS: f64 = 0.1;

/// Baseline for the deadline-free latency sub-score (30 s)
const LATENCY_BASELINE_SECS: f64 = 30.0;

/// Energy cost per hour treated as prohibitively expensive
const ENERGY_COST_CEILING: f64 = 10.0;

/// Blend factors for capability match vs historical success
const POLICY_MATCH_BLEND: f64 = 0.7;
const POLICY_SUCCESS_BLEND: f64 = 0.3;

/// Pressure-relief benefit of draining the local queue: a logistic over
/// queue depth relative to the threshold, zero when no threshold is
/// configured.
pub fn queue_impact(state: &SystemState) -> f64 {
    if state.queue_threshold == 0 {
        return 0.0;
    }
    let pressure = state.queue_pressure();
    1.0 / (1.0 + (-2.0 * (pressure - 0.5)).exp())
}

/// How well the target's load complements the host's: 1 minus the
/// absolute load gap.
pub fn load_balance(state: &SystemState, target: &Target) -> f64 {
    (1.0 - (state.load_score() - target.current_load).abs()).clamp(0.0, 1.0)
}

/// Cheapness of moving the workload's data (higher = cheaper): transfer
/// volume and link latency, each normalized and capped, cost half each.
pub fn network_cost(workload: &Workload, target: &Target) -> f64 {
    let data = (workload.data.transfer_bytes() as f64 / DATA_REFERENCE_BYTES).min(1.0);
    let latency = (target.network.latency.as_secs_f64() / LATENCY_REFERENCE_SECS).min(1.0);
    (1.0 - 0.5 * data - 0.5 * latency).clamp(0.0, 1.0)
}

/// Deadline headroom on the target. With a deadline, the remaining
/// fraction after the estimated execution time; without one, a decaying
/// function of the estimate against a 30 s baseline.
pub fn latency_impact(workload: &Workload, target: &Target) -> f64 {
    let estimate = target.estimated_execution_time(workload).as_secs_f64();
    if !workload.deadline.is_zero() {
        (1.0 - estimate / workload.deadline.as_secs_f64()).max(0.0).min(1.0)
    } else {
        1.0 / (1.0 + estimate / LATENCY_BASELINE_SECS)
    }
}

/// Cheapness of the target's energy (higher = cheaper)
pub fn energy_impact(target: &Target) -> f64 {
    (1.0 - target.energy_cost_per_hour / ENERGY_COST_CEILING).clamp(0.0, 1.0)
}

/// Policy/capability compatibility, blended with the target's historical
/// success rate when one is known.
pub fn policy_match(workload: &Workload, target: &Target) -> f64 {
    let matched = target.capability_match(workload);
    match target.success_rate {
        Some(success) => {
            (POLICY_MATCH_BLEND * matched + POLICY_SUCCESS_BLEND * success.clamp(0.0, 1.0))
                .clamp(0.0, 1.0)
        }
        None => matched,
    }
}

/// Score one target: the six sub-scores plus a snapshot of the weights
/// used. The final score is `breakdown.weighted_total()`.
pub fn score_target(
    workload: &Workload,
    target: &Target,
    state: &SystemState,
    weights: AdaptiveWeights,
) -> ScoreBreakdown {
    ScoreBreakdown {
        queue_impact: queue_impact(state),
        load_balance: load_balance(state, target),
        network_cost: network_cost(workload, target),
        latency_impact: latency_impact(workload, target),
        energy_impact: energy_impact(target),
        policy_match: policy_match(workload, target),
        weights,
    }
}
