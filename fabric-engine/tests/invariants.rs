//! Property-based invariants of the decision pipeline

use std::time::Duration;

use proptest::prelude::*;
use uuid::Uuid;

use fabric_engine::OffloadEngine;
use fabric_model::{
    AdaptiveWeights, Capacity, Outcome, ResourceDemand, ScoreComponent, SystemState, Target,
    TargetType, Workload,
};

const GIB: u64 = 1024 * 1024 * 1024;

fn target_type_strategy() -> impl Strategy<Value = TargetType> {
    prop_oneof![
        Just(TargetType::Local),
        Just(TargetType::Edge),
        Just(TargetType::PrivateCloud),
        Just(TargetType::PublicCloud),
        Just(TargetType::HybridCloud),
        Just(TargetType::HpcCluster),
        Just(TargetType::Fog),
    ]
}

prop_compose! {
    fn arb_target(index: usize)(
        target_type in target_type_strategy(),
        cpu in 0.0f64..32.0,
        security in 0u8..=5,
        reliability in 0.0f64..=1.0,
        load in 0.0f64..=1.0,
        latency_ms in 0u64..500,
        speed in 0.5f64..4.0,
    ) -> Target {
        let mut t = Target::new(format!("t{index}"), target_type)
            .with_capacity(Capacity {
                total_cpu: cpu,
                available_cpu: cpu,
                total_memory: 64 * GIB,
                available_memory: 64 * GIB,
            })
            .with_security_level(security)
            .with_reliability(reliability)
            .with_processing_speed(speed);
        t.current_load = load;
        t.network.latency = Duration::from_millis(latency_ms);
        t
    }
}

prop_compose! {
    fn arb_targets()(count in 1usize..6)(
        targets in prop::collection::vec(arb_target(0), count..=count)
    ) -> Vec<Target> {
        targets
            .into_iter()
            .enumerate()
            .map(|(i, mut t)| {
                t.id = format!("t{i}");
                t
            })
            .collect()
    }
}

prop_compose! {
    fn arb_workload()(
        cpu in 0.0f64..8.0,
        security in 0u8..=5,
        priority in 1u8..=10,
        duration_secs in 1u64..600,
        safety_critical in any::<bool>(),
        locality in any::<bool>(),
    ) -> Workload {
        let mut w = Workload::new("w-prop", "batch")
            .with_demand(ResourceDemand {
                cpu_cores: cpu,
                memory_bytes: GIB,
                disk_bytes: 0,
                network_bandwidth: 0.0,
            })
            .with_estimated_duration(Duration::from_secs(duration_secs))
            .with_priority(priority)
            .with_security_level(security);
        w.safety_critical = safety_critical;
        w.locality_required = locality;
        w
    }
}

prop_compose! {
    fn arb_state()(
        compute in 0.0f64..=1.0,
        memory in 0.0f64..=1.0,
        queue in 0u32..100,
        threshold in 0u32..50,
    ) -> SystemState {
        let mut s = SystemState::idle();
        s.compute_usage = compute;
        s.memory_usage = memory;
        s.queue_depth = queue;
        s.queue_threshold = threshold;
        s
    }
}

proptest! {
    // Whatever the engine decides, a safety-critical workload never
    // lands on a non-local target, and the chosen target always covers
    // the workload's security level.
    #[test]
    fn prop_safety_and_security_gates_hold(
        workload in arb_workload(),
        targets in arb_targets(),
        state in arb_state(),
    ) {
        let engine = OffloadEngine::with_defaults().unwrap();
        let decision = engine.make_decision(&workload, &targets, &state).unwrap();

        prop_assert!(decision.is_consistent());
        if let Some(target_id) = &decision.target_id {
            let chosen = targets.iter().find(|t| &t.id == target_id).unwrap();
            if workload.safety_critical {
                prop_assert_eq!(chosen.target_type, TargetType::Local);
            }
            prop_assert!(chosen.security_level >= workload.security_level);
            if workload.locality_required {
                prop_assert!(chosen.target_type.is_local_or_edge());
            }
        }
    }

    // Every sub-score, the final score, and the confidence stay in [0, 1].
    #[test]
    fn prop_scores_in_range(
        workload in arb_workload(),
        targets in arb_targets(),
        state in arb_state(),
    ) {
        let engine = OffloadEngine::with_defaults().unwrap();
        let decision = engine.make_decision(&workload, &targets, &state).unwrap();

        prop_assert!((0.0..=1.0).contains(&decision.score));
        prop_assert!((0.0..=1.0).contains(&decision.confidence));
        for sub in decision.breakdown.as_array() {
            prop_assert!((0.0..=1.0).contains(&sub));
        }
        prop_assert!(decision.expected_benefit >= 0.0);
        prop_assert!(decision.estimated_cost >= 0.0);
    }

    // The weight vector stays on the simplex through any sequence of
    // outcome reports.
    #[test]
    fn prop_weights_reachable_set_is_simplex(
        rewards in prop::collection::vec(-1.0f64..=1.0, 1..40),
        masses in prop::collection::vec(0.0f64..=1.0, 1..40),
    ) {
        let engine = OffloadEngine::with_defaults().unwrap();
        for (i, (reward, mass)) in rewards.iter().zip(masses.iter()).enumerate() {
            let component = ScoreComponent::ALL[i % 6];
            let outcome = Outcome::success(Uuid::nil(), format!("w{i}"), "t0")
                .with_reward(*reward)
                .with_attribution(component, *mass);
            engine.report_outcome(outcome).unwrap();

            let weights = engine.get_weights();
            prop_assert!(weights.is_normalized(), "left simplex: {:?}", weights.as_array());
        }
    }

    // Identical inputs against identical engine snapshots give identical
    // decision content.
    #[test]
    fn prop_decisions_are_deterministic(
        workload in arb_workload(),
        targets in arb_targets(),
        state in arb_state(),
    ) {
        let run = || {
            OffloadEngine::with_defaults()
                .unwrap()
                .make_decision(&workload, &targets, &state)
                .unwrap()
        };
        let a = run();
        let b = run();
        prop_assert_eq!(a.id, b.id);
        prop_assert_eq!(a.should_offload, b.should_offload);
        prop_assert_eq!(a.target_id, b.target_id);
        prop_assert_eq!(a.score, b.score);
        prop_assert_eq!(a.breakdown, b.breakdown);
        prop_assert_eq!(a.strategy, b.strategy);
        prop_assert_eq!(&a.reason, &b.reason);
    }

    // update_weights renormalizes; applying it to a vector already on
    // the simplex is a no-op.
    #[test]
    fn prop_renormalization_round_trip(values in proptest::array::uniform6(0.01f64..1.0)) {
        let engine = OffloadEngine::with_defaults().unwrap();
        engine.update_weights(AdaptiveWeights::from_array(values));
        let once = engine.get_weights();
        prop_assert!(once.is_normalized());

        engine.update_weights(once);
        let twice = engine.get_weights();
        for (a, b) in once.as_array().iter().zip(twice.as_array().iter()) {
            prop_assert!((a - b).abs() < 1e-12);
        }
    }
}
