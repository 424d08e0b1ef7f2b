//! Convergence behavior of the adaptive layer under sustained signals

use uuid::Uuid;

use fabric_learning::{AdaptiveLearner, OutcomeWindow, PatternRecognizer};
use fabric_model::{
    AdaptiveWeights, LearningConfig, Outcome, ScoreComponent, ValidationStatus,
};

fn attributed_outcome(i: u32, component: ScoreComponent, mass: f64, reward: f64) -> Outcome {
    Outcome::success(Uuid::nil(), format!("w{i}"), "t1")
        .with_reward(reward)
        .with_attribution(component, mass)
}

// A consistent attribution signal concentrating at least half its mass on
// one component migrates that component's weight up by at least 0.15
// within 200 updates, and the learner converges.
#[test]
fn consistent_attribution_converges_and_migrates() {
    for component in ScoreComponent::ALL {
        let mut learner =
            AdaptiveLearner::new(AdaptiveWeights::default(), &LearningConfig::default());
        let initial = learner.weights().get(component);

        for i in 0..200 {
            learner.update(&attributed_outcome(i, component, 0.5, 1.0));
        }

        let final_weight = learner.weights().get(component);
        assert!(
            final_weight - initial >= 0.15,
            "{}: {} -> {}",
            component.as_str(),
            initial,
            final_weight
        );
        assert!(learner.is_converged(), "{} did not converge", component.as_str());
        assert!(learner.converged_at().unwrap() <= 200);
        assert!(learner.weights().is_normalized());
    }
}

// Convergence requires a settled trajectory, not merely update count: an
// alternating signal keeps the vector moving.
#[test]
fn oscillating_signal_delays_convergence() {
    let config = LearningConfig::default()
        .with_learning_rate(0.5)
        .with_exploration_rate(0.0);
    let mut learner = AdaptiveLearner::new(AdaptiveWeights::default(), &config);

    for i in 0..30 {
        let (component, reward) = if i % 2 == 0 {
            (ScoreComponent::QueueDepth, 1.0)
        } else {
            (ScoreComponent::EnergyCost, 1.0)
        };
        learner.update(&attributed_outcome(i, component, 1.0, reward));
    }
    assert!(
        !learner.is_converged(),
        "large alternating updates should not read as converged"
    );
}

// The recognizer's full lifecycle: discovery from history, validation,
// matching, and bounded capacity, fed through the same outcome stream as
// the window.
#[test]
fn recognizer_and_window_share_an_outcome_stream() {
    let config = LearningConfig::default().with_min_samples(5);
    let mut recognizer = PatternRecognizer::new(&config);
    let mut window = OutcomeWindow::new(config.window_size);

    for i in 0..30 {
        let outcome = attributed_outcome(i, ScoreComponent::QueueDepth, 0.5, 0.9);
        recognizer.observe(outcome.clone());
        window.push(outcome);
    }

    assert_eq!(window.len(), 30);
    assert_eq!(window.total_inserted(), 30);
    assert!((window.success_rate() - 1.0).abs() < 1e-12);

    let validated = recognizer
        .patterns()
        .iter()
        .find(|p| p.name == "high-queue-offload")
        .unwrap();
    assert_eq!(validated.status, ValidationStatus::Validated);
    assert!(validated.success_rate > 0.8);
    assert!(validated.confidence > 0.5);
}
