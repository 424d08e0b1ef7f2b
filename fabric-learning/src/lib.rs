//! # Fabric Learning - The Adaptive Layer
//!
//! Closes the feedback loop of the offload decision engine. Reported
//! outcomes drive three structures:
//!
//! - [`AdaptiveLearner`] moves the scoring weight vector along the
//!   outcome's attribution gradient while keeping it on the simplex, and
//!   latches a convergence predicate once the vector settles.
//! - [`PatternRecognizer`] mines conditional rules from outcome history,
//!   validates them against their success rate, and serves the best
//!   matching validated pattern to the decision pipeline.
//! - [`OutcomeWindow`] keeps a bounded ring of recent outcomes with
//!   running aggregates.
//!
//! Everything here is deterministic: exploration noise comes from a pure
//! function of the update counter, never a process-wide random source, so
//! a replayed outcome sequence reproduces the same weight trajectory.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod learner;
pub mod recognizer;
pub mod window;

pub use learner::AdaptiveLearner;
pub use recognizer::PatternRecognizer;
pub use window::OutcomeWindow;
