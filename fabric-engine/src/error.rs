//! Engine errors

use thiserror::Error;

use fabric_model::ModelError;
use fabric_policy::PolicyError;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the decision engine
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// Workload, state, or outcome validation failed
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ModelError),

    /// A policy operation failed
    #[error(transparent)]
    Policy(#[from] PolicyError),
}
