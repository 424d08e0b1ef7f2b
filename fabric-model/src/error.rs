//! Error types for the data model

use thiserror::Error;

use crate::workload::WorkloadStatus;

/// Result type for model validation
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised by model validation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ModelError {
    /// Workload failed validation
    #[error("invalid workload '{id}': {reason}")]
    InvalidWorkload {
        /// Workload identity
        id: String,
        /// What failed
        reason: String,
    },

    /// Target failed validation
    #[error("invalid target '{id}': {reason}")]
    InvalidTarget {
        /// Target identity
        id: String,
        /// What failed
        reason: String,
    },

    /// System state failed validation
    #[error("invalid system state: {0}")]
    InvalidState(String),

    /// Weight vector failed validation
    #[error("invalid weights: {0}")]
    InvalidWeights(String),

    /// Outcome failed validation
    #[error("invalid outcome: {0}")]
    InvalidOutcome(String),

    /// Configuration failed validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Illegal workload lifecycle transition
    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// Current status
        from: WorkloadStatus,
        /// Requested status
        to: WorkloadStatus,
    },
}
