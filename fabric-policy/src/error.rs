//! Policy engine errors

use thiserror::Error;

/// Result type for policy operations
pub type Result<T> = std::result::Result<T, PolicyError>;

/// Errors raised by the policy engine
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PolicyError {
    /// A hard-rule mutation was attempted during an execution epoch
    #[error("policy is immutable during execution: {0}")]
    Immutable(String),

    /// The audit log signature chain is broken
    #[error("audit chain integrity violation at record {sequence}: {reason}")]
    IntegrityViolation {
        /// Sequence number of the offending record
        sequence: u64,
        /// What failed to verify
        reason: String,
    },

    /// A corrective action did not complete within its budget
    #[error("corrective action for rule '{rule}' exhausted its time budget")]
    ResourceExhausted {
        /// Rule whose action timed out
        rule: String,
    },
}
