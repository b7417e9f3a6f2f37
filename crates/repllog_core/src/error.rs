//! Error types for the replication log.

use crate::types::TransactionId;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in replication log operations.
///
/// Every failure is local to the current statement: the store, ledger and
/// pending addresses are left in their last valid state.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Payload codec error.
    #[error("codec error: {0}")]
    Codec(#[from] repllog_codec::CodecError),

    /// I/O error while writing a dump.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Growing the record array or allocating a payload or savepoint failed.
    #[error("allocation failed: {what}")]
    AllocationFailure {
        /// What was being allocated.
        what: String,
    },

    /// No replication state is registered for the transaction.
    #[error("unknown transaction: {txid}")]
    UnknownTransaction {
        /// The transaction that was looked up.
        txid: TransactionId,
    },

    /// Rollback target does not exist.
    #[error("savepoint not found: {name}")]
    SavepointNotFound {
        /// Name of the savepoint.
        name: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates an allocation failure error.
    pub fn allocation_failure(what: impl Into<String>) -> Self {
        Self::AllocationFailure { what: what.into() }
    }

    /// Creates an unknown transaction error.
    pub fn unknown_transaction(txid: TransactionId) -> Self {
        Self::UnknownTransaction { txid }
    }

    /// Creates a savepoint not found error.
    pub fn savepoint_not_found(name: impl Into<String>) -> Self {
        Self::SavepointNotFound { name: name.into() }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true for allocation failures.
    #[must_use]
    pub fn is_allocation_failure(&self) -> bool {
        matches!(self, Self::AllocationFailure { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_subject() {
        assert_eq!(
            CoreError::savepoint_not_found("sp1").to_string(),
            "savepoint not found: sp1"
        );
        assert_eq!(
            CoreError::unknown_transaction(TransactionId::new(3)).to_string(),
            "unknown transaction: txn:3"
        );
        assert!(CoreError::allocation_failure("record array").is_allocation_failure());
    }
}
