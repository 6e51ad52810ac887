//! Error types for reconciliation
//!
//! Three failure classes exist, each with a different blast radius:
//!
//! - **MalformedOperation:** a single wire operation is unusable. Logged and
//!   skipped, the rest of its Edit survives.
//! - **InconsistentChangeSet:** pending edits can no longer be attached to the
//!   current revision. Fatal for the reconciliation pass and always returned.
//! - **UnrelatedRebase:** two edits handed to the rebaser are neither siblings
//!   nor parent/child. Logged by the Processor, which carries on.

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Errors produced while diffing, rebasing or processing edits
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// An operation is missing its payload or names an unknown kind
    #[error("malformed {kind} operation at offset {offset}: {reason}")]
    MalformedOperation {
        kind: String,
        offset: usize,
        reason: String,
    },

    /// No pending edit is based on the current revision
    #[error("inconsistent change set: nothing is based on {revision} ({} edit(s) still pending: {})", .pending.len(), .pending.join(", "))]
    InconsistentChangeSet {
        revision: String,
        pending: Vec<String>,
    },

    /// Rebase requested between edits that are neither siblings nor parent/child
    #[error("cannot rebase {edit} onto unrelated edit {base}")]
    UnrelatedRebase { base: String, edit: String },

    /// JSON encoding or decoding failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReconcileError {
    /// Whether the error aborts a reconciliation pass
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReconcileError::InconsistentChangeSet { .. } | ReconcileError::Serialization(_)
        )
    }
}
