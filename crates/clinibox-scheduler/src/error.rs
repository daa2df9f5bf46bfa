//! Scheduler error type.

use clinibox_core::VisitId;
use clinibox_storage::StorageError;

/// Errors surfaced by scheduler operations.
///
/// `Conflict` and `NotFound` are expected, locally recoverable outcomes: the
/// caller refreshes its view and re-evaluates. `Precondition` means the
/// request was rejected before any write. Only `Storage` may indicate real
/// infrastructure trouble.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// A compare-and-swap matched zero rows: another terminal got there
    /// first. Refetch current state before retrying; never retry with the
    /// same stale precondition.
    #[error("Visit {visit_id} already claimed or transitioned")]
    Conflict {
        /// The visit whose expected state no longer holds.
        visit_id: VisitId,
    },

    /// The referenced visit does not exist.
    #[error("Visit not found: {visit_id}")]
    NotFound {
        /// The missing visit.
        visit_id: VisitId,
    },

    /// The request contradicts current state; rejected with zero effect.
    #[error("Precondition violation: {message}")]
    Precondition {
        /// What was violated.
        message: String,
    },

    /// The store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SchedulerError {
    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(visit_id: VisitId) -> Self {
        Self::Conflict { visit_id }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(visit_id: VisitId) -> Self {
        Self::NotFound { visit_id }
    }

    /// Creates a new `Precondition` error.
    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a lost claim race.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns `true` if the visit was missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if the request was rejected before any write.
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition { .. })
    }
}
