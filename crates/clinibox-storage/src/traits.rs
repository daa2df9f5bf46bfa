//! Store traits every backend must implement.
//!
//! Implementations must be thread-safe (`Send + Sync`). The contracts here
//! are what the scheduler's correctness rests on: `conditional_update` is the
//! at-most-one-assignment CAS, `day_snapshot` is the single consistent read
//! the view engine derives from, and `subscribe` is the change feed the
//! realtime layer fans out.

use async_trait::async_trait;
use tokio::sync::broadcast;

use clinibox_core::{ChangeEvent, ClinicDay, ExamAssignment, ExamAssignmentId, Visit, VisitId};

use crate::error::StorageError;
use crate::types::{
    DaySnapshot, ExamFilter, ExamPatch, NewExamAssignment, NewVisit, VisitExpect, VisitPatch,
};

/// Visit-table operations.
#[async_trait]
pub trait VisitStore: Send + Sync {
    /// Inserts a new visit in `Waiting` state with no box.
    ///
    /// The backend stamps the id, the entry time and the per-day entry
    /// number; entry numbers are unique and monotone within the day even
    /// under concurrent inserts.
    async fn insert_visit(&self, new: NewVisit) -> Result<Visit, StorageError>;

    /// Reads a visit by id. Returns `None` if it does not exist.
    async fn get_visit(&self, id: VisitId) -> Result<Option<Visit>, StorageError>;

    /// Conditionally updates a visit: the patch applies only if the stored
    /// row still matches `expected` at write time.
    ///
    /// Returns the number of rows affected: 1 on success, 0 when the
    /// precondition no longer holds (a lost race — the caller must refetch
    /// before retrying, never retry with the same stale expectation).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no row with this id exists at all.
    async fn conditional_update_visit(
        &self,
        id: VisitId,
        expected: VisitExpect,
        patch: VisitPatch,
    ) -> Result<u64, StorageError>;

    /// Unconditionally patches a visit (used only for fields outside the CAS
    /// chain, e.g. the paper-file status).
    async fn update_visit(&self, id: VisitId, patch: VisitPatch) -> Result<Visit, StorageError>;

    /// All visits for one clinic day.
    async fn list_visits_for_day(&self, day: ClinicDay) -> Result<Vec<Visit>, StorageError>;

    /// All visits within an inclusive day range.
    async fn list_visits_in_range(
        &self,
        from: ClinicDay,
        to: ClinicDay,
    ) -> Result<Vec<Visit>, StorageError>;
}

/// Exam-assignment-table operations.
#[async_trait]
pub trait ExamStore: Send + Sync {
    /// Bulk-inserts pending assignments (visit opening and reactivation).
    async fn insert_exams(
        &self,
        new: Vec<NewExamAssignment>,
    ) -> Result<Vec<ExamAssignment>, StorageError>;

    /// Reads one assignment by id.
    async fn get_exam(&self, id: ExamAssignmentId) -> Result<Option<ExamAssignment>, StorageError>;

    /// All assignments belonging to one visit.
    async fn list_exams_for_visit(
        &self,
        visit_id: VisitId,
    ) -> Result<Vec<ExamAssignment>, StorageError>;

    /// Applies the patch to every row matching the filter; returns the number
    /// of rows affected. Matching and patching happen under one write guard,
    /// so no concurrent mutation interleaves inside the batch.
    async fn batched_update_exams(
        &self,
        filter: ExamFilter,
        patch: ExamPatch,
    ) -> Result<u64, StorageError>;
}

/// The full store contract the scheduler and view layers consume.
#[async_trait]
pub trait ClinicStore: VisitStore + ExamStore {
    /// Subscribes to the change feed. Every committed mutation publishes one
    /// event per affected row, after the write is visible to readers.
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;

    /// One consistent read of both tables scoped to a day partition.
    async fn day_snapshot(&self, day: ClinicDay) -> Result<DaySnapshot, StorageError>;

    /// One consistent read of both tables over an inclusive day range.
    async fn range_snapshot(
        &self,
        from: ClinicDay,
        to: ClinicDay,
    ) -> Result<DaySnapshot, StorageError>;

    /// Name of the backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
