//! Storage abstraction for the Clinibox scheduler.
//!
//! The scheduler consumes the stores only through the narrow primitives
//! defined here: `get`, `insert`, `conditional_update` (the CAS), a filtered
//! `batched_update`, consistent day snapshots, and a change subscription.
//! Any backend that honors these contracts can sit underneath; the workspace
//! ships an in-memory one in `clinibox-db-memory`.

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::{ClinicStore, ExamStore, VisitStore};
pub use types::{
    DaySnapshot, ExamFilter, ExamPatch, NewExamAssignment, NewVisit, VisitExpect, VisitPatch,
};
