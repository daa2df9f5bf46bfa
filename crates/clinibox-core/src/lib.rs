//! Core domain types for the Clinibox walk-in clinic scheduler.
//!
//! This crate defines the shared vocabulary of the system: typed ids, the
//! `Visit` and `ExamAssignment` rows with their lifecycle enums, the clinic
//! day partition key, the change-event types and the broadcast bus that
//! carries them between the stores and the realtime subscribers.

pub mod boxes;
pub mod day;
pub mod document;
pub mod events;
pub mod exam;
pub mod ids;
pub mod visit;

pub use boxes::ExamBox;
pub use day::ClinicDay;
pub use document::DocumentContext;
pub use events::{ChangeBroadcaster, ChangeEvent, ChangeOp, StoreTable};
pub use exam::{ExamAssignment, ExamState};
pub use ids::{BoxId, ExamAssignmentId, ExamTypeId, PatientId, VisitId};
pub use visit::{FileStatus, Visit, VisitState};
