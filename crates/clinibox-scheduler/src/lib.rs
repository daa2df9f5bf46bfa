//! Assignment Scheduler.
//!
//! The only writer of the visit and exam stores. Each operation is a single
//! logical round trip with an explicit precondition:
//!
//! - `open_visit` — patient arrival: a `Waiting` visit plus its pending exams.
//! - `call_patient` — a box terminal claims a waiting patient (CAS; losing a
//!   race is the expected, non-fatal `Conflict`).
//! - `resolve_exams` — a box resolves the exams it covers, then the visit is
//!   recomputed: back to the queue if work remains anywhere, otherwise
//!   released as ready to finalize.
//! - `finalize` — front desk closes a resolved visit with a terminal outcome.
//! - `reactivate` — reopens incomplete work as a fresh visit, never touching
//!   the original rows.
//!
//! `reconcile_day` is the repair sweep for the non-atomic two-phase window
//! inside `resolve_exams`.

mod error;
mod ops;
mod reconcile;

pub use error::SchedulerError;
pub use ops::{ResolveMode, ResolveOutcome, Resolved, Scheduler, VisitOutcome};
