//! The `Visit` row: one clinic episode and its lifecycle state.
//!
//! A visit is created when the patient arrives, claimed into a box, sent back
//! to the queue while work remains, and finally moved to a terminal state.
//! Rows are append-only: reactivation opens a new visit instead of mutating a
//! finished one, so the full history of a patient's day stays auditable.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::day::ClinicDay;
use crate::ids::{BoxId, PatientId, VisitId};

/// Lifecycle state of a visit.
///
/// Legal transitions, always driven through the scheduler's CAS chain:
/// `Waiting → InAttention → (Waiting | InAttention-unassigned) →
/// (Completed | Incomplete)`. The terminal states never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitState {
    /// In the queue, claimable by a box.
    Waiting,
    /// Being attended. With a box assigned this means "in a box"; with no box
    /// assigned it means "resolved, awaiting finalize".
    InAttention,
    /// Terminal: episode finished with all work done.
    Completed,
    /// Terminal: episode closed with work outstanding.
    Incomplete,
}

impl VisitState {
    /// Whether the state is terminal (`Completed` or `Incomplete`).
    pub fn is_terminal(&self) -> bool {
        matches!(self, VisitState::Completed | VisitState::Incomplete)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VisitState::Waiting => "waiting",
            VisitState::InAttention => "in_attention",
            VisitState::Completed => "completed",
            VisitState::Incomplete => "incomplete",
        }
    }
}

impl std::fmt::Display for VisitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where the patient's paper file currently is. Tracked independently of the
/// visit/exam lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Not yet handed out.
    Pending,
    /// Travelling with the patient between boxes.
    WithPatient,
    /// Back at the front desk.
    Returned,
}

/// One clinic episode for a patient on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub id: VisitId,
    pub patient_id: PatientId,
    pub state: VisitState,
    /// The box currently attending this visit. `Some` implies
    /// `state == InAttention`; an unassigned in-attention visit is ready to
    /// finalize.
    pub box_id: Option<BoxId>,
    /// FIFO ordering key, unique and monotone within `day`.
    pub entry_number: u32,
    pub day: ClinicDay,
    #[serde(with = "time::serde::rfc3339")]
    pub entry_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub attention_start_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub attention_end_time: Option<OffsetDateTime>,
    pub file_status: FileStatus,
}

impl Visit {
    /// Whether the visit is in the queue and claimable by a box.
    pub fn is_claimable(&self) -> bool {
        self.state == VisitState::Waiting && self.box_id.is_none()
    }

    /// Whether the visit is resolved and awaiting finalize.
    pub fn is_ready_to_finalize(&self) -> bool {
        self.state == VisitState::InAttention && self.box_id.is_none()
    }

    /// Checks the core assignment invariant: a box is only ever assigned
    /// while the visit is in attention.
    pub fn assignment_invariant_holds(&self) -> bool {
        self.box_id.is_none() || self.state == VisitState::InAttention
    }
}
