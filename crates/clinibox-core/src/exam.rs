//! The `ExamAssignment` row: the per-exam-type unit of work within a visit.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::ids::{BoxId, ExamAssignmentId, ExamTypeId, VisitId};

/// Resolution state of a single exam assignment.
///
/// `Completed` and `Incomplete` are terminal for the row: reopening work goes
/// through visit reactivation, which creates fresh `Pending` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamState {
    Pending,
    Completed,
    Incomplete,
}

impl ExamState {
    /// Whether a box may still act on this row.
    pub fn is_outstanding(&self) -> bool {
        matches!(self, ExamState::Pending | ExamState::Incomplete)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExamState::Pending => "pending",
            ExamState::Completed => "completed",
            ExamState::Incomplete => "incomplete",
        }
    }
}

impl std::fmt::Display for ExamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One exam work item belonging to a visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamAssignment {
    pub id: ExamAssignmentId,
    pub visit_id: VisitId,
    pub exam_type_id: ExamTypeId,
    pub state: ExamState,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    /// The box that resolved the row, stamped on the transition to
    /// `Completed`.
    pub completed_by: Option<BoxId>,
}

impl ExamAssignment {
    /// Whether this row still needs a box (`Pending` or `Incomplete`).
    pub fn is_outstanding(&self) -> bool {
        self.state.is_outstanding()
    }
}
