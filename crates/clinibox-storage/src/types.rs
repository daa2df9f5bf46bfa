//! Row templates, patch and filter types for the store primitives.
//!
//! Updates are expressed as explicit patches: only the fields named in the
//! patch change, everything else is left untouched by the backend. The visit
//! CAS precondition is its own type so it cannot be confused with a patch.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use clinibox_core::{
    BoxId, ClinicDay, ExamAssignment, ExamAssignmentId, ExamState, ExamTypeId, FileStatus,
    PatientId, Visit, VisitId, VisitState,
};

/// Template for inserting a visit. The backend stamps id, entry time and the
/// per-day entry number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVisit {
    pub patient_id: PatientId,
    pub day: ClinicDay,
}

impl NewVisit {
    pub fn new(patient_id: PatientId, day: ClinicDay) -> Self {
        Self { patient_id, day }
    }
}

/// Template for inserting an exam assignment. The backend stamps the id; the
/// row starts `Pending` with no completion stamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExamAssignment {
    pub visit_id: VisitId,
    pub exam_type_id: ExamTypeId,
}

impl NewExamAssignment {
    pub fn new(visit_id: VisitId, exam_type_id: ExamTypeId) -> Self {
        Self {
            visit_id,
            exam_type_id,
        }
    }
}

/// The compare-and-swap precondition on a visit: the update applies only if
/// the stored row still carries exactly this `(state, box_id)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitExpect {
    pub state: VisitState,
    pub box_id: Option<BoxId>,
}

impl VisitExpect {
    pub fn new(state: VisitState, box_id: Option<BoxId>) -> Self {
        Self { state, box_id }
    }

    /// The claimable queue state: `Waiting` with no box.
    pub fn waiting_unassigned() -> Self {
        Self::new(VisitState::Waiting, None)
    }

    /// In attention inside a specific box.
    pub fn in_box(box_id: BoxId) -> Self {
        Self::new(VisitState::InAttention, Some(box_id))
    }

    /// Resolved and awaiting finalize: `InAttention` with no box.
    pub fn ready_to_finalize() -> Self {
        Self::new(VisitState::InAttention, None)
    }

    /// Whether a stored visit satisfies this precondition.
    pub fn matches(&self, visit: &Visit) -> bool {
        visit.state == self.state && visit.box_id == self.box_id
    }
}

/// Field-level patch for a visit. `None` leaves the field untouched; the
/// nested option on `box_id` distinguishes "assign box b" from "clear box".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisitPatch {
    pub state: Option<VisitState>,
    pub box_id: Option<Option<BoxId>>,
    pub attention_start_time: Option<OffsetDateTime>,
    pub attention_end_time: Option<OffsetDateTime>,
    pub file_status: Option<FileStatus>,
}

impl VisitPatch {
    /// Patch for claiming the visit into a box.
    pub fn claim(box_id: BoxId, now: OffsetDateTime) -> Self {
        Self {
            state: Some(VisitState::InAttention),
            box_id: Some(Some(box_id)),
            attention_start_time: Some(now),
            ..Self::default()
        }
    }

    /// Patch sending the visit back to the queue for another box.
    pub fn requeue() -> Self {
        Self {
            state: Some(VisitState::Waiting),
            box_id: Some(None),
            ..Self::default()
        }
    }

    /// Patch releasing the box while keeping the visit in attention
    /// (resolved, awaiting finalize).
    pub fn release_box() -> Self {
        Self {
            box_id: Some(None),
            ..Self::default()
        }
    }

    /// Patch moving the visit to a terminal outcome.
    pub fn finalize(outcome: VisitState, now: OffsetDateTime) -> Self {
        Self {
            state: Some(outcome),
            attention_end_time: Some(now),
            ..Self::default()
        }
    }

    /// Patch for the independent paper-file axis.
    pub fn file_status(status: FileStatus) -> Self {
        Self {
            file_status: Some(status),
            ..Self::default()
        }
    }

    /// Applies this patch to a visit row in place.
    pub fn apply(&self, visit: &mut Visit) {
        if let Some(state) = self.state {
            visit.state = state;
        }
        if let Some(box_id) = self.box_id {
            visit.box_id = box_id;
        }
        if let Some(t) = self.attention_start_time {
            visit.attention_start_time = Some(t);
        }
        if let Some(t) = self.attention_end_time {
            visit.attention_end_time = Some(t);
        }
        if let Some(fs) = self.file_status {
            visit.file_status = fs;
        }
    }
}

/// Field-level patch for exam assignments, applied through `batched_update`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExamPatch {
    pub state: Option<ExamState>,
    pub completed_at: Option<OffsetDateTime>,
    pub completed_by: Option<BoxId>,
}

impl ExamPatch {
    /// Patch marking rows `Completed`, stamped with the resolving box.
    pub fn completed(by: BoxId, now: OffsetDateTime) -> Self {
        Self {
            state: Some(ExamState::Completed),
            completed_at: Some(now),
            completed_by: Some(by),
        }
    }

    /// Patch marking rows `Incomplete`. No completion stamps.
    pub fn incomplete() -> Self {
        Self {
            state: Some(ExamState::Incomplete),
            ..Self::default()
        }
    }

    /// Applies this patch to an assignment row in place.
    pub fn apply(&self, exam: &mut ExamAssignment) {
        if let Some(state) = self.state {
            exam.state = state;
        }
        if let Some(t) = self.completed_at {
            exam.completed_at = Some(t);
        }
        if let Some(b) = self.completed_by {
            exam.completed_by = Some(b);
        }
    }
}

/// Row filter for `batched_update` over exam assignments. All present
/// criteria must match; absent criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExamFilter {
    pub visit_id: Option<VisitId>,
    pub ids: Option<BTreeSet<ExamAssignmentId>>,
    pub states: Option<BTreeSet<ExamState>>,
    pub exam_types: Option<BTreeSet<ExamTypeId>>,
}

impl ExamFilter {
    /// Filter scoped to one visit.
    pub fn for_visit(visit_id: VisitId) -> Self {
        Self {
            visit_id: Some(visit_id),
            ..Self::default()
        }
    }

    /// Restrict to an explicit id set.
    #[must_use]
    pub fn with_ids(mut self, ids: BTreeSet<ExamAssignmentId>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Restrict to rows in any of the given states.
    #[must_use]
    pub fn with_states(mut self, states: impl IntoIterator<Item = ExamState>) -> Self {
        self.states = Some(states.into_iter().collect());
        self
    }

    /// Restrict to rows whose exam type is in the given set.
    #[must_use]
    pub fn with_exam_types(mut self, types: BTreeSet<ExamTypeId>) -> Self {
        self.exam_types = Some(types);
        self
    }

    /// Whether an assignment row matches every present criterion.
    pub fn matches(&self, exam: &ExamAssignment) -> bool {
        if let Some(visit_id) = self.visit_id
            && exam.visit_id != visit_id
        {
            return false;
        }
        if let Some(ids) = &self.ids
            && !ids.contains(&exam.id)
        {
            return false;
        }
        if let Some(states) = &self.states
            && !states.contains(&exam.state)
        {
            return false;
        }
        if let Some(types) = &self.exam_types
            && !types.contains(&exam.exam_type_id)
        {
            return false;
        }
        true
    }
}

/// One consistent read of both tables for a day (or day range).
///
/// All derived views are computed from a single snapshot so a visit can never
/// appear in two mutually-exclusive lists because of an interleaved write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DaySnapshot {
    pub visits: Vec<Visit>,
    pub exams: Vec<ExamAssignment>,
}

impl DaySnapshot {
    /// The exam assignments belonging to one visit.
    pub fn exams_for(&self, visit_id: VisitId) -> Vec<&ExamAssignment> {
        self.exams
            .iter()
            .filter(|e| e.visit_id == visit_id)
            .collect()
    }

    /// Looks up a visit by id.
    pub fn visit(&self, visit_id: VisitId) -> Option<&Visit> {
        self.visits.iter().find(|v| v.id == visit_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visit_patch_apply() {
        let mut visit = Visit {
            id: VisitId::new(),
            patient_id: PatientId::new(),
            state: VisitState::Waiting,
            box_id: None,
            entry_number: 3,
            day: ClinicDay::today(),
            entry_time: OffsetDateTime::now_utc(),
            attention_start_time: None,
            attention_end_time: None,
            file_status: FileStatus::Pending,
        };

        let box_id = BoxId::new();
        let now = OffsetDateTime::now_utc();
        VisitPatch::claim(box_id, now).apply(&mut visit);
        assert_eq!(visit.state, VisitState::InAttention);
        assert_eq!(visit.box_id, Some(box_id));
        assert_eq!(visit.attention_start_time, Some(now));

        VisitPatch::requeue().apply(&mut visit);
        assert_eq!(visit.state, VisitState::Waiting);
        assert_eq!(visit.box_id, None);
        // Earlier stamps survive a requeue.
        assert_eq!(visit.attention_start_time, Some(now));
    }

    #[test]
    fn test_visit_expect_matches() {
        let box_id = BoxId::new();
        let visit = Visit {
            id: VisitId::new(),
            patient_id: PatientId::new(),
            state: VisitState::InAttention,
            box_id: Some(box_id),
            entry_number: 1,
            day: ClinicDay::today(),
            entry_time: OffsetDateTime::now_utc(),
            attention_start_time: None,
            attention_end_time: None,
            file_status: FileStatus::WithPatient,
        };
        assert!(VisitExpect::in_box(box_id).matches(&visit));
        assert!(!VisitExpect::waiting_unassigned().matches(&visit));
        assert!(!VisitExpect::in_box(BoxId::new()).matches(&visit));
    }

    #[test]
    fn test_exam_filter_matches() {
        let visit_id = VisitId::new();
        let exam = ExamAssignment {
            id: ExamAssignmentId::new(),
            visit_id,
            exam_type_id: ExamTypeId::new(),
            state: ExamState::Pending,
            completed_at: None,
            completed_by: None,
        };

        assert!(ExamFilter::for_visit(visit_id).matches(&exam));
        assert!(!ExamFilter::for_visit(VisitId::new()).matches(&exam));
        assert!(
            ExamFilter::for_visit(visit_id)
                .with_states([ExamState::Pending, ExamState::Incomplete])
                .matches(&exam)
        );
        assert!(
            !ExamFilter::for_visit(visit_id)
                .with_states([ExamState::Completed])
                .matches(&exam)
        );
        assert!(
            !ExamFilter::for_visit(visit_id)
                .with_ids(BTreeSet::from([ExamAssignmentId::new()]))
                .matches(&exam)
        );
    }
}
