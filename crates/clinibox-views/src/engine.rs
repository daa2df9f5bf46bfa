//! The read-model derivations.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use clinibox_catalog::CatalogSnapshot;
use clinibox_core::{BoxId, ExamAssignment, ExamState, ExamTypeId, Visit, VisitState};
use clinibox_storage::DaySnapshot;

/// One row of the waiting list, with the boxes that can still serve it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitingEntry {
    pub visit: Visit,
    /// Exam types still outstanding on the visit.
    pub outstanding_exams: BTreeSet<ExamTypeId>,
    /// Active boxes whose capabilities intersect the outstanding exams; only
    /// these may legally call the patient.
    pub pending_boxes: BTreeSet<BoxId>,
}

/// One row of the incomplete report.
///
/// The two incompleteness signals are deliberately separate: a visit can be
/// terminal-`Incomplete` as a whole, have individual exams flagged
/// incomplete, or both. Consumers decide how to present them; the engine
/// never collapses them into one flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncompleteEntry {
    pub visit: Visit,
    /// The visit itself was closed as `Incomplete`.
    pub visit_incomplete: bool,
    /// Exam types whose assignment ended `Incomplete`.
    pub incomplete_exams: BTreeSet<ExamTypeId>,
}

/// All mutually-exclusive queue lists, derived in one pass from one
/// snapshot, so a visit can never show up in two of them at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueBoard {
    pub waiting: Vec<WaitingEntry>,
    pub in_attention: BTreeMap<BoxId, Vec<Visit>>,
    pub ready_to_finalize: Vec<Visit>,
}

impl QueueBoard {
    /// Derives the full board from a snapshot.
    pub fn derive(snapshot: &DaySnapshot, catalog: &CatalogSnapshot) -> Self {
        let mut board = QueueBoard::default();
        for visit in &snapshot.visits {
            match (visit.state, visit.box_id) {
                (VisitState::Waiting, None) => {
                    board
                        .waiting
                        .push(waiting_entry(visit, snapshot, catalog));
                }
                (VisitState::InAttention, Some(box_id)) => {
                    board.in_attention.entry(box_id).or_default().push(visit.clone());
                }
                (VisitState::InAttention, None) => {
                    board.ready_to_finalize.push(visit.clone());
                }
                _ => {}
            }
        }
        board.waiting.sort_by_key(|e| e.visit.entry_number);
        for visits in board.in_attention.values_mut() {
            visits.sort_by_key(|v| v.entry_number);
        }
        board.ready_to_finalize.sort_by_key(|v| v.entry_number);
        board
    }
}

/// Visits waiting in the queue, FIFO by entry number.
pub fn waiting_list(snapshot: &DaySnapshot, catalog: &CatalogSnapshot) -> Vec<WaitingEntry> {
    let mut list: Vec<WaitingEntry> = snapshot
        .visits
        .iter()
        .filter(|v| v.is_claimable())
        .map(|v| waiting_entry(v, snapshot, catalog))
        .collect();
    list.sort_by_key(|e| e.visit.entry_number);
    list
}

/// Visits currently inside the given box.
pub fn in_attention_list(snapshot: &DaySnapshot, box_id: BoxId) -> Vec<Visit> {
    let mut list: Vec<Visit> = snapshot
        .visits
        .iter()
        .filter(|v| v.state == VisitState::InAttention && v.box_id == Some(box_id))
        .cloned()
        .collect();
    list.sort_by_key(|v| v.entry_number);
    list
}

/// Resolved, unassigned visits awaiting the front desk.
pub fn ready_to_finalize(snapshot: &DaySnapshot) -> Vec<Visit> {
    let mut list: Vec<Visit> = snapshot
        .visits
        .iter()
        .filter(|v| v.is_ready_to_finalize())
        .cloned()
        .collect();
    list.sort_by_key(|v| v.entry_number);
    list
}

/// The boxes that can still do something for a visit: active boxes whose
/// capability set intersects the outstanding exam types of the visit's
/// assignment rows.
pub fn pending_boxes_for(
    exams: &[&ExamAssignment],
    catalog: &CatalogSnapshot,
) -> BTreeSet<BoxId> {
    let outstanding = outstanding_types(exams);
    catalog.boxes_covering(&outstanding)
}

/// Visits that were closed incomplete or carry incomplete exam rows.
pub fn incomplete_report(snapshot: &DaySnapshot) -> Vec<IncompleteEntry> {
    let mut report = Vec::new();
    for visit in &snapshot.visits {
        let incomplete_exams: BTreeSet<ExamTypeId> = snapshot
            .exams_for(visit.id)
            .iter()
            .filter(|e| e.state == ExamState::Incomplete)
            .map(|e| e.exam_type_id)
            .collect();
        let visit_incomplete = visit.state == VisitState::Incomplete;
        if visit_incomplete || !incomplete_exams.is_empty() {
            report.push(IncompleteEntry {
                visit: visit.clone(),
                visit_incomplete,
                incomplete_exams,
            });
        }
    }
    report.sort_by_key(|e| (e.visit.day, e.visit.entry_number));
    report
}

fn waiting_entry(
    visit: &Visit,
    snapshot: &DaySnapshot,
    catalog: &CatalogSnapshot,
) -> WaitingEntry {
    let exams = snapshot.exams_for(visit.id);
    let outstanding_exams = outstanding_types(&exams);
    let pending_boxes = catalog.boxes_covering(&outstanding_exams);
    WaitingEntry {
        visit: visit.clone(),
        outstanding_exams,
        pending_boxes,
    }
}

fn outstanding_types(exams: &[&ExamAssignment]) -> BTreeSet<ExamTypeId> {
    exams
        .iter()
        .filter(|e| e.is_outstanding())
        .map(|e| e.exam_type_id)
        .collect()
}
