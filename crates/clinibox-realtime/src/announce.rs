//! "Your turn" announcement dedup.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use clinibox_core::{BoxId, PatientId, Visit, VisitId, VisitState};
use clinibox_storage::DaySnapshot;

/// One announcement to surface to a patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub visit_id: VisitId,
    pub patient_id: PatientId,
    pub box_id: BoxId,
    pub entry_number: u32,
}

impl Announcement {
    fn for_visit(visit: &Visit, box_id: BoxId) -> Self {
        Self {
            visit_id: visit.id,
            patient_id: visit.patient_id,
            box_id,
            entry_number: visit.entry_number,
        }
    }
}

/// Deduplicates turn announcements on `(visit, box)`.
///
/// One announcer lives per subscriber connection; its state is bounded by
/// the visits currently in attention and evicted as soon as a visit leaves
/// that state, so reconnect storms and duplicate change deliveries never
/// re-announce. A visit requeued and later claimed again (same or another
/// box) is a new transition and announces again.
#[derive(Debug, Default)]
pub struct TurnAnnouncer {
    announced: DashMap<VisitId, BoxId>,
}

impl TurnAnnouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one snapshot through the dedup and returns the announcements
    /// that are new since the last observation.
    pub fn observe(&self, snapshot: &DaySnapshot) -> Vec<Announcement> {
        let mut fresh = Vec::new();
        for visit in &snapshot.visits {
            match (visit.state, visit.box_id) {
                (VisitState::InAttention, Some(box_id)) => {
                    let first_time = self
                        .announced
                        .insert(visit.id, box_id)
                        .is_none_or(|prev| prev != box_id);
                    if first_time {
                        fresh.push(Announcement::for_visit(visit, box_id));
                    }
                }
                // Left attention (requeued, resolved or finalized): evict so
                // a later claim announces again.
                _ => {
                    self.announced.remove(&visit.id);
                }
            }
        }
        fresh
    }

    /// Number of `(visit, box)` keys currently remembered.
    pub fn len(&self) -> usize {
        self.announced.len()
    }

    pub fn is_empty(&self) -> bool {
        self.announced.is_empty()
    }
}
