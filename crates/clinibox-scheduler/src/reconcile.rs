//! Reconciliation sweep.
//!
//! `resolve_exams` writes the exam batch and the visit recompute as two
//! separate store round trips. A crash between them leaves the exams
//! resolved while the visit still shows in-attention with a stale box. The
//! sweep detects exactly that shape and re-applies the missing phase-2
//! recompute. It is idempotent and safe to run on a timer; the realtime
//! layer runs it on the poll-backstop cadence.

use tracing::{info, instrument, warn};

use clinibox_core::{ClinicDay, VisitState};
use clinibox_storage::{ClinicStore, VisitExpect, VisitPatch};

use crate::error::SchedulerError;
use crate::ops::Scheduler;

impl<S: ClinicStore> Scheduler<S> {
    /// Repairs visits stranded between the two `resolve_exams` phases on the
    /// given day. Returns how many visits were recomputed.
    ///
    /// A visit is stranded when it is `InAttention` with a box assigned but
    /// none of the exams that box covers is still outstanding: the box has
    /// nothing left to do, so the visit-level recompute must have been lost.
    #[instrument(skip(self), fields(day = %day))]
    pub async fn reconcile_day(&self, day: ClinicDay) -> Result<u64, SchedulerError> {
        let snapshot = self.store().day_snapshot(day).await?;
        let catalog = self.catalog().load();

        let mut repaired = 0;
        for visit in &snapshot.visits {
            let (VisitState::InAttention, Some(box_id)) = (visit.state, visit.box_id) else {
                continue;
            };

            let capabilities = catalog.capabilities(box_id);
            let exams = snapshot.exams_for(visit.id);
            let box_has_work = exams
                .iter()
                .any(|e| e.is_outstanding() && capabilities.contains(&e.exam_type_id));
            if box_has_work {
                continue;
            }

            let remaining = exams.iter().filter(|e| e.is_outstanding()).count();
            let patch = if remaining > 0 {
                VisitPatch::requeue()
            } else {
                VisitPatch::release_box()
            };

            // CAS on the stale assignment: if the visit moved since the
            // snapshot, someone else settled it and zero rows match.
            let affected = self
                .store()
                .conditional_update_visit(visit.id, VisitExpect::in_box(box_id), patch)
                .await?;
            if affected > 0 {
                warn!(visit = %visit.id, %box_id, remaining, "repaired stranded visit");
                repaired += 1;
            }
        }

        if repaired > 0 {
            info!(repaired, "reconcile sweep finished");
        }
        Ok(repaired)
    }
}
