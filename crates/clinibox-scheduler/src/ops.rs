//! The scheduler operations.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use clinibox_catalog::BoxCatalog;
use clinibox_core::{
    BoxId, ClinicDay, DocumentContext, ExamAssignment, ExamAssignmentId, ExamState, ExamTypeId,
    FileStatus, PatientId, Visit, VisitId, VisitState,
};
use clinibox_storage::{
    ClinicStore, ExamFilter, ExamPatch, NewExamAssignment, NewVisit, VisitExpect, VisitPatch,
};

use crate::error::SchedulerError;

/// How a box resolves the exams it covers for a visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolveMode {
    /// Every eligible assignment of this box becomes `Completed`.
    CompleteAll,
    /// The selected assignments become `Completed`; the remaining eligible
    /// ones become `Incomplete`.
    Partial(BTreeSet<ExamAssignmentId>),
}

/// Where `resolve_exams` left the visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolved {
    /// Work remains somewhere on the visit: it went back to the queue.
    Requeued,
    /// Nothing outstanding: the visit is in attention, unassigned, ready for
    /// the front desk to finalize.
    ReadyToFinalize,
}

/// Result of a `resolve_exams` invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveOutcome {
    /// The visit as stored after phase 2.
    pub visit: Visit,
    /// Rows this box transitioned in phase 1.
    pub resolved_count: u64,
    /// Outstanding rows left on the whole visit after phase 1.
    pub remaining: u64,
    pub disposition: Resolved,
}

/// Terminal outcome accepted by `finalize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisitOutcome {
    Completed,
    Incomplete,
}

impl VisitOutcome {
    /// The visit state this outcome maps to.
    pub fn state(&self) -> VisitState {
        match self {
            VisitOutcome::Completed => VisitState::Completed,
            VisitOutcome::Incomplete => VisitState::Incomplete,
        }
    }
}

/// The assignment scheduler. Sole writer of the visit and exam stores;
/// cheap to clone via the shared handles.
#[derive(Debug)]
pub struct Scheduler<S> {
    store: Arc<S>,
    catalog: Arc<BoxCatalog>,
}

impl<S> Clone for Scheduler<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            catalog: Arc::clone(&self.catalog),
        }
    }
}

impl<S: ClinicStore> Scheduler<S> {
    pub fn new(store: Arc<S>, catalog: Arc<BoxCatalog>) -> Self {
        Self { store, catalog }
    }

    /// The store this scheduler writes to.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The capability catalog consulted for claim legality.
    pub fn catalog(&self) -> &Arc<BoxCatalog> {
        &self.catalog
    }

    /// Opens a visit for a patient arriving now: one `Waiting` visit plus a
    /// pending assignment per requested exam type.
    #[instrument(skip(self), fields(patient = %patient_id))]
    pub async fn open_visit(
        &self,
        patient_id: PatientId,
        exam_types: BTreeSet<ExamTypeId>,
    ) -> Result<(Visit, Vec<ExamAssignment>), SchedulerError> {
        if exam_types.is_empty() {
            return Err(SchedulerError::precondition(
                "a visit needs at least one exam type",
            ));
        }

        let visit = self
            .store
            .insert_visit(NewVisit::new(patient_id, ClinicDay::today()))
            .await?;
        let exams = self
            .store
            .insert_exams(
                exam_types
                    .into_iter()
                    .map(|t| NewExamAssignment::new(visit.id, t))
                    .collect(),
            )
            .await?;

        info!(visit = %visit.id, entry_number = visit.entry_number, exams = exams.len(), "visit opened");
        Ok((visit, exams))
    }

    /// A box terminal claims a waiting patient.
    ///
    /// The claim is a compare-and-swap on `(Waiting, no box)`: with many
    /// terminals racing, exactly one wins and the rest get `Conflict` and
    /// must refetch the queue before trying another patient.
    #[instrument(skip(self), fields(visit = %visit_id, box_id = %box_id))]
    pub async fn call_patient(
        &self,
        visit_id: VisitId,
        box_id: BoxId,
    ) -> Result<Visit, SchedulerError> {
        let catalog = self.catalog.load();
        if !catalog.is_active(box_id) {
            return Err(SchedulerError::precondition(format!(
                "box {box_id} is unknown or inactive"
            )));
        }

        let visit = self
            .store
            .get_visit(visit_id)
            .await?
            .ok_or_else(|| SchedulerError::not_found(visit_id))?;
        if !visit.is_claimable() {
            // The queue view was stale; no need to even attempt the CAS.
            return Err(SchedulerError::conflict(visit_id));
        }

        // A box may only call a patient it can still do something for.
        let outstanding = self.outstanding_exam_types(visit_id).await?;
        if catalog.capabilities(box_id).is_disjoint(&outstanding) {
            return Err(SchedulerError::precondition(format!(
                "box {box_id} covers none of the visit's outstanding exams"
            )));
        }

        let affected = self
            .store
            .conditional_update_visit(
                visit_id,
                VisitExpect::waiting_unassigned(),
                VisitPatch::claim(box_id, OffsetDateTime::now_utc()),
            )
            .await?;
        if affected == 0 {
            debug!("claim lost the race");
            return Err(SchedulerError::conflict(visit_id));
        }

        let visit = self.fetch(visit_id).await?;
        info!(entry_number = visit.entry_number, "patient called");
        Ok(visit)
    }

    /// Resolves the exams this box covers for a visit, then recomputes the
    /// visit: requeued while outstanding work remains anywhere, otherwise
    /// released unassigned as ready to finalize.
    ///
    /// Phase 1 (the exam batch) and phase 2 (the visit recompute) are two
    /// writes; a crash between them is repaired by `reconcile_day`.
    #[instrument(skip(self, mode), fields(visit = %visit_id, box_id = %box_id))]
    pub async fn resolve_exams(
        &self,
        visit_id: VisitId,
        box_id: BoxId,
        mode: ResolveMode,
    ) -> Result<ResolveOutcome, SchedulerError> {
        let visit = self
            .store
            .get_visit(visit_id)
            .await?
            .ok_or_else(|| SchedulerError::not_found(visit_id))?;
        if visit.state != VisitState::InAttention || visit.box_id != Some(box_id) {
            return Err(SchedulerError::precondition(format!(
                "visit {visit_id} is not in attention in box {box_id}"
            )));
        }

        let exams = self.store.list_exams_for_visit(visit_id).await?;
        let capabilities = self.catalog.capabilities(box_id);
        let eligible: BTreeSet<ExamAssignmentId> = exams
            .iter()
            .filter(|e| e.is_outstanding() && capabilities.contains(&e.exam_type_id))
            .map(|e| e.id)
            .collect();

        let (to_complete, to_incomplete): (BTreeSet<_>, BTreeSet<_>) = match mode {
            ResolveMode::CompleteAll => (eligible, BTreeSet::new()),
            ResolveMode::Partial(selected) => {
                if !selected.is_subset(&eligible) {
                    return Err(SchedulerError::precondition(
                        "selection includes exams this box cannot resolve for this visit",
                    ));
                }
                let rest = eligible.difference(&selected).copied().collect();
                (selected, rest)
            }
        };

        // Phase 1: batched exam writes. The outstanding-states guard keeps a
        // concurrent resolver from re-transitioning a terminal row.
        let now = OffsetDateTime::now_utc();
        let mut resolved_count = 0;
        if !to_complete.is_empty() {
            resolved_count += self
                .store
                .batched_update_exams(
                    ExamFilter::for_visit(visit_id)
                        .with_ids(to_complete)
                        .with_states([ExamState::Pending, ExamState::Incomplete]),
                    ExamPatch::completed(box_id, now),
                )
                .await?;
        }
        if !to_incomplete.is_empty() {
            resolved_count += self
                .store
                .batched_update_exams(
                    ExamFilter::for_visit(visit_id)
                        .with_ids(to_incomplete)
                        .with_states([ExamState::Pending, ExamState::Incomplete]),
                    ExamPatch::incomplete(),
                )
                .await?;
        }

        // Phase 2: recompute over the whole visit, not just this box.
        let remaining = self
            .store
            .list_exams_for_visit(visit_id)
            .await?
            .iter()
            .filter(|e| e.is_outstanding())
            .count() as u64;

        let patch = if remaining > 0 {
            VisitPatch::requeue()
        } else {
            VisitPatch::release_box()
        };
        let affected = self
            .store
            .conditional_update_visit(visit_id, VisitExpect::in_box(box_id), patch)
            .await?;
        if affected == 0 {
            // Phase 1 landed but the visit moved under us; the sweep will
            // settle it if nobody else already has.
            warn!("visit transitioned between resolve phases");
            return Err(SchedulerError::conflict(visit_id));
        }

        let visit = self.fetch(visit_id).await?;
        let disposition = if remaining > 0 {
            Resolved::Requeued
        } else {
            Resolved::ReadyToFinalize
        };
        info!(resolved = resolved_count, remaining, ?disposition, "exams resolved");
        Ok(ResolveOutcome {
            visit,
            resolved_count,
            remaining,
            disposition,
        })
    }

    /// Front desk closes a resolved, unassigned visit with a terminal
    /// outcome. Nothing moves a visit out of a terminal state afterwards
    /// except `reactivate`, which opens a new visit.
    #[instrument(skip(self), fields(visit = %visit_id))]
    pub async fn finalize(
        &self,
        visit_id: VisitId,
        outcome: VisitOutcome,
    ) -> Result<Visit, SchedulerError> {
        let affected = self
            .store
            .conditional_update_visit(
                visit_id,
                VisitExpect::ready_to_finalize(),
                VisitPatch::finalize(outcome.state(), OffsetDateTime::now_utc()),
            )
            .await
            .map_err(|err| {
                if err.is_not_found() {
                    SchedulerError::not_found(visit_id)
                } else {
                    err.into()
                }
            })?;
        if affected == 0 {
            return Err(SchedulerError::conflict(visit_id));
        }

        let visit = self.fetch(visit_id).await?;
        info!(outcome = %visit.state, "visit finalized");
        Ok(visit)
    }

    /// Reopens the incomplete work of a source visit as a brand new visit:
    /// fresh entry number, pending assignments for exactly the exam types
    /// left `Incomplete`. The source rows are never mutated.
    ///
    /// The source visit's own state does not matter: a visit can be
    /// `Completed` overall while an exam resolved by another box was flagged
    /// incomplete.
    #[instrument(skip(self), fields(source = %original_visit_id))]
    pub async fn reactivate(
        &self,
        original_visit_id: VisitId,
    ) -> Result<(Visit, Vec<ExamAssignment>), SchedulerError> {
        let original = self
            .store
            .get_visit(original_visit_id)
            .await?
            .ok_or_else(|| SchedulerError::not_found(original_visit_id))?;

        let incomplete_types: BTreeSet<ExamTypeId> = self
            .store
            .list_exams_for_visit(original_visit_id)
            .await?
            .iter()
            .filter(|e| e.state == ExamState::Incomplete)
            .map(|e| e.exam_type_id)
            .collect();
        if incomplete_types.is_empty() {
            return Err(SchedulerError::precondition(
                "source visit has no incomplete exams",
            ));
        }

        let (visit, exams) = self
            .open_visit(original.patient_id, incomplete_types)
            .await?;
        info!(new_visit = %visit.id, carried = exams.len(), "visit reactivated");
        Ok((visit, exams))
    }

    /// Moves the paper file. Independent of the visit lifecycle, so this is
    /// a plain update with no CAS on `(state, box_id)`.
    #[instrument(skip(self), fields(visit = %visit_id))]
    pub async fn set_file_status(
        &self,
        visit_id: VisitId,
        status: FileStatus,
    ) -> Result<Visit, SchedulerError> {
        self.store
            .update_visit(visit_id, VisitPatch::file_status(status))
            .await
            .map_err(|err| {
                if err.is_not_found() {
                    SchedulerError::not_found(visit_id)
                } else {
                    err.into()
                }
            })
    }

    /// The read-only context the document/consent subsystem consumes.
    pub async fn document_context(
        &self,
        visit_id: VisitId,
    ) -> Result<DocumentContext, SchedulerError> {
        let visit = self.fetch(visit_id).await?;
        Ok(DocumentContext::new(visit.id, visit.patient_id))
    }

    /// Distinct exam types still outstanding on a visit.
    pub(crate) async fn outstanding_exam_types(
        &self,
        visit_id: VisitId,
    ) -> Result<BTreeSet<ExamTypeId>, SchedulerError> {
        Ok(self
            .store
            .list_exams_for_visit(visit_id)
            .await?
            .iter()
            .filter(|e| e.is_outstanding())
            .map(|e| e.exam_type_id)
            .collect())
    }

    async fn fetch(&self, visit_id: VisitId) -> Result<Visit, SchedulerError> {
        self.store
            .get_visit(visit_id)
            .await?
            .ok_or_else(|| SchedulerError::not_found(visit_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinibox_core::ExamBox;
    use clinibox_db_memory::MemoryStore;
    use clinibox_storage::ExamStore;

    struct Fixture {
        scheduler: Scheduler<MemoryStore>,
        box1: BoxId,
        box2: BoxId,
        audio: ExamTypeId,
        vision: ExamTypeId,
    }

    /// Box 1 covers audio only; box 2 covers audio and vision.
    fn fixture() -> Fixture {
        let store = MemoryStore::new_shared();
        let catalog = BoxCatalog::new_shared();
        let b1 = ExamBox::new("Box 1");
        let b2 = ExamBox::new("Box 2");
        let (box1, box2) = (b1.id, b2.id);
        let audio = ExamTypeId::new();
        let vision = ExamTypeId::new();
        catalog.upsert_box(b1);
        catalog.upsert_box(b2);
        catalog.set_capabilities(box1, BTreeSet::from([audio]));
        catalog.set_capabilities(box2, BTreeSet::from([audio, vision]));
        Fixture {
            scheduler: Scheduler::new(store, catalog),
            box1,
            box2,
            audio,
            vision,
        }
    }

    impl Fixture {
        async fn arrive(&self, types: impl IntoIterator<Item = ExamTypeId>) -> Visit {
            self.scheduler
                .open_visit(PatientId::new(), types.into_iter().collect())
                .await
                .unwrap()
                .0
        }
    }

    #[tokio::test]
    async fn test_open_visit_creates_pending_rows() {
        let fx = fixture();
        let (visit, exams) = fx
            .scheduler
            .open_visit(PatientId::new(), BTreeSet::from([fx.audio, fx.vision]))
            .await
            .unwrap();
        assert_eq!(visit.state, VisitState::Waiting);
        assert_eq!(visit.box_id, None);
        assert_eq!(exams.len(), 2);
        assert!(exams.iter().all(|e| e.state == ExamState::Pending));
        assert!(exams.iter().all(|e| e.visit_id == visit.id));
    }

    #[tokio::test]
    async fn test_open_visit_rejects_empty_exam_set() {
        let fx = fixture();
        let err = fx
            .scheduler
            .open_visit(PatientId::new(), BTreeSet::new())
            .await
            .unwrap_err();
        assert!(err.is_precondition());
    }

    #[tokio::test]
    async fn test_call_patient_claims_visit() {
        let fx = fixture();
        let visit = fx.arrive([fx.audio]).await;
        let claimed = fx.scheduler.call_patient(visit.id, fx.box1).await.unwrap();
        assert_eq!(claimed.state, VisitState::InAttention);
        assert_eq!(claimed.box_id, Some(fx.box1));
        assert!(claimed.attention_start_time.is_some());
        assert!(claimed.assignment_invariant_holds());
    }

    #[tokio::test]
    async fn test_call_patient_second_claim_conflicts() {
        let fx = fixture();
        let visit = fx.arrive([fx.audio]).await;
        fx.scheduler.call_patient(visit.id, fx.box1).await.unwrap();
        let err = fx
            .scheduler
            .call_patient(visit.id, fx.box2)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_call_patient_rejects_noncovering_box() {
        let fx = fixture();
        let visit = fx.arrive([fx.vision]).await;
        // Box 1 only does audio.
        let err = fx
            .scheduler
            .call_patient(visit.id, fx.box1)
            .await
            .unwrap_err();
        assert!(err.is_precondition());
    }

    #[tokio::test]
    async fn test_call_patient_rejects_inactive_box() {
        let fx = fixture();
        let visit = fx.arrive([fx.audio]).await;
        fx.scheduler.catalog().set_active(fx.box1, false);
        let err = fx
            .scheduler
            .call_patient(visit.id, fx.box1)
            .await
            .unwrap_err();
        assert!(err.is_precondition());
    }

    #[tokio::test]
    async fn test_call_patient_unknown_visit() {
        let fx = fixture();
        let err = fx
            .scheduler
            .call_patient(VisitId::new(), fx.box1)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_concurrent_claims_exactly_one_wins() {
        let fx = fixture();
        let visit = fx.arrive([fx.audio]).await;

        let s1 = fx.scheduler.clone();
        let s2 = fx.scheduler.clone();
        let (b1, b2) = (fx.box1, fx.box2);
        let id = visit.id;
        let (r1, r2) = tokio::join!(
            tokio::spawn(async move { s1.call_patient(id, b1).await }),
            tokio::spawn(async move { s2.call_patient(id, b2).await }),
        );
        let results = [r1.unwrap(), r2.unwrap()];
        let wins = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(e) if e.is_conflict()))
            .count();
        assert_eq!((wins, conflicts), (1, 1));
    }

    #[tokio::test]
    async fn test_resolve_complete_all_releases_visit() {
        let fx = fixture();
        let visit = fx.arrive([fx.audio, fx.vision]).await;
        fx.scheduler.call_patient(visit.id, fx.box2).await.unwrap();

        let outcome = fx
            .scheduler
            .resolve_exams(visit.id, fx.box2, ResolveMode::CompleteAll)
            .await
            .unwrap();
        assert_eq!(outcome.disposition, Resolved::ReadyToFinalize);
        assert_eq!(outcome.resolved_count, 2);
        assert_eq!(outcome.remaining, 0);
        assert_eq!(outcome.visit.state, VisitState::InAttention);
        assert_eq!(outcome.visit.box_id, None);
        assert!(outcome.visit.is_ready_to_finalize());
    }

    #[tokio::test]
    async fn test_resolve_leaves_uncovered_exams_and_requeues() {
        let fx = fixture();
        let visit = fx.arrive([fx.audio, fx.vision]).await;
        // Box 1 can only resolve audio; vision stays pending.
        fx.scheduler.call_patient(visit.id, fx.box1).await.unwrap();

        let outcome = fx
            .scheduler
            .resolve_exams(visit.id, fx.box1, ResolveMode::CompleteAll)
            .await
            .unwrap();
        assert_eq!(outcome.disposition, Resolved::Requeued);
        assert_eq!(outcome.resolved_count, 1);
        assert_eq!(outcome.remaining, 1);
        assert_eq!(outcome.visit.state, VisitState::Waiting);
        assert_eq!(outcome.visit.box_id, None);

        let exams = fx
            .scheduler
            .store()
            .list_exams_for_visit(visit.id)
            .await
            .unwrap();
        let audio_row = exams.iter().find(|e| e.exam_type_id == fx.audio).unwrap();
        let vision_row = exams.iter().find(|e| e.exam_type_id == fx.vision).unwrap();
        assert_eq!(audio_row.state, ExamState::Completed);
        assert_eq!(audio_row.completed_by, Some(fx.box1));
        assert_eq!(vision_row.state, ExamState::Pending);
    }

    #[tokio::test]
    async fn test_resolve_partial_selection() {
        let fx = fixture();
        let (visit, exams) = fx
            .scheduler
            .open_visit(PatientId::new(), BTreeSet::from([fx.audio, fx.vision]))
            .await
            .unwrap();
        fx.scheduler.call_patient(visit.id, fx.box2).await.unwrap();

        let audio_row = exams.iter().find(|e| e.exam_type_id == fx.audio).unwrap();
        let outcome = fx
            .scheduler
            .resolve_exams(
                visit.id,
                fx.box2,
                ResolveMode::Partial(BTreeSet::from([audio_row.id])),
            )
            .await
            .unwrap();

        // Vision was eligible but unselected, so it is now Incomplete; the
        // visit still has outstanding work and goes back to the queue.
        assert_eq!(outcome.disposition, Resolved::Requeued);
        assert_eq!(outcome.visit.state, VisitState::Waiting);
        assert_eq!(outcome.visit.box_id, None);

        let exams = fx
            .scheduler
            .store()
            .list_exams_for_visit(visit.id)
            .await
            .unwrap();
        let audio_row = exams.iter().find(|e| e.exam_type_id == fx.audio).unwrap();
        let vision_row = exams.iter().find(|e| e.exam_type_id == fx.vision).unwrap();
        assert_eq!(audio_row.state, ExamState::Completed);
        assert!(audio_row.completed_at.is_some());
        assert_eq!(vision_row.state, ExamState::Incomplete);
        assert_eq!(vision_row.completed_by, None);
    }

    #[tokio::test]
    async fn test_resolve_rejects_wrong_box() {
        let fx = fixture();
        let visit = fx.arrive([fx.audio]).await;
        fx.scheduler.call_patient(visit.id, fx.box1).await.unwrap();

        let err = fx
            .scheduler
            .resolve_exams(visit.id, fx.box2, ResolveMode::CompleteAll)
            .await
            .unwrap_err();
        assert!(err.is_precondition());

        // Zero effect: the exam is still pending.
        let exams = fx
            .scheduler
            .store()
            .list_exams_for_visit(visit.id)
            .await
            .unwrap();
        assert!(exams.iter().all(|e| e.state == ExamState::Pending));
    }

    #[tokio::test]
    async fn test_resolve_rejects_foreign_selection() {
        let fx = fixture();
        let visit = fx.arrive([fx.audio]).await;
        fx.scheduler.call_patient(visit.id, fx.box1).await.unwrap();

        let err = fx
            .scheduler
            .resolve_exams(
                visit.id,
                fx.box1,
                ResolveMode::Partial(BTreeSet::from([ExamAssignmentId::new()])),
            )
            .await
            .unwrap_err();
        assert!(err.is_precondition());
    }

    #[tokio::test]
    async fn test_finalize_completed() {
        let fx = fixture();
        let visit = fx.arrive([fx.audio]).await;
        fx.scheduler.call_patient(visit.id, fx.box1).await.unwrap();
        fx.scheduler
            .resolve_exams(visit.id, fx.box1, ResolveMode::CompleteAll)
            .await
            .unwrap();

        let done = fx
            .scheduler
            .finalize(visit.id, VisitOutcome::Completed)
            .await
            .unwrap();
        assert_eq!(done.state, VisitState::Completed);
        assert!(done.attention_end_time.is_some());
    }

    #[tokio::test]
    async fn test_finalize_rejects_unresolved_visit() {
        let fx = fixture();
        let visit = fx.arrive([fx.audio]).await;
        // Still waiting: not ready to finalize.
        let err = fx
            .scheduler
            .finalize(visit.id, VisitOutcome::Completed)
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        // In a box: still not ready.
        fx.scheduler.call_patient(visit.id, fx.box1).await.unwrap();
        let err = fx
            .scheduler
            .finalize(visit.id, VisitOutcome::Incomplete)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_finalize_is_terminal() {
        let fx = fixture();
        let visit = fx.arrive([fx.audio]).await;
        fx.scheduler.call_patient(visit.id, fx.box1).await.unwrap();
        fx.scheduler
            .resolve_exams(visit.id, fx.box1, ResolveMode::CompleteAll)
            .await
            .unwrap();
        fx.scheduler
            .finalize(visit.id, VisitOutcome::Completed)
            .await
            .unwrap();

        let err = fx
            .scheduler
            .finalize(visit.id, VisitOutcome::Incomplete)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_reactivate_carries_only_incomplete_types() {
        let fx = fixture();
        let (visit, exams) = fx
            .scheduler
            .open_visit(PatientId::new(), BTreeSet::from([fx.audio, fx.vision]))
            .await
            .unwrap();
        fx.scheduler.call_patient(visit.id, fx.box2).await.unwrap();
        let audio_row = exams.iter().find(|e| e.exam_type_id == fx.audio).unwrap();
        fx.scheduler
            .resolve_exams(
                visit.id,
                fx.box2,
                ResolveMode::Partial(BTreeSet::from([audio_row.id])),
            )
            .await
            .unwrap();

        let before: Vec<_> = fx
            .scheduler
            .store()
            .list_exams_for_visit(visit.id)
            .await
            .unwrap();

        let (new_visit, new_exams) = fx.scheduler.reactivate(visit.id).await.unwrap();
        assert_ne!(new_visit.id, visit.id);
        assert_eq!(new_visit.patient_id, visit.patient_id);
        assert_eq!(new_visit.state, VisitState::Waiting);
        assert_eq!(new_exams.len(), 1);
        assert_eq!(new_exams[0].exam_type_id, fx.vision);
        assert_eq!(new_exams[0].state, ExamState::Pending);

        // Source rows are untouched.
        let after: Vec<_> = fx
            .scheduler
            .store()
            .list_exams_for_visit(visit.id)
            .await
            .unwrap();
        let sort = |mut v: Vec<ExamAssignment>| {
            v.sort_by_key(|e| e.id);
            v
        };
        assert_eq!(sort(before), sort(after));
    }

    #[tokio::test]
    async fn test_reactivate_requires_incomplete_exam() {
        let fx = fixture();
        let visit = fx.arrive([fx.audio]).await;
        fx.scheduler.call_patient(visit.id, fx.box1).await.unwrap();
        fx.scheduler
            .resolve_exams(visit.id, fx.box1, ResolveMode::CompleteAll)
            .await
            .unwrap();

        let err = fx.scheduler.reactivate(visit.id).await.unwrap_err();
        assert!(err.is_precondition());
    }

    #[tokio::test]
    async fn test_set_file_status_ignores_lifecycle() {
        let fx = fixture();
        let visit = fx.arrive([fx.audio]).await;
        let updated = fx
            .scheduler
            .set_file_status(visit.id, FileStatus::WithPatient)
            .await
            .unwrap();
        assert_eq!(updated.file_status, FileStatus::WithPatient);
        assert_eq!(updated.state, VisitState::Waiting);
    }

    #[tokio::test]
    async fn test_document_context() {
        let fx = fixture();
        let visit = fx.arrive([fx.audio]).await;
        let ctx = fx.scheduler.document_context(visit.id).await.unwrap();
        assert_eq!(ctx.visit_id, visit.id);
        assert_eq!(ctx.patient_id, visit.patient_id);
    }
}
