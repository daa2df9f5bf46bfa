//! The `MemoryStore` implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

use clinibox_config::CliniboxConfig;
use clinibox_core::{
    ChangeBroadcaster, ChangeEvent, ClinicDay, ExamAssignment, ExamAssignmentId, ExamState,
    FileStatus, StoreTable, Visit, VisitId, VisitState,
};
use clinibox_storage::{
    ClinicStore, DaySnapshot, ExamFilter, ExamPatch, ExamStore, NewExamAssignment, NewVisit,
    StorageError, VisitExpect, VisitPatch, VisitStore,
};

/// Visit table plus the per-day entry-number counters. Counters live behind
/// the same lock as the rows so an insert and its number assignment commit
/// together; numbers stay unique and monotone under concurrent inserts.
#[derive(Debug, Default)]
struct VisitTable {
    rows: HashMap<VisitId, Visit>,
    entry_counters: HashMap<ClinicDay, u32>,
}

/// In-memory clinic store.
///
/// Lock discipline: each mutation takes exactly one table's write guard, and
/// snapshots take the visit guard then the exam guard and hold both while
/// reading. Change events are published after the write guard is dropped, so
/// a subscriber that refreshes on an event always observes the committed row.
#[derive(Debug)]
pub struct MemoryStore {
    visits: RwLock<VisitTable>,
    exams: RwLock<HashMap<ExamAssignmentId, ExamAssignment>>,
    bus: ChangeBroadcaster,
}

impl MemoryStore {
    /// Creates an empty store with a default-capacity change bus.
    pub fn new() -> Self {
        Self::with_bus(ChangeBroadcaster::new())
    }

    /// Creates an empty store publishing on the given bus.
    pub fn with_bus(bus: ChangeBroadcaster) -> Self {
        Self {
            visits: RwLock::new(VisitTable::default()),
            exams: RwLock::new(HashMap::new()),
            bus,
        }
    }

    /// Creates a store from configuration: the change bus is sized by
    /// `realtime.event_buffer`.
    pub fn from_config(config: &CliniboxConfig) -> Self {
        Self::with_bus(ChangeBroadcaster::with_capacity(
            config.realtime.event_buffer,
        ))
    }

    /// Creates a new store wrapped in an `Arc` for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// The change bus this store publishes on.
    pub fn bus(&self) -> &ChangeBroadcaster {
        &self.bus
    }

    fn publish(&self, event: ChangeEvent) {
        let delivered = self.bus.send(event.clone());
        debug!(
            table = %event.table,
            row = %event.row_id,
            op = %event.op,
            subscribers = delivered,
            "change published"
        );
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VisitStore for MemoryStore {
    async fn insert_visit(&self, new: NewVisit) -> Result<Visit, StorageError> {
        let visit = {
            let mut table = self.visits.write().await;
            let counter = table.entry_counters.entry(new.day).or_insert(0);
            *counter += 1;
            let visit = Visit {
                id: VisitId::new(),
                patient_id: new.patient_id,
                state: VisitState::Waiting,
                box_id: None,
                entry_number: *counter,
                day: new.day,
                entry_time: OffsetDateTime::now_utc(),
                attention_start_time: None,
                attention_end_time: None,
                file_status: FileStatus::Pending,
            };
            table.rows.insert(visit.id, visit.clone());
            visit
        };
        self.publish(ChangeEvent::inserted(StoreTable::Visits, visit.id.0));
        Ok(visit)
    }

    async fn get_visit(&self, id: VisitId) -> Result<Option<Visit>, StorageError> {
        let table = self.visits.read().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn conditional_update_visit(
        &self,
        id: VisitId,
        expected: VisitExpect,
        patch: VisitPatch,
    ) -> Result<u64, StorageError> {
        let affected = {
            let mut table = self.visits.write().await;
            let row = table
                .rows
                .get_mut(&id)
                .ok_or_else(|| StorageError::not_found(StoreTable::Visits, id.to_string()))?;
            if !expected.matches(row) {
                0
            } else {
                patch.apply(row);
                1
            }
        };
        if affected > 0 {
            self.publish(ChangeEvent::updated(StoreTable::Visits, id.0));
        }
        Ok(affected)
    }

    async fn update_visit(&self, id: VisitId, patch: VisitPatch) -> Result<Visit, StorageError> {
        let visit = {
            let mut table = self.visits.write().await;
            let row = table
                .rows
                .get_mut(&id)
                .ok_or_else(|| StorageError::not_found(StoreTable::Visits, id.to_string()))?;
            patch.apply(row);
            row.clone()
        };
        self.publish(ChangeEvent::updated(StoreTable::Visits, id.0));
        Ok(visit)
    }

    async fn list_visits_for_day(&self, day: ClinicDay) -> Result<Vec<Visit>, StorageError> {
        let table = self.visits.read().await;
        Ok(table
            .rows
            .values()
            .filter(|v| v.day == day)
            .cloned()
            .collect())
    }

    async fn list_visits_in_range(
        &self,
        from: ClinicDay,
        to: ClinicDay,
    ) -> Result<Vec<Visit>, StorageError> {
        let table = self.visits.read().await;
        Ok(table
            .rows
            .values()
            .filter(|v| v.day.in_range(from, to))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ExamStore for MemoryStore {
    async fn insert_exams(
        &self,
        new: Vec<NewExamAssignment>,
    ) -> Result<Vec<ExamAssignment>, StorageError> {
        let inserted = {
            let mut table = self.exams.write().await;
            let mut inserted = Vec::with_capacity(new.len());
            for template in new {
                let exam = ExamAssignment {
                    id: ExamAssignmentId::new(),
                    visit_id: template.visit_id,
                    exam_type_id: template.exam_type_id,
                    state: ExamState::Pending,
                    completed_at: None,
                    completed_by: None,
                };
                table.insert(exam.id, exam.clone());
                inserted.push(exam);
            }
            inserted
        };
        for exam in &inserted {
            self.publish(ChangeEvent::inserted(StoreTable::Exams, exam.id.0));
        }
        Ok(inserted)
    }

    async fn get_exam(&self, id: ExamAssignmentId) -> Result<Option<ExamAssignment>, StorageError> {
        let table = self.exams.read().await;
        Ok(table.get(&id).cloned())
    }

    async fn list_exams_for_visit(
        &self,
        visit_id: VisitId,
    ) -> Result<Vec<ExamAssignment>, StorageError> {
        let table = self.exams.read().await;
        Ok(table
            .values()
            .filter(|e| e.visit_id == visit_id)
            .cloned()
            .collect())
    }

    async fn batched_update_exams(
        &self,
        filter: ExamFilter,
        patch: ExamPatch,
    ) -> Result<u64, StorageError> {
        let touched = {
            let mut table = self.exams.write().await;
            let mut touched = Vec::new();
            for exam in table.values_mut() {
                if filter.matches(exam) {
                    patch.apply(exam);
                    touched.push(exam.id);
                }
            }
            touched
        };
        for id in &touched {
            self.publish(ChangeEvent::updated(StoreTable::Exams, id.0));
        }
        Ok(touched.len() as u64)
    }
}

#[async_trait]
impl ClinicStore for MemoryStore {
    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.bus.subscribe()
    }

    async fn day_snapshot(&self, day: ClinicDay) -> Result<DaySnapshot, StorageError> {
        self.range_snapshot(day, day).await
    }

    async fn range_snapshot(
        &self,
        from: ClinicDay,
        to: ClinicDay,
    ) -> Result<DaySnapshot, StorageError> {
        // Hold both read guards together (visits first) so no write commits
        // between reading the two tables.
        let visit_table = self.visits.read().await;
        let exam_table = self.exams.read().await;

        let visits: Vec<Visit> = visit_table
            .rows
            .values()
            .filter(|v| v.day.in_range(from, to))
            .cloned()
            .collect();
        let visit_ids: std::collections::HashSet<VisitId> =
            visits.iter().map(|v| v.id).collect();
        let exams: Vec<ExamAssignment> = exam_table
            .values()
            .filter(|e| visit_ids.contains(&e.visit_id))
            .cloned()
            .collect();

        Ok(DaySnapshot { visits, exams })
    }

    fn backend_name(&self) -> &'static str {
        "in-memory"
    }
}
