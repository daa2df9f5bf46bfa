//! Change-event types published by the stores.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Which store table a change touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreTable {
    Visits,
    Exams,
}

impl StoreTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreTable::Visits => "visits",
            StoreTable::Exams => "exams",
        }
    }
}

impl std::fmt::Display for StoreTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of mutation. Rows are append-only or updated in place, never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Insert,
    Update,
}

impl ChangeOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeOp::Insert => "insert",
            ChangeOp::Update => "update",
        }
    }
}

impl std::fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single row-level change notification.
///
/// Delivery is at-least-once and unordered across subscriber connections, so
/// the payload is deliberately minimal: enough to know *something* changed
/// and which day partition to re-derive, never enough to patch a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: StoreTable,
    /// The raw row id (a `VisitId` or `ExamAssignmentId` depending on
    /// `table`).
    pub row_id: Uuid,
    pub op: ChangeOp,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl ChangeEvent {
    /// Create a new change event stamped with the current time.
    pub fn new(table: StoreTable, row_id: Uuid, op: ChangeOp) -> Self {
        Self {
            table,
            row_id,
            op,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    /// Create an insert event.
    pub fn inserted(table: StoreTable, row_id: Uuid) -> Self {
        Self::new(table, row_id, ChangeOp::Insert)
    }

    /// Create an update event.
    pub fn updated(table: StoreTable, row_id: Uuid) -> Self {
        Self::new(table, row_id, ChangeOp::Update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_constructors() {
        let id = Uuid::new_v4();
        let ev = ChangeEvent::inserted(StoreTable::Visits, id);
        assert_eq!(ev.table, StoreTable::Visits);
        assert_eq!(ev.op, ChangeOp::Insert);
        assert_eq!(ev.row_id, id);

        let ev = ChangeEvent::updated(StoreTable::Exams, id);
        assert_eq!(ev.op, ChangeOp::Update);
    }

    #[test]
    fn test_event_serde_round_trip() {
        let ev = ChangeEvent::inserted(StoreTable::Exams, Uuid::new_v4());
        let json = serde_json::to_string(&ev).unwrap();
        let back: ChangeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ev);
    }
}
