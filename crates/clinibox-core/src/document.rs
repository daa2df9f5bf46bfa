//! Read-only context handed to the document/consent subsystem.
//!
//! The scheduler never mutates document state; it only exposes which visit
//! and patient a box terminal is currently attending so the document
//! subsystem can decide whether box-level forms are outstanding.

use serde::{Deserialize, Serialize};

use crate::ids::{PatientId, VisitId};

/// The `(visit, patient)` pair consumed by the document subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentContext {
    pub visit_id: VisitId,
    pub patient_id: PatientId,
}

impl DocumentContext {
    pub fn new(visit_id: VisitId, patient_id: PatientId) -> Self {
        Self {
            visit_id,
            patient_id,
        }
    }
}
