//! The `ExamBox` row: a physical exam station.
//!
//! The capability set (which exam types the box can perform) lives in the
//! catalog crate; this row carries only identity and the active flag.

use serde::{Deserialize, Serialize};

use crate::ids::BoxId;

/// A physical exam station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamBox {
    pub id: BoxId,
    pub name: String,
    /// Inactive boxes keep their configuration but may not claim patients.
    pub active: bool,
}

impl ExamBox {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: BoxId::new(),
            name: name.into(),
            active: true,
        }
    }
}
