//! Typed identifiers for the domain rows.
//!
//! Every store row is keyed by a uuid v4 wrapped in its own newtype so that a
//! `VisitId` can never be passed where a `BoxId` is expected. The wrappers
//! serialize transparently as plain uuids.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generates a fresh random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Returns the inner uuid.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

id_type!(
    /// Identifier of a clinic episode (one patient, one day).
    VisitId
);
id_type!(
    /// Identifier of a patient. Owned by the demographics subsystem; opaque here.
    PatientId
);
id_type!(
    /// Identifier of an exam box (physical station).
    BoxId
);
id_type!(
    /// Identifier of an exam type (the catalog vocabulary, e.g. audiometry).
    ExamTypeId
);
id_type!(
    /// Identifier of a single per-visit exam work item.
    ExamAssignmentId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_distinct() {
        let a = VisitId::new();
        let b = VisitId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_id_serde_transparent() {
        let id = BoxId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
        let back: BoxId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
