//! Box Capability Catalog.
//!
//! A read-mostly mapping of exam box → set of exam types it can perform.
//! Reads are lock-free: the whole catalog lives in an immutable snapshot
//! behind an `ArcSwap`, and administrative writes rebuild and swap the
//! snapshot wholesale (last-write-wins; these edits are infrequent and
//! manually reviewed, so a brief staleness window is acceptable).

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use clinibox_core::{BoxId, ExamBox, ExamTypeId};

/// One immutable view of the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    boxes: HashMap<BoxId, ExamBox>,
    capabilities: HashMap<BoxId, BTreeSet<ExamTypeId>>,
}

impl CatalogSnapshot {
    /// The exam types a box can perform. Empty set for unknown boxes.
    pub fn capabilities(&self, box_id: BoxId) -> BTreeSet<ExamTypeId> {
        self.capabilities.get(&box_id).cloned().unwrap_or_default()
    }

    /// The active boxes whose capability set intersects `exam_types`.
    pub fn boxes_covering(&self, exam_types: &BTreeSet<ExamTypeId>) -> BTreeSet<BoxId> {
        self.capabilities
            .iter()
            .filter(|(box_id, caps)| {
                self.is_active(**box_id) && !caps.is_disjoint(exam_types)
            })
            .map(|(box_id, _)| *box_id)
            .collect()
    }

    /// Looks up a box row.
    pub fn box_info(&self, box_id: BoxId) -> Option<&ExamBox> {
        self.boxes.get(&box_id)
    }

    /// Whether the box exists and is active.
    pub fn is_active(&self, box_id: BoxId) -> bool {
        self.boxes.get(&box_id).is_some_and(|b| b.active)
    }

    /// All active boxes.
    pub fn active_boxes(&self) -> Vec<&ExamBox> {
        self.boxes.values().filter(|b| b.active).collect()
    }
}

/// The catalog handle shared across the system.
///
/// Cloning is cheap; concurrent unsynchronized reads are safe by
/// construction.
#[derive(Debug, Default)]
pub struct BoxCatalog {
    snapshot: ArcSwap<CatalogSnapshot>,
}

impl BoxCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog wrapped in an `Arc` for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// The current snapshot. Hold it for the duration of one derivation so
    /// all capability checks within it agree.
    pub fn load(&self) -> Arc<CatalogSnapshot> {
        self.snapshot.load_full()
    }

    /// Registers or replaces a box row.
    pub fn upsert_box(&self, exam_box: ExamBox) {
        self.mutate(|snap| {
            snap.capabilities.entry(exam_box.id).or_default();
            snap.boxes.insert(exam_box.id, exam_box);
        });
    }

    /// Replaces the capability set of a box.
    pub fn set_capabilities(&self, box_id: BoxId, exam_types: BTreeSet<ExamTypeId>) {
        self.mutate(|snap| {
            snap.capabilities.insert(box_id, exam_types);
        });
    }

    /// Activates or deactivates a box, keeping its configuration.
    pub fn set_active(&self, box_id: BoxId, active: bool) {
        self.mutate(|snap| {
            if let Some(b) = snap.boxes.get_mut(&box_id) {
                b.active = active;
            }
        });
    }

    /// Convenience read: capabilities of a box from the current snapshot.
    pub fn capabilities(&self, box_id: BoxId) -> BTreeSet<ExamTypeId> {
        self.load().capabilities(box_id)
    }

    /// Convenience read: covering boxes from the current snapshot.
    pub fn boxes_covering(&self, exam_types: &BTreeSet<ExamTypeId>) -> BTreeSet<BoxId> {
        self.load().boxes_covering(exam_types)
    }

    // Rebuild-and-swap; concurrent writers are last-write-wins.
    fn mutate(&self, f: impl FnOnce(&mut CatalogSnapshot)) {
        let mut next = (*self.snapshot.load_full()).clone();
        f(&mut next);
        self.snapshot.store(Arc::new(next));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (BoxCatalog, BoxId, BoxId, ExamTypeId, ExamTypeId) {
        let catalog = BoxCatalog::new();
        let box1 = ExamBox::new("Box 1");
        let box2 = ExamBox::new("Box 2");
        let audio = ExamTypeId::new();
        let vision = ExamTypeId::new();

        let (b1, b2) = (box1.id, box2.id);
        catalog.upsert_box(box1);
        catalog.upsert_box(box2);
        catalog.set_capabilities(b1, BTreeSet::from([audio]));
        catalog.set_capabilities(b2, BTreeSet::from([audio, vision]));
        (catalog, b1, b2, audio, vision)
    }

    #[test]
    fn test_capabilities_lookup() {
        let (catalog, b1, b2, audio, vision) = seeded();
        assert_eq!(catalog.capabilities(b1), BTreeSet::from([audio]));
        assert_eq!(catalog.capabilities(b2), BTreeSet::from([audio, vision]));
        assert!(catalog.capabilities(BoxId::new()).is_empty());
    }

    #[test]
    fn test_boxes_covering_intersects() {
        let (catalog, b1, b2, audio, vision) = seeded();
        assert_eq!(
            catalog.boxes_covering(&BTreeSet::from([audio])),
            BTreeSet::from([b1, b2])
        );
        assert_eq!(
            catalog.boxes_covering(&BTreeSet::from([vision])),
            BTreeSet::from([b2])
        );
        assert!(
            catalog
                .boxes_covering(&BTreeSet::from([ExamTypeId::new()]))
                .is_empty()
        );
    }

    #[test]
    fn test_inactive_boxes_do_not_cover() {
        let (catalog, b1, b2, audio, _) = seeded();
        catalog.set_active(b2, false);
        assert_eq!(
            catalog.boxes_covering(&BTreeSet::from([audio])),
            BTreeSet::from([b1])
        );
        assert!(!catalog.load().is_active(b2));
    }

    #[test]
    fn test_snapshot_is_stable_across_writes() {
        let (catalog, b1, _, audio, _) = seeded();
        let snap = catalog.load();
        catalog.set_capabilities(b1, BTreeSet::new());
        // The held snapshot still sees the old capability set.
        assert_eq!(snap.capabilities(b1), BTreeSet::from([audio]));
        assert!(catalog.capabilities(b1).is_empty());
    }
}
