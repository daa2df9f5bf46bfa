//! Subscriber interests and their view payloads.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use clinibox_catalog::CatalogSnapshot;
use clinibox_core::{BoxId, PatientId, Visit, VisitState};
use clinibox_storage::DaySnapshot;
use clinibox_views::{QueueBoard, WaitingEntry, waiting_list};

/// What a subscriber connection is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriberInterest {
    /// A box terminal: its own patients plus the queue it may call from.
    BoxDashboard(BoxId),
    /// The front-desk flow board: everything.
    FlowBoard,
    /// The waiting-room TV: entry numbers being served, no patient data.
    PublicDisplay,
    /// A patient's own device, keyed by patient rather than box.
    PatientPortal(PatientId),
}

/// One visit as shown on the patient portal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalVisit {
    pub visit: Visit,
    /// 1-based place in the waiting queue; `None` unless waiting.
    pub queue_position: Option<usize>,
    /// Boxes that can still serve the visit.
    pub pending_boxes: BTreeSet<BoxId>,
}

/// The derived view for one interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ViewPayload {
    BoxDashboard {
        /// Visits currently inside this box.
        in_attention: Vec<Visit>,
        /// Waiting visits this box could legally call.
        callable: Vec<WaitingEntry>,
    },
    FlowBoard(QueueBoard),
    PublicDisplay {
        /// `(entry_number, box)` pairs currently being served.
        now_serving: Vec<(u32, BoxId)>,
    },
    PatientPortal { visits: Vec<PortalVisit> },
}

impl SubscriberInterest {
    /// Derives this interest's payload from one snapshot. Pure; calling it
    /// twice on the same snapshot yields the same payload.
    pub fn derive(&self, snapshot: &DaySnapshot, catalog: &CatalogSnapshot) -> ViewPayload {
        match *self {
            SubscriberInterest::BoxDashboard(box_id) => ViewPayload::BoxDashboard {
                in_attention: clinibox_views::in_attention_list(snapshot, box_id),
                callable: waiting_list(snapshot, catalog)
                    .into_iter()
                    .filter(|entry| entry.pending_boxes.contains(&box_id))
                    .collect(),
            },
            SubscriberInterest::FlowBoard => {
                ViewPayload::FlowBoard(QueueBoard::derive(snapshot, catalog))
            }
            SubscriberInterest::PublicDisplay => {
                let mut now_serving: Vec<(u32, BoxId)> = snapshot
                    .visits
                    .iter()
                    .filter_map(|v| match (v.state, v.box_id) {
                        (VisitState::InAttention, Some(box_id)) => {
                            Some((v.entry_number, box_id))
                        }
                        _ => None,
                    })
                    .collect();
                now_serving.sort_unstable();
                ViewPayload::PublicDisplay { now_serving }
            }
            SubscriberInterest::PatientPortal(patient_id) => {
                let queue = waiting_list(snapshot, catalog);
                let visits = snapshot
                    .visits
                    .iter()
                    .filter(|v| v.patient_id == patient_id)
                    .map(|v| {
                        let entry = queue.iter().enumerate().find(|(_, e)| e.visit.id == v.id);
                        PortalVisit {
                            visit: v.clone(),
                            queue_position: entry.map(|(i, _)| i + 1),
                            pending_boxes: entry
                                .map(|(_, e)| e.pending_boxes.clone())
                                .unwrap_or_default(),
                        }
                    })
                    .collect();
                ViewPayload::PatientPortal { visits }
            }
        }
    }
}
