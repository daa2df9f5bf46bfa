//! Derived View Engine.
//!
//! Every queue display in the clinic (per-box dashboard, general flow board,
//! public TV, patient portal) is a pure function of one consistent store
//! snapshot. Nothing here reads the store or mutates anything: callers fetch
//! a [`clinibox_storage::DaySnapshot`], hand it over, and get plain data
//! back. Recomputing the same snapshot always yields the same view, which is
//! what makes at-least-once change delivery safe to act on.

mod engine;

pub use engine::{
    IncompleteEntry, QueueBoard, WaitingEntry, in_attention_list, incomplete_report,
    pending_boxes_for, ready_to_finalize, waiting_list,
};
