//! Change-event system.
//!
//! Every store mutation is announced on a broadcast bus as a small
//! `{table, row_id, op}` event. Subscribers never apply events as deltas;
//! an event is only a trigger to re-derive a view from current store state.

mod broadcaster;
mod types;

pub use broadcaster::ChangeBroadcaster;
pub use types::{ChangeEvent, ChangeOp, StoreTable};
