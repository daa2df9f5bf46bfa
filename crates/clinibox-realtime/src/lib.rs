//! Realtime fan-out.
//!
//! Subscribers (box dashboards, the flow board, the public display, patient
//! portals) never apply change events as deltas. An event — like a poll tick
//! — is only a trigger to re-derive the subscriber's view from a fresh store
//! snapshot. Push is a latency optimization; the poll is the liveness
//! guarantee; both paths call the same idempotent `refresh`.
//!
//! The one piece of fan-out state that is not a pure derivation is the "your
//! turn" announcement, which must fire exactly once per `(visit, box)`
//! transition into attention. [`TurnAnnouncer`] owns that dedup, scoped to
//! the subscriber connection that holds it.

mod announce;
mod interest;
mod subscriber;

pub use announce::{Announcement, TurnAnnouncer};
pub use interest::{PortalVisit, SubscriberInterest, ViewPayload};
pub use subscriber::{RunOptions, ViewSubscriber, run};
