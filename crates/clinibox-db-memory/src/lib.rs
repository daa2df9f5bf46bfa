//! In-memory store backend.
//!
//! This backend keeps both tables in `tokio::sync::RwLock`-guarded maps and
//! implements the full [`clinibox_storage::ClinicStore`] contract:
//! compare-and-swap visit updates, filtered exam batches, per-day monotone
//! entry numbers, consistent day snapshots and change-event publication.
//!
//! It is the reference backend for tests and single-process deployments; a
//! database-backed implementation can replace it behind the same traits.

mod store;

pub use store::MemoryStore;
