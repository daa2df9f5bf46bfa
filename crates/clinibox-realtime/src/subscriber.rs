//! The subscriber loop: push-driven refresh with a poll backstop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast::error::RecvError, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, instrument, warn};

use clinibox_catalog::BoxCatalog;
use clinibox_config::RealtimeConfig;
use clinibox_core::ClinicDay;
use clinibox_storage::{ClinicStore, StorageError};

use crate::announce::{Announcement, TurnAnnouncer};
use crate::interest::{SubscriberInterest, ViewPayload};

/// One subscriber connection: a store handle, the catalog and an interest.
#[derive(Debug)]
pub struct ViewSubscriber<S> {
    store: Arc<S>,
    catalog: Arc<BoxCatalog>,
    interest: SubscriberInterest,
}

impl<S> Clone for ViewSubscriber<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            catalog: Arc::clone(&self.catalog),
            interest: self.interest,
        }
    }
}

impl<S: ClinicStore> ViewSubscriber<S> {
    pub fn new(store: Arc<S>, catalog: Arc<BoxCatalog>, interest: SubscriberInterest) -> Self {
        Self {
            store,
            catalog,
            interest,
        }
    }

    pub fn interest(&self) -> SubscriberInterest {
        self.interest
    }

    /// Re-derives the view from a fresh snapshot of the given day.
    ///
    /// This is the single recompute path behind both push notifications and
    /// the poll backstop. It is idempotent: with no intervening store
    /// mutation, two refreshes yield identical payloads.
    pub async fn refresh(&self, day: ClinicDay) -> Result<ViewPayload, StorageError> {
        let snapshot = self.store.day_snapshot(day).await?;
        Ok(self.interest.derive(&snapshot, &self.catalog.load()))
    }

    /// Like `refresh`, but also runs the snapshot through the connection's
    /// turn-announcement dedup.
    pub async fn refresh_with_announcements(
        &self,
        day: ClinicDay,
        announcer: &TurnAnnouncer,
    ) -> Result<(ViewPayload, Vec<Announcement>), StorageError> {
        let snapshot = self.store.day_snapshot(day).await?;
        let announcements = announcer.observe(&snapshot);
        let payload = self.interest.derive(&snapshot, &self.catalog.load());
        Ok((payload, announcements))
    }
}

/// Loop tuning knobs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Poll backstop cadence. Push delivery can be lost; this cannot.
    pub poll_interval: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from(&RealtimeConfig::default())
    }
}

impl From<&RealtimeConfig> for RunOptions {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
        }
    }
}

/// Drives one subscriber until shutdown: refresh on every change event,
/// refresh on every poll tick, emit each payload through `on_view`.
///
/// A lagged broadcast receiver is handled the same way as an ordinary
/// event — refresh from current state — because events carry no data a
/// subscriber would miss.
#[instrument(skip_all, fields(interest = ?subscriber.interest()))]
pub async fn run<S, F>(
    subscriber: ViewSubscriber<S>,
    options: RunOptions,
    mut shutdown: watch::Receiver<bool>,
    mut on_view: F,
) where
    S: ClinicStore,
    F: FnMut(ViewPayload),
{
    let mut changes = subscriber.store.subscribe();
    let mut poll = tokio::time::interval(options.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = poll.tick() => {
                debug!("poll backstop tick");
            }
            received = changes.recv() => match received {
                Ok(event) => {
                    debug!(table = %event.table, op = %event.op, "change received");
                }
                Err(RecvError::Lagged(missed)) => {
                    debug!(missed, "receiver lagged; refreshing from current state");
                }
                Err(RecvError::Closed) => break,
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        match subscriber.refresh(ClinicDay::today()).await {
            Ok(payload) => on_view(payload),
            // Next event or tick retries; the store owns durability.
            Err(err) => warn!(error = %err, "view refresh failed"),
        }
    }
}
