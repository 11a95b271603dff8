use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use uuid::Uuid;

use crate::api::{ChangeEvent, DynTripBackend, EntityFilter};
use crate::config::Config;
use crate::engine::{DispatchResolver, Subscription, SubscriptionManager};
use crate::entities::{DispatchMode, Trip, TripEvent, TripStatus};
use crate::error::TripStoreError;

#[derive(Copy, Clone, Debug)]
pub struct StoreConfig {
    pub snapshot_timeout: Duration,
    pub event_log_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot_timeout: Duration::from_secs(10),
            event_log_limit: 20,
        }
    }
}

impl From<&Config> for StoreConfig {
    fn from(config: &Config) -> Self {
        Self {
            snapshot_timeout: config.snapshot_timeout(),
            event_log_limit: config.event_log_limit,
        }
    }
}

/// The rendered state of one tracked trip. `live` is false when the view is
/// running on the snapshot alone, without push updates.
#[derive(Clone, Debug)]
pub struct TripView {
    pub trip: Trip,
    /// Newest first. Ids are unique within the log.
    pub events: Vec<TripEvent>,
    pub dispatch_mode: Option<DispatchMode>,
    pub live: bool,
}

/// A live view of exactly one trip: a one-time snapshot merged with the trip
/// row feed and the trip event feed. Dropping (or closing) the store
/// releases both subscriptions; nothing is applied after teardown.
pub struct TripStateStore {
    trip_id: Uuid,
    view: watch::Receiver<TripView>,
    pump: JoinHandle<()>,
}

impl TripStateStore {
    #[tracing::instrument(skip(backend, subscriptions, resolver, config))]
    pub async fn open(
        backend: DynTripBackend,
        subscriptions: &SubscriptionManager,
        resolver: Arc<DispatchResolver>,
        trip_id: Uuid,
        config: StoreConfig,
    ) -> Result<Self, TripStoreError> {
        let snapshot = timeout(
            config.snapshot_timeout,
            try_join(
                backend.fetch_trip(trip_id),
                backend.recent_events(trip_id, config.event_log_limit),
            ),
        )
        .await;

        let (trip, events) = match snapshot {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                return Err(TripStoreError::SnapshotFailed(
                    "snapshot fetch timed out".into(),
                ))
            }
        };

        tracing::info!(%trip_id, status = trip.status.name(), events = events.len(), "trip snapshot loaded");

        // Dispatch only when the trip is observed as requested right now;
        // later re-observations of `requested` never re-trigger it.
        let dispatch_mode = if trip.status == TripStatus::Requested {
            resolver.resolve(trip_id).await
        } else {
            None
        };

        let pair = match open_pair(subscriptions, trip_id) {
            Ok(pair) => Some(pair),
            Err(err) => {
                tracing::warn!(%trip_id, %err, "subscriptions unavailable, degrading to snapshot-only view");
                None
            }
        };

        let live = pair.is_some();
        let (tx, rx) = watch::channel(TripView {
            trip,
            events,
            dispatch_mode,
            live,
        });

        let pump = tokio::spawn(async move {
            if let Some((rows, events)) = pair {
                run_pump(trip_id, rows, events, tx).await;
            }
        });

        Ok(Self {
            trip_id,
            view: rx,
            pump,
        })
    }

    pub fn trip_id(&self) -> Uuid {
        self.trip_id
    }

    pub fn view(&self) -> TripView {
        self.view.borrow().clone()
    }

    /// A handle that observes every applied change.
    pub fn watch(&self) -> watch::Receiver<TripView> {
        self.view.clone()
    }

    pub fn is_live(&self) -> bool {
        self.view.borrow().live
    }

    /// Releases both subscriptions. Equivalent to dropping the store.
    pub fn close(self) {}
}

impl Drop for TripStateStore {
    fn drop(&mut self) {
        // Dropping the pump future releases both subscriptions.
        self.pump.abort();
    }
}

fn open_pair(
    subscriptions: &SubscriptionManager,
    trip_id: Uuid,
) -> Result<(Subscription, Subscription), TripStoreError> {
    // If the second open fails, the first guard drops and releases itself.
    let rows = subscriptions.open(EntityFilter::TripRow(trip_id))?;
    let events = subscriptions.open(EntityFilter::TripEvents(trip_id))?;
    Ok((rows, events))
}

async fn run_pump(
    trip_id: Uuid,
    mut rows: Subscription,
    mut events: Subscription,
    view: watch::Sender<TripView>,
) {
    loop {
        tokio::select! {
            row = rows.next() => match row {
                Some(ChangeEvent::TripRow(trip)) => apply_trip(&view, trip),
                Some(other) => {
                    tracing::warn!(%trip_id, filter = ?rows.filter(), ?other, "unexpected payload on trip row feed");
                }
                None => break,
            },
            event = events.next() => match event {
                Some(ChangeEvent::TripEvent(event)) => apply_event(&view, event),
                Some(other) => {
                    tracing::warn!(%trip_id, filter = ?events.filter(), ?other, "unexpected payload on trip event feed");
                }
                None => break,
            },
        }
    }

    tracing::warn!(%trip_id, "push feed ended, view is no longer live");
    view.send_modify(|state| state.live = false);
}

/// Replaces the cached trip with the newest payload, in arrival order. The
/// backend is the sole writer, so last-received-wins; an update that is not
/// a forward step in the status graph is still applied but logged, since it
/// means the transport delivered out of order.
fn apply_trip(view: &watch::Sender<TripView>, incoming: Trip) {
    view.send_modify(|state| {
        let current = state.trip.status;
        let next = incoming.status;

        if current != next && !current.can_transition_to(next) {
            tracing::warn!(
                trip_id = %incoming.id,
                from = current.name(),
                to = next.name(),
                "trip update out of status order, applying in arrival order"
            );
        }

        state.trip = incoming;
    });
}

/// Prepends a new event, ignoring any id already present: the same event can
/// arrive through both the snapshot and the push feed.
fn apply_event(view: &watch::Sender<TripView>, incoming: TripEvent) {
    view.send_if_modified(|state| {
        if state.events.iter().any(|event| event.id == incoming.id) {
            tracing::debug!(event_id = %incoming.id, "duplicate trip event ignored");
            return false;
        }

        state.events.insert(0, incoming);
        true
    });
}
