use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::entities::{DispatchMode, Quote, QuoteRequest, Trip, TripEvent};
use crate::error::{ConfirmError, DispatchError, QuoteError, TripStoreError};

/// Prices a prospective trip. Implementations are interchangeable; callers
/// never branch on which one is active — selection happens once, from
/// configuration.
#[async_trait]
pub trait PricingProvider: Send + Sync {
    async fn get_quote(&self, request: &QuoteRequest) -> Result<Quote, QuoteError>;
}

pub type DynPricingProvider = Arc<dyn PricingProvider>;

/// The durable store and procedures behind trip tracking: snapshot reads,
/// quote confirmation and driver dispatch. Persistence itself lives on the
/// other side of this trait.
#[async_trait]
pub trait TripBackend: Send + Sync {
    async fn fetch_trip(&self, id: Uuid) -> Result<Trip, TripStoreError>;

    /// Most recent events for a trip, newest first, at most `limit`.
    async fn recent_events(&self, trip_id: Uuid, limit: usize)
        -> Result<Vec<TripEvent>, TripStoreError>;

    /// Converts an ephemeral quote into a persisted trip.
    async fn confirm_quote(&self, quote_id: &str) -> Result<Uuid, ConfirmError>;

    async fn dispatch_trip(&self, trip_id: Uuid) -> Result<DispatchMode, DispatchError>;
}

pub type DynTripBackend = Arc<dyn TripBackend>;

/// Filter for a change feed: exactly one trip's row, or one trip's event
/// inserts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntityFilter {
    TripRow(Uuid),
    TripEvents(Uuid),
}

impl EntityFilter {
    pub fn trip_id(&self) -> Uuid {
        match self {
            Self::TripRow(id) => *id,
            Self::TripEvents(id) => *id,
        }
    }
}

/// A single push delivery from a change feed.
#[derive(Clone, Debug, PartialEq)]
pub enum ChangeEvent {
    TripRow(Trip),
    TripEvent(TripEvent),
}

/// Opaque subscription handle, echoed back on unsubscribe.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FeedHandle(pub u64);

/// An open feed: the handle plus the stream of deliveries. The transport
/// provides no ordering guarantee across distinct subscriptions.
pub struct FeedSubscription {
    pub handle: FeedHandle,
    pub receiver: mpsc::Receiver<ChangeEvent>,
}

/// The push-channel primitive of the durable store collaborator.
pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self, filter: EntityFilter) -> Result<FeedSubscription, TripStoreError>;

    fn unsubscribe(&self, handle: FeedHandle);
}

pub type DynChangeFeed = Arc<dyn ChangeFeed>;
