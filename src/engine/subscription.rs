use tokio::sync::mpsc;

use crate::api::{ChangeEvent, DynChangeFeed, EntityFilter, FeedHandle, FeedSubscription};
use crate::error::TripStoreError;

/// Opens filtered change-feed subscriptions and hands them out as owned,
/// self-releasing values.
pub struct SubscriptionManager {
    feed: DynChangeFeed,
}

impl SubscriptionManager {
    pub fn new(feed: DynChangeFeed) -> Self {
        Self { feed }
    }

    pub fn open(&self, filter: EntityFilter) -> Result<Subscription, TripStoreError> {
        let FeedSubscription { handle, receiver } = self.feed.subscribe(filter)?;

        tracing::debug!(trip_id = %filter.trip_id(), ?filter, ?handle, "subscription opened");

        Ok(Subscription {
            feed: self.feed.clone(),
            filter,
            handle,
            receiver,
            released: false,
        })
    }
}

/// One open feed. `release` (or drop) unsubscribes from the underlying feed
/// and guarantees that no delivery — including one already buffered — is
/// observable afterwards.
pub struct Subscription {
    feed: DynChangeFeed,
    filter: EntityFilter,
    handle: FeedHandle,
    receiver: mpsc::Receiver<ChangeEvent>,
    released: bool,
}

impl Subscription {
    /// Next delivery, or `None` once the feed has ended or the subscription
    /// was released.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        if self.released {
            return None;
        }

        self.receiver.recv().await
    }

    pub fn filter(&self) -> EntityFilter {
        self.filter
    }

    pub fn release(&mut self) {
        if self.released {
            return;
        }

        self.released = true;
        self.receiver.close();

        // A closed receiver still hands out buffered messages; drain them so
        // a delivery racing with teardown is never observed.
        while self.receiver.try_recv().is_ok() {}

        self.feed.unsubscribe(self.handle);

        tracing::debug!(filter = ?self.filter, handle = ?self.handle, "subscription released");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}
