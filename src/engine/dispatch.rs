use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::timeout;
use uuid::Uuid;

use crate::api::DynTripBackend;
use crate::entities::DispatchMode;

/// Triggers the external driver-assignment procedure, at most once per trip
/// id for the life of the resolver. Sharing one resolver across successive
/// tracking views extends the guarantee to the whole session.
pub struct DispatchResolver {
    backend: DynTripBackend,
    timeout: Duration,
    dispatched: Mutex<HashSet<Uuid>>,
}

impl DispatchResolver {
    pub fn new(backend: DynTripBackend, timeout: Duration) -> Self {
        Self {
            backend,
            timeout,
            dispatched: Mutex::new(HashSet::new()),
        }
    }

    /// Resolves how the backend will assign a driver. `None` means this trip
    /// was already dispatched here. Failures never escape: retrying
    /// assignment is the backend's job, so the rider just sees manual mode.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, trip_id: Uuid) -> Option<DispatchMode> {
        let first_invocation = self.dispatched.lock().unwrap().insert(trip_id);
        if !first_invocation {
            tracing::debug!(%trip_id, "dispatch already invoked, skipping");
            return None;
        }

        match timeout(self.timeout, self.backend.dispatch_trip(trip_id)).await {
            Ok(Ok(mode)) => {
                tracing::info!(%trip_id, ?mode, "dispatch resolved");
                Some(mode)
            }
            Ok(Err(err)) => {
                tracing::warn!(%trip_id, %err, "dispatch failed, falling back to manual");
                Some(DispatchMode::Manual)
            }
            Err(_) => {
                tracing::warn!(%trip_id, "dispatch timed out, falling back to manual");
                Some(DispatchMode::Manual)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TripBackend;
    use crate::entities::{Trip, TripEvent};
    use crate::error::{ConfirmError, DispatchError, TripStoreError};

    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingBackend {
        calls: AtomicUsize,
        outcome: Result<DispatchMode, DispatchError>,
    }

    #[async_trait]
    impl TripBackend for CountingBackend {
        async fn fetch_trip(&self, _id: Uuid) -> Result<Trip, TripStoreError> {
            Err(TripStoreError::SnapshotFailed("not under test".into()))
        }

        async fn recent_events(
            &self,
            _trip_id: Uuid,
            _limit: usize,
        ) -> Result<Vec<TripEvent>, TripStoreError> {
            Ok(Vec::new())
        }

        async fn confirm_quote(&self, _quote_id: &str) -> Result<Uuid, ConfirmError> {
            Err(ConfirmError::Failed("not under test".into()))
        }

        async fn dispatch_trip(&self, _trip_id: Uuid) -> Result<DispatchMode, DispatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    #[tokio::test]
    async fn invokes_backend_once_per_trip_id() {
        let backend = Arc::new(CountingBackend {
            calls: AtomicUsize::new(0),
            outcome: Ok(DispatchMode::Auto),
        });
        let resolver = DispatchResolver::new(backend.clone(), Duration::from_secs(10));
        let trip_id = Uuid::new_v4();

        assert_eq!(resolver.resolve(trip_id).await, Some(DispatchMode::Auto));
        assert_eq!(resolver.resolve(trip_id).await, None);
        assert_eq!(resolver.resolve(trip_id).await, None);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        // A different trip id is its own invocation.
        assert_eq!(
            resolver.resolve(Uuid::new_v4()).await,
            Some(DispatchMode::Auto)
        );
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn backend_failure_falls_back_to_manual() {
        use tokio_test::block_on;

        let backend = Arc::new(CountingBackend {
            calls: AtomicUsize::new(0),
            outcome: Err(DispatchError::Unavailable("assignment worker down".into())),
        });
        let resolver = DispatchResolver::new(backend, Duration::from_secs(10));

        assert_eq!(
            block_on(resolver.resolve(Uuid::new_v4())),
            Some(DispatchMode::Manual)
        );
    }
}
