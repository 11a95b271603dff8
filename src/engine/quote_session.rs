use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::timeout;
use uuid::Uuid;

use crate::api::{DynPricingProvider, TripBackend};
use crate::config::Config;
use crate::entities::{Place, Quote, QuoteRequest, RideType};
use crate::error::{ConfirmError, QuoteError};
use crate::pricing;

#[derive(Copy, Clone, Debug)]
pub struct SessionConfig {
    pub debounce: Duration,
    pub request_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(350),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&Config> for SessionConfig {
    fn from(config: &Config) -> Self {
        Self {
            debounce: config.debounce(),
            request_timeout: config.quote_timeout(),
        }
    }
}

/// What the rest of the application reads: the rider's selections plus the
/// current quote, loading flag and error.
#[derive(Clone, Debug, Default)]
pub struct QuoteView {
    pub pickup: Option<Place>,
    pub dropoff: Option<Place>,
    pub ride_type: RideType,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub quote: Option<Quote>,
    pub loading: bool,
    pub error: Option<QuoteError>,
}

struct SessionState {
    view: QuoteView,
    // Bumped on every input change; a request result is applied only while
    // its captured generation is still current.
    generation: u64,
}

/// Orchestrates quoting: holds the rider's selections, debounces provider
/// calls, and discards any in-flight result that was superseded by a newer
/// input change.
pub struct QuoteSession {
    provider: DynPricingProvider,
    state: Arc<Mutex<SessionState>>,
    publisher: watch::Sender<QuoteView>,
    config: SessionConfig,
}

impl QuoteSession {
    pub fn new(provider: DynPricingProvider, config: SessionConfig) -> Self {
        let view = QuoteView::default();
        let (publisher, _) = watch::channel(view.clone());

        Self {
            provider,
            state: Arc::new(Mutex::new(SessionState {
                view,
                generation: 0,
            })),
            publisher,
            config,
        }
    }

    /// Builds a session with the provider selected by configuration.
    pub fn from_config(config: &Config) -> Result<Self, QuoteError> {
        let provider = pricing::provider_from_config(config)?;
        Ok(Self::new(provider, SessionConfig::from(config)))
    }

    pub fn set_pickup(&self, pickup: Option<Place>) {
        self.edit(|view| view.pickup = pickup);
    }

    pub fn set_dropoff(&self, dropoff: Option<Place>) {
        self.edit(|view| view.dropoff = dropoff);
    }

    pub fn set_ride_type(&self, ride_type: RideType) {
        self.edit(|view| view.ride_type = ride_type);
    }

    pub fn set_scheduled_at(&self, scheduled_at: Option<DateTime<Utc>>) {
        self.edit(|view| view.scheduled_at = scheduled_at);
    }

    /// Skips the quiet period and refreshes immediately. Still subject to
    /// last-scheduled-wins: an older in-flight result will not land on top.
    pub fn request_now(&self) {
        self.refresh(Duration::ZERO);
    }

    pub fn view(&self) -> QuoteView {
        self.state.lock().unwrap().view.clone()
    }

    pub fn watch(&self) -> watch::Receiver<QuoteView> {
        self.publisher.subscribe()
    }

    /// Hands the current quote to the external confirmation procedure and
    /// returns the persisted trip id.
    #[tracing::instrument(skip(self, backend))]
    pub async fn confirm(&self, backend: &dyn TripBackend) -> Result<Uuid, ConfirmError> {
        let quote_id = self
            .state
            .lock()
            .unwrap()
            .view
            .quote
            .as_ref()
            .map(|quote| quote.id.clone())
            .ok_or(ConfirmError::NoQuote)?;

        backend.confirm_quote(&quote_id).await
    }

    fn edit(&self, apply: impl FnOnce(&mut QuoteView)) {
        {
            let mut state = self.state.lock().unwrap();
            apply(&mut state.view);
        }

        self.refresh(self.config.debounce);
    }

    /// Invalidates any in-flight request and, when both endpoints are set,
    /// schedules a fresh one after `delay`.
    fn refresh(&self, delay: Duration) {
        let generation = {
            let mut state = self.state.lock().unwrap();
            state.generation += 1;

            if state.view.pickup.is_some() && state.view.dropoff.is_some() {
                state.view.loading = true;
                state.view.error = None;
                self.publisher.send_replace(state.view.clone());
                Some(state.generation)
            } else {
                state.view.quote = None;
                state.view.loading = false;
                state.view.error = None;
                self.publisher.send_replace(state.view.clone());
                None
            }
        };

        let Some(generation) = generation else {
            return;
        };

        let provider = self.provider.clone();
        let state = self.state.clone();
        let publisher = self.publisher.clone();
        let request_timeout = self.config.request_timeout;

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let request = {
                let state = state.lock().unwrap();
                if state.generation != generation {
                    // Another edit arrived during the quiet period.
                    return;
                }

                let (Some(pickup), Some(dropoff)) = (&state.view.pickup, &state.view.dropoff)
                else {
                    return;
                };

                QuoteRequest {
                    origin: pickup.position,
                    destination: dropoff.position,
                    ride_type: state.view.ride_type,
                    scheduled_at: state.view.scheduled_at,
                }
            };

            let outcome = match timeout(request_timeout, provider.get_quote(&request)).await {
                Ok(result) => result,
                Err(_) => Err(QuoteError::Timeout),
            };

            let mut state = state.lock().unwrap();
            if state.generation != generation {
                tracing::debug!(generation, "discarding superseded quote result");
                return;
            }

            state.view.loading = false;
            match outcome {
                Ok(quote) => {
                    tracing::info!(quote_id = %quote.id, amount = quote.amount, "quote ready");
                    state.view.quote = Some(quote);
                    state.view.error = None;
                }
                Err(err) => {
                    tracing::warn!(%err, "quote request failed");
                    state.view.quote = None;
                    state.view.error = Some(err);
                }
            }

            publisher.send_replace(state.view.clone());
        });
    }
}
