mod dispatch;
mod quote_session;
mod subscription;
mod trip_store;

pub use dispatch::DispatchResolver;
pub use quote_session::{QuoteSession, QuoteView, SessionConfig};
pub use subscription::{Subscription, SubscriptionManager};
pub use trip_store::{StoreConfig, TripStateStore, TripView};
