mod location;
mod quote;
mod trip;

pub use location::{LatLng, Place};
pub use quote::{Quote, QuoteBreakdown, QuoteRequest, RideType};
pub use trip::{DispatchMode, Trip, TripEvent, TripStatus};
