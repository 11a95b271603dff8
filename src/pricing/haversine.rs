use async_trait::async_trait;

use crate::api::PricingProvider;
use crate::entities::{LatLng, Quote, QuoteRequest};
use crate::error::QuoteError;
use crate::pricing::{build_quote, RateTable, CITY_SPEED_KMPH};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points, in kilometres.
pub fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Straight-line approximation provider: great-circle distance, duration at
/// an assumed city average speed. Needs no network and no configuration.
#[derive(Clone, Debug)]
pub struct HaversineProvider {
    rates: RateTable,
}

impl HaversineProvider {
    pub fn new(rates: RateTable) -> Self {
        Self { rates }
    }
}

#[async_trait]
impl PricingProvider for HaversineProvider {
    #[tracing::instrument(skip(self))]
    async fn get_quote(&self, request: &QuoteRequest) -> Result<Quote, QuoteError> {
        let km = haversine_km(request.origin, request.destination);

        if !km.is_finite() {
            return Err(QuoteError::NoRoute);
        }

        let min = km / CITY_SPEED_KMPH * 60.0;

        Ok(build_quote(request.ride_type, km, min, &self.rates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        let point = LatLng::new(-33.906, 18.419);
        assert_eq!(haversine_km(point, point), 0.0);
    }

    #[test]
    fn known_distance_cape_town_to_johannesburg() {
        // Roughly 1262 km great-circle.
        let cape_town = LatLng::new(-33.9249, 18.4241);
        let johannesburg = LatLng::new(-26.2041, 28.0473);

        let km = haversine_km(cape_town, johannesburg);
        assert!((km - 1262.0).abs() < 15.0, "got {km}");
    }

    #[test]
    fn distance_is_symmetric() {
        let a = LatLng::new(-33.906, 18.419);
        let b = LatLng::new(-33.971, 18.602);
        assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-12);
    }
}
