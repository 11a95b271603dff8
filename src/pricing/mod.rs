mod haversine;

pub use haversine::{haversine_km, HaversineProvider};

use crate::api::DynPricingProvider;
use crate::config::{Config, PricingBackend};
use crate::entities::{Quote, QuoteBreakdown, RideType};
use crate::error::QuoteError;
use crate::external::DistanceMatrixProvider;

use std::sync::Arc;

/// Flat booking fee added to every quote.
pub const BOOKING_FEE: f64 = 2.5;

/// Tax applied to the fare subtotal.
pub const TAX_RATE: f64 = 0.15;

/// Distance floor: quotes never price a trip shorter than this.
pub const MIN_TRIP_KM: f64 = 0.6;

/// Duration floor, minutes.
pub const MIN_TRIP_MIN: f64 = 4.0;

/// Assumed average city speed for providers that estimate duration from
/// distance alone.
pub const CITY_SPEED_KMPH: f64 = 28.0;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RateRow {
    pub base: f64,
    pub per_km: f64,
    pub per_min: f64,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RateTable {
    pub economy: RateRow,
    pub xl: RateRow,
    pub delivery: RateRow,
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            economy: RateRow { base: 12.0, per_km: 9.5, per_min: 1.6 },
            xl: RateRow { base: 18.0, per_km: 12.0, per_min: 2.2 },
            delivery: RateRow { base: 15.0, per_km: 10.5, per_min: 1.8 },
        }
    }
}

impl RateTable {
    pub fn row(&self, ride_type: RideType) -> RateRow {
        match ride_type {
            RideType::Economy => self.economy,
            RideType::Xl => self.xl,
            RideType::Delivery => self.delivery,
        }
    }
}

pub fn round2(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Prices a trip from a raw distance/duration measurement. Floors both
/// inputs, then `amount = round2((base + per_km·km + per_min·min + fee)·1.15)`.
/// The breakdown keeps unrounded extended amounts; only the total, the
/// reported distance and the reported duration are rounded for display.
pub fn build_quote(ride_type: RideType, raw_km: f64, raw_min: f64, rates: &RateTable) -> Quote {
    let km = raw_km.max(MIN_TRIP_KM);
    let min = raw_min.max(MIN_TRIP_MIN);

    let row = rates.row(ride_type);
    let subtotal = row.base + row.per_km * km + row.per_min * min + BOOKING_FEE;
    let tax = subtotal * TAX_RATE;

    Quote {
        id: Quote::new_id(),
        amount: round2(subtotal + tax),
        currency: "ZAR".into(),
        distance_km: round2(km),
        duration_min: min.round(),
        breakdown: QuoteBreakdown {
            base: row.base,
            per_km: row.per_km * km,
            per_min: row.per_min * min,
            fees: BOOKING_FEE,
            tax,
            promo: 0.0,
        },
        expires_at: None,
        polyline: None,
    }
}

/// Builds the configured provider. The rest of the application holds it as
/// `DynPricingProvider` and never learns which implementation it got.
pub fn provider_from_config(config: &Config) -> Result<DynPricingProvider, QuoteError> {
    match config.pricing_backend {
        PricingBackend::Haversine => Ok(Arc::new(HaversineProvider::new(RateTable::default()))),
        PricingBackend::DistanceMatrix => Ok(Arc::new(DistanceMatrixProvider::from_env(
            RateTable::default(),
            config.quote_timeout(),
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::PricingProvider;
    use crate::entities::{LatLng, QuoteRequest};

    fn economy_request(origin: LatLng, destination: LatLng) -> QuoteRequest {
        QuoteRequest {
            origin,
            destination,
            ride_type: RideType::Economy,
            scheduled_at: None,
        }
    }

    #[test]
    fn amount_matches_formula_exactly() {
        let rates = RateTable::default();
        let km = 21.3;
        let min = 45.7;

        let quote = build_quote(RideType::Economy, km, min, &rates);

        let subtotal = 12.0 + 9.5 * km + 1.6 * min + BOOKING_FEE;
        assert_eq!(quote.amount, round2(subtotal * 1.15));
        assert_eq!(quote.breakdown.tax, subtotal * TAX_RATE);
        assert_eq!(quote.breakdown.promo, 0.0);
    }

    #[test]
    fn floors_apply_to_degenerate_trips() {
        let rates = RateTable::default();

        let quote = build_quote(RideType::Economy, 0.0, 0.0, &rates);

        assert_eq!(quote.distance_km, MIN_TRIP_KM);
        assert_eq!(quote.duration_min, MIN_TRIP_MIN);

        let subtotal = 12.0 + 9.5 * MIN_TRIP_KM + 1.6 * MIN_TRIP_MIN + BOOKING_FEE;
        assert_eq!(quote.amount, round2(subtotal * 1.15));
    }

    #[test]
    fn each_ride_type_uses_its_own_rate_row() {
        let rates = RateTable::default();

        let economy = build_quote(RideType::Economy, 10.0, 20.0, &rates);
        let xl = build_quote(RideType::Xl, 10.0, 20.0, &rates);
        let delivery = build_quote(RideType::Delivery, 10.0, 20.0, &rates);

        assert!(economy.amount < delivery.amount);
        assert!(delivery.amount < xl.amount);
        assert_eq!(xl.breakdown.base, 18.0);
        assert_eq!(delivery.breakdown.base, 15.0);
    }

    #[tokio::test]
    async fn cape_town_scenario_reproduces_bit_for_bit() {
        // Sea Point to Stellenbosch road, economy.
        let origin = LatLng::new(-33.906, 18.419);
        let destination = LatLng::new(-33.971, 18.602);

        let provider = HaversineProvider::new(RateTable::default());
        let quote = provider
            .get_quote(&economy_request(origin, destination))
            .await
            .unwrap();

        let km = haversine_km(origin, destination).max(MIN_TRIP_KM);
        let min = (km / CITY_SPEED_KMPH * 60.0).max(MIN_TRIP_MIN);
        let subtotal = 12.0 + 9.5 * km + 1.6 * min + BOOKING_FEE;
        assert_eq!(quote.amount, round2(subtotal * 1.15));

        // Straight-line distance across the Cape Flats is round 18 km; the
        // priced amount lands in the low 300s ZAR.
        assert!(km > 15.0 && km < 21.0, "unexpected distance {km}");
        assert!(quote.amount > 250.0 && quote.amount < 350.0);
    }

    #[tokio::test]
    async fn equal_inputs_price_identically() {
        let origin = LatLng::new(-33.906, 18.419);
        let destination = LatLng::new(-33.971, 18.602);
        let provider = HaversineProvider::new(RateTable::default());

        let first = provider
            .get_quote(&economy_request(origin, destination))
            .await
            .unwrap();
        let second = provider
            .get_quote(&economy_request(origin, destination))
            .await
            .unwrap();

        assert_eq!(first.amount, second.amount);
        assert_eq!(first.distance_km, second.distance_km);
        assert_eq!(first.duration_min, second.duration_min);
        assert_ne!(first.id, second.id, "quote ids are ephemeral and unique");
    }

    #[tokio::test]
    async fn quote_never_below_floors() {
        let point = LatLng::new(-33.906, 18.419);
        let provider = HaversineProvider::new(RateTable::default());

        let quote = provider
            .get_quote(&economy_request(point, point))
            .await
            .unwrap();

        assert!(quote.distance_km >= MIN_TRIP_KM);
        assert!(quote.duration_min >= MIN_TRIP_MIN);
    }
}
