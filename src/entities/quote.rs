use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::LatLng;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideType {
    #[default]
    Economy,
    Xl,
    Delivery,
}

/// Per-line fare amounts. `per_km` and `per_min` are extended amounts
/// (rate multiplied by quantity), not unit rates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteBreakdown {
    pub base: f64,
    pub per_km: f64,
    pub per_min: f64,
    pub fees: f64,
    pub tax: f64,
    pub promo: f64,
}

/// An ephemeral price/time estimate. Never mutated; a newer quote supersedes
/// it wholesale. Only the external confirmation procedure gives it any life
/// beyond the session that requested it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: String,
    pub amount: f64,
    pub currency: String,
    pub distance_km: f64,
    pub duration_min: f64,
    pub breakdown: QuoteBreakdown,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polyline: Option<String>,
}

impl Quote {
    pub fn new_id() -> String {
        format!("q_{}", Uuid::new_v4())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub origin: LatLng,
    pub destination: LatLng,
    pub ride_type: RideType,
    pub scheduled_at: Option<DateTime<Utc>>,
}
