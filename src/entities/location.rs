use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A point as the rider selected it: a human-readable description plus coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub description: String,
    pub position: LatLng,
}

impl Place {
    pub fn new(description: impl Into<String>, position: LatLng) -> Self {
        Self {
            description: description.into(),
            position,
        }
    }
}
