use std::env;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::api::PricingProvider;
use crate::entities::{LatLng, Quote, QuoteRequest};
use crate::error::QuoteError;
use crate::pricing::{build_quote, RateTable};

#[derive(Clone, Debug, Deserialize)]
struct Response {
    status: String,
    rows: Vec<Row>,
}

#[derive(Clone, Debug, Deserialize)]
struct Row {
    elements: Vec<Element>,
}

#[derive(Clone, Debug, Deserialize)]
struct Element {
    status: String,
    distance: Option<Measurement>,
    duration: Option<Measurement>,
    duration_in_traffic: Option<Measurement>,
}

#[derive(Clone, Debug, Deserialize)]
struct Measurement {
    value: f64,
}

/// Distance-matrix-backed provider: real road distance and (traffic-aware)
/// duration from an external matrix endpoint, priced with the same rate
/// table as every other provider.
pub struct DistanceMatrixProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    rates: RateTable,
}

impl DistanceMatrixProvider {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        rates: RateTable,
        timeout: Duration,
    ) -> Result<Self, QuoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| QuoteError::NotConfigured(err.to_string()))?;

        Ok(Self {
            client,
            api_base: api_base.into(),
            api_key: api_key.into(),
            rates,
        })
    }

    pub fn from_env(rates: RateTable, timeout: Duration) -> Result<Self, QuoteError> {
        let api_base = env::var("DISTANCE_MATRIX_API_BASE")?;
        let api_key = env::var("DISTANCE_MATRIX_API_KEY")?;

        Self::new(api_base, api_key, rates, timeout)
    }

    fn format_point(point: LatLng) -> String {
        format!("{},{}", point.lat, point.lng)
    }
}

#[async_trait]
impl PricingProvider for DistanceMatrixProvider {
    #[tracing::instrument(skip(self))]
    async fn get_quote(&self, request: &QuoteRequest) -> Result<Quote, QuoteError> {
        let url = format!("https://{}/maps/api/distancematrix/json", self.api_base);

        let res = self
            .client
            .get(url)
            .query(&[("key", self.api_key.as_str())])
            .query(&[("origins", Self::format_point(request.origin))])
            .query(&[("destinations", Self::format_point(request.destination))])
            .query(&[("mode", "driving"), ("departure_time", "now")])
            .send()
            .await?;

        let status_code = res.status().as_u16();

        if status_code != 200 {
            return Err(QuoteError::ProviderUnavailable(format!(
                "matrix endpoint returned {status_code}"
            )));
        }

        let data: Response = res.json().await?;

        if data.status != "OK" {
            return Err(QuoteError::ProviderUnavailable(format!(
                "matrix response status {}",
                data.status
            )));
        }

        let element = data
            .rows
            .first()
            .and_then(|row| row.elements.first())
            .ok_or(QuoteError::NoRoute)?;

        match element.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" | "NOT_FOUND" => return Err(QuoteError::NoRoute),
            other => {
                return Err(QuoteError::ProviderUnavailable(format!(
                    "matrix element status {other}"
                )))
            }
        }

        let distance = element.distance.as_ref().ok_or(QuoteError::NoRoute)?;
        let duration = element
            .duration_in_traffic
            .as_ref()
            .or(element.duration.as_ref())
            .ok_or(QuoteError::NoRoute)?;

        let km = distance.value / 1000.0;
        let min = duration.value / 60.0;

        Ok(build_quote(request.ride_type, km, min, &self.rates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_matrix_envelope() {
        let raw = r#"{
            "status": "OK",
            "rows": [{
                "elements": [{
                    "status": "OK",
                    "distance": { "value": 21300 },
                    "duration": { "value": 2700 },
                    "duration_in_traffic": { "value": 3000 }
                }]
            }]
        }"#;

        let data: Response = serde_json::from_str(raw).unwrap();
        let element = &data.rows[0].elements[0];

        assert_eq!(data.status, "OK");
        assert_eq!(element.distance.as_ref().unwrap().value, 21300.0);
        assert_eq!(element.duration_in_traffic.as_ref().unwrap().value, 3000.0);
    }

    #[test]
    fn parses_element_without_traffic_duration() {
        let raw = r#"{
            "status": "OK",
            "rows": [{
                "elements": [{
                    "status": "ZERO_RESULTS"
                }]
            }]
        }"#;

        let data: Response = serde_json::from_str(raw).unwrap();
        let element = &data.rows[0].elements[0];

        assert_eq!(element.status, "ZERO_RESULTS");
        assert!(element.distance.is_none());
        assert!(element.duration_in_traffic.is_none());
    }

    #[test]
    fn explicit_construction_needs_no_environment() {
        let provider = DistanceMatrixProvider::new(
            "maps.example.test",
            "test-key",
            RateTable::default(),
            Duration::from_secs(10),
        )
        .unwrap();

        assert_eq!(provider.api_base, "maps.example.test");
    }

    #[test]
    fn missing_configuration_maps_to_not_configured() {
        let err = QuoteError::from(env::VarError::NotPresent);
        assert!(matches!(err, QuoteError::NotConfigured(_)));
    }
}
