use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Which `PricingProvider` implementation the application runs with.
/// Selected once here, never branched on by callers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PricingBackend {
    #[default]
    Haversine,
    DistanceMatrix,
}

impl FromStr for PricingBackend {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "haversine" => Ok(Self::Haversine),
            "distance_matrix" => Ok(Self::DistanceMatrix),
            other => Err(ConfigError::Invalid(format!(
                "unknown pricing backend: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub pricing_backend: PricingBackend,
    pub debounce_ms: u64,
    pub quote_timeout_secs: u64,
    pub snapshot_timeout_secs: u64,
    pub dispatch_timeout_secs: u64,
    pub event_log_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pricing_backend: PricingBackend::Haversine,
            debounce_ms: 350,
            quote_timeout_secs: 10,
            snapshot_timeout_secs: 10,
            dispatch_timeout_secs: 10,
            event_log_limit: 20,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv::dotenv();

        let defaults = Self::default();

        Ok(Self {
            pricing_backend: parse_or("VIATOR_PRICING_BACKEND", defaults.pricing_backend)?,
            debounce_ms: parse_or("VIATOR_DEBOUNCE_MS", defaults.debounce_ms)?,
            quote_timeout_secs: parse_or("VIATOR_QUOTE_TIMEOUT_SECS", defaults.quote_timeout_secs)?,
            snapshot_timeout_secs: parse_or(
                "VIATOR_SNAPSHOT_TIMEOUT_SECS",
                defaults.snapshot_timeout_secs,
            )?,
            dispatch_timeout_secs: parse_or(
                "VIATOR_DISPATCH_TIMEOUT_SECS",
                defaults.dispatch_timeout_secs,
            )?,
            event_log_limit: parse_or("VIATOR_EVENT_LOG_LIMIT", defaults.event_log_limit)?,
        })
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn quote_timeout(&self) -> Duration {
        Duration::from_secs(self.quote_timeout_secs)
    }

    pub fn snapshot_timeout(&self) -> Duration {
        Duration::from_secs(self.snapshot_timeout_secs)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| ConfigError::Invalid(format!("{key}: {err}"))),
        Err(_) => Ok(default),
    }
}
