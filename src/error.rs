use std::env;

use thiserror::Error;

/// Quote failures are recoverable: the session surfaces them as a retryable
/// message and never crashes.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum QuoteError {
    #[error("no route between the requested points")]
    NoRoute,

    #[error("pricing provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("pricing provider timed out")]
    Timeout,

    #[error("pricing provider not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for QuoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return QuoteError::Timeout;
        }

        QuoteError::ProviderUnavailable(err.to_string())
    }
}

impl From<env::VarError> for QuoteError {
    fn from(err: env::VarError) -> Self {
        QuoteError::NotConfigured(err.to_string())
    }
}

/// Snapshot failure is fatal to the tracking view; subscription failure
/// degrades it to a snapshot-only view instead.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TripStoreError {
    #[error("trip snapshot fetch failed: {0}")]
    SnapshotFailed(String),

    #[error("trip subscription failed: {0}")]
    SubscriptionFailed(String),
}

/// Never shown to the rider; always collapsed to a manual-dispatch fallback.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("dispatch unavailable: {0}")]
    Unavailable(String),

    #[error("dispatch timed out")]
    Timeout,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfirmError {
    #[error("quote has expired")]
    Expired,

    #[error("no quote to confirm")]
    NoQuote,

    #[error("quote confirmation failed: {0}")]
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
