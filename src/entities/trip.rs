use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A confirmed, backend-owned ride or delivery. The backend is the sole
/// writer; this side only renders whatever row it last received.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub status: TripStatus,
    pub driver_id: Option<Uuid>,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub vehicle_make: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_registration: Option<String>,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Requested,
    Assigned,
    DriverEnroute,
    ArrivedPickup,
    OnTrip,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether `next` is reachable from `self` in the status graph:
    /// requested → assigned → driver_enroute → arrived_pickup → on_trip →
    /// completed, with cancelled reachable from any non-terminal state.
    pub fn can_transition_to(&self, next: TripStatus) -> bool {
        match (self, next) {
            (Self::Requested, Self::Assigned) => true,
            (Self::Assigned, Self::DriverEnroute) => true,
            (Self::DriverEnroute, Self::ArrivedPickup) => true,
            (Self::ArrivedPickup, Self::OnTrip) => true,
            (Self::OnTrip, Self::Completed) => true,
            (current, Self::Cancelled) => !current.is_terminal(),
            _ => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Assigned => "assigned",
            Self::DriverEnroute => "driver_enroute",
            Self::ArrivedPickup => "arrived_pickup",
            Self::OnTrip => "on_trip",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// An immutable, append-only timeline entry for a trip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TripEvent {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub event_type: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// How the backend is attempting to assign a driver to a new trip.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    Manual,
    Auto,
    Offers,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_chain_is_valid() {
        use TripStatus::*;

        let chain = [Requested, Assigned, DriverEnroute, ArrivedPickup, OnTrip, Completed];
        for pair in chain.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} should be valid",
                pair[0].name(),
                pair[1].name()
            );
        }
    }

    #[test]
    fn cancel_reachable_from_non_terminal_only() {
        use TripStatus::*;

        for status in [Requested, Assigned, DriverEnroute, ArrivedPickup, OnTrip] {
            assert!(status.can_transition_to(Cancelled));
        }
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Cancelled));
    }

    #[test]
    fn no_skipping_or_regressing() {
        use TripStatus::*;

        assert!(!Requested.can_transition_to(DriverEnroute));
        assert!(!OnTrip.can_transition_to(Requested));
        assert!(!Completed.can_transition_to(OnTrip));
        assert!(!Assigned.can_transition_to(Requested));
    }

    #[test]
    fn status_serializes_to_row_values() {
        let encoded = serde_json::to_string(&TripStatus::DriverEnroute).unwrap();
        assert_eq!(encoded, "\"driver_enroute\"");

        let decoded: TripStatus = serde_json::from_str("\"arrived_pickup\"").unwrap();
        assert_eq!(decoded, TripStatus::ArrivedPickup);
    }
}
