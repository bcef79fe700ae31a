use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::routes::{DirectionKey, RouteKey};

/// A single upcoming ferry departure, ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Departure {
    /// Departure instant as reported upstream (expected if known, otherwise aimed)
    pub departure_time_iso: String,
    /// "HH:mm" in Norwegian local time, or "--:--"
    pub display_time: String,
    pub minutes_until: i64,
    pub destination: String,
    pub quay: String,
    pub realtime: bool,
}

/// Response body of the departures endpoint, and the unit stored in the client cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeparturesEnvelope {
    pub route_key: RouteKey,
    pub direction_key: DirectionKey,
    pub updated_at: String,
    /// True when the payload is replayed from a saved copy instead of fetched live
    pub is_fallback: bool,
    pub departures: Vec<Departure>,
}

impl DeparturesEnvelope {
    pub fn live(
        route_key: RouteKey,
        direction_key: DirectionKey,
        departures: Vec<Departure>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            route_key,
            direction_key,
            updated_at: to_iso(now),
            is_fallback: false,
            departures,
        }
    }

    /// The same payload, marked as replayed from cache
    pub fn into_fallback(self) -> Self {
        Self {
            is_fallback: true,
            ..self
        }
    }
}

/// ISO 8601 with millisecond precision and a `Z` suffix
pub fn to_iso(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}
