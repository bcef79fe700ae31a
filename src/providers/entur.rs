/// Entur Journey Planner API client
///
/// Entur publishes real-time and planned departures for all Norwegian public
/// transport, including the ferry crossings, through a GraphQL endpoint.
///
/// ## Endpoint
/// `https://api.entur.io/journey-planner/v3/graphql` (POST, JSON body)
///
/// Every request must carry an `ET-Client-Name` header identifying the
/// consumer, e.g. `ferjetider-app`.
///
/// ## Query
///
/// ```graphql
/// query EstimatedCalls($stopPlaceId: String!, $numberOfDepartures: Int!) {
///   stopPlace(id: $stopPlaceId) {
///     estimatedCalls(numberOfDepartures: $numberOfDepartures) { ... }
///   }
/// }
/// ```
///
/// - `stopPlaceId` - NSR stop place, e.g. "NSR:StopPlace:58463" (Halhjem)
/// - `numberOfDepartures` - upper bound on calls returned
///
/// ## Estimated call fields
/// - `realtime` - whether `expectedDepartureTime` comes from live data
/// - `aimedDepartureTime` - scheduled departure (ISO 8601 with offset)
/// - `expectedDepartureTime` - live estimate, may be absent
/// - `destinationDisplay.frontText` - destination as shown on the vessel
/// - `quay.id` / `quay.name` - berth at the terminal
///
/// ## Errors
/// GraphQL errors arrive with HTTP 200 and a non-empty top-level `errors`
/// array; they are treated the same as a failed transport.
///
/// A stop place feed reports calls towards every destination served from
/// that terminal, so callers filter by destination afterwards.
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::EnturConfig;

const ESTIMATED_CALLS_QUERY: &str = r#"
  query EstimatedCalls($stopPlaceId: String!, $numberOfDepartures: Int!) {
    stopPlace(id: $stopPlaceId) {
      id
      name
      estimatedCalls(numberOfDepartures: $numberOfDepartures) {
        realtime
        aimedDepartureTime
        expectedDepartureTime
        destinationDisplay {
          frontText
        }
        quay {
          id
          name
        }
      }
    }
  }
"#;

/// One estimated call exactly as reported upstream. Nothing here is trusted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCall {
    pub realtime: Option<bool>,
    pub aimed_departure_time: Option<String>,
    pub expected_departure_time: Option<String>,
    pub destination_front_text: Option<String>,
    pub quay_id: Option<String>,
    pub quay_name: Option<String>,
}

impl RawCall {
    /// Extract a call from its JSON node. Fields with an unexpected JSON type
    /// are treated as absent.
    pub fn from_value(call: &Value) -> Self {
        let string_at = |pointer: &str| {
            call.pointer(pointer)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        };

        Self {
            realtime: call.get("realtime").and_then(|v| v.as_bool()),
            aimed_departure_time: string_at("/aimedDepartureTime"),
            expected_departure_time: string_at("/expectedDepartureTime"),
            destination_front_text: string_at("/destinationDisplay/frontText"),
            quay_id: string_at("/quay/id"),
            quay_name: string_at("/quay/name"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("{0}")]
    Network(String),
    #[error("Entur svarte med status {0}")]
    Status(u16),
    #[error("Entur GraphQL-feil: {0}")]
    GraphQl(String),
    #[error("Ugyldig svar fra Entur: {0}")]
    Decode(String),
}

/// Pull the estimated calls out of a GraphQL response body.
///
/// A missing stop place or call list is an empty result, not an error.
pub fn extract_estimated_calls(payload: &Value) -> Result<Vec<RawCall>, UpstreamError> {
    if let Some(errors) = payload.get("errors").and_then(|e| e.as_array()) {
        if let Some(first) = errors.first() {
            let message = first
                .get("message")
                .and_then(|m| m.as_str())
                .filter(|m| !m.is_empty())
                .unwrap_or("Ukjent GraphQL-feil");
            return Err(UpstreamError::GraphQl(message.to_string()));
        }
    }

    let calls = payload
        .pointer("/data/stopPlace/estimatedCalls")
        .and_then(|c| c.as_array())
        .map(|calls| calls.iter().map(RawCall::from_value).collect())
        .unwrap_or_default();

    Ok(calls)
}

/// Anything that can report estimated calls for a stop place
#[async_trait]
pub trait EstimatedCallSource: Send + Sync {
    async fn estimated_calls(
        &self,
        stop_place_id: &str,
        number_of_departures: usize,
    ) -> Result<Vec<RawCall>, UpstreamError>;
}

#[derive(Debug, Clone)]
pub struct EnturClient {
    client: reqwest::Client,
    endpoint: String,
    client_name: String,
}

impl EnturClient {
    pub fn new(config: &EnturConfig) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| UpstreamError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            client_name: config.client_name.clone(),
        })
    }

    /// Fetch estimated calls for a stop place
    pub async fn fetch_estimated_calls(
        &self,
        stop_place_id: &str,
        number_of_departures: usize,
    ) -> Result<Vec<RawCall>, UpstreamError> {
        debug!(
            endpoint = %self.endpoint,
            stop_place_id = %stop_place_id,
            number_of_departures,
            "Fetching estimated calls"
        );

        let body = json!({
            "query": ESTIMATED_CALLS_QUERY,
            "variables": {
                "stopPlaceId": stop_place_id,
                "numberOfDepartures": number_of_departures,
            },
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("ET-Client-Name", &self.client_name)
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        let calls = extract_estimated_calls(&payload)?;

        info!(
            stop_place_id = %stop_place_id,
            calls = calls.len(),
            "Retrieved estimated calls"
        );

        Ok(calls)
    }
}

#[async_trait]
impl EstimatedCallSource for EnturClient {
    async fn estimated_calls(
        &self,
        stop_place_id: &str,
        number_of_departures: usize,
    ) -> Result<Vec<RawCall>, UpstreamError> {
        self.fetch_estimated_calls(stop_place_id, number_of_departures).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::State,
        http::{HeaderMap, StatusCode},
        routing::post,
    };
    use std::sync::{Arc, Mutex};

    /// What the fake GraphQL endpoint received
    #[derive(Default)]
    struct Received {
        client_name: Option<String>,
        body: Option<Value>,
    }

    async fn record(
        State(received): State<Arc<Mutex<Received>>>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        {
            let mut received = received.lock().unwrap();
            received.client_name = headers
                .get("ET-Client-Name")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            received.body = Some(body);
        }

        Json(json!({
            "data": {
                "stopPlace": {
                    "estimatedCalls": [{
                        "realtime": false,
                        "aimedDepartureTime": "2026-02-22T11:05:00+01:00",
                        "destinationDisplay": { "frontText": "Mortavika" },
                        "quay": { "id": "NSR:Quay:2", "name": "Arsvågen ferjekai" }
                    }]
                }
            }
        }))
    }

    /// Serve `app` on an ephemeral local port and return a client pointed at it
    async fn client_for(app: Router) -> EnturClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        EnturClient::new(&EnturConfig {
            endpoint: format!("http://{}/graphql", addr),
            client_name: "ferjetider-test".to_string(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn posts_query_with_client_name_header() {
        let received = Arc::new(Mutex::new(Received::default()));
        let app = Router::new()
            .route("/graphql", post(record))
            .with_state(received.clone());
        let client = client_for(app).await;

        let calls = client.estimated_calls("NSR:StopPlace:58499", 18).await.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].destination_front_text.as_deref(), Some("Mortavika"));
        assert_eq!(calls[0].quay_id.as_deref(), Some("NSR:Quay:2"));

        let received = received.lock().unwrap();
        assert_eq!(received.client_name.as_deref(), Some("ferjetider-test"));
        let body = received.body.as_ref().unwrap();
        assert!(body["query"].as_str().unwrap().contains("estimatedCalls"));
        assert_eq!(body["variables"]["stopPlaceId"], "NSR:StopPlace:58499");
        assert_eq!(body["variables"]["numberOfDepartures"], 18);
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let app = Router::new().route("/graphql", post(|| async { StatusCode::SERVICE_UNAVAILABLE }));
        let client = client_for(app).await;

        let err = client.estimated_calls("NSR:StopPlace:58499", 12).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status(503)));
        assert_eq!(err.to_string(), "Entur svarte med status 503");
    }

    #[tokio::test]
    async fn graphql_errors_in_ok_response_fail() {
        let app = Router::new().route(
            "/graphql",
            post(|| async { Json(json!({ "errors": [{ "message": "Invalid stop place" }] })) }),
        );
        let client = client_for(app).await;

        let err = client.estimated_calls("NSR:StopPlace:0", 12).await.unwrap_err();
        assert!(matches!(err, UpstreamError::GraphQl(_)));
        assert_eq!(err.to_string(), "Entur GraphQL-feil: Invalid stop place");
    }

    #[tokio::test]
    async fn unreadable_body_is_a_decode_error() {
        let app = Router::new().route("/graphql", post(|| async { "<html>maintenance</html>" }));
        let client = client_for(app).await;

        let err = client.estimated_calls("NSR:StopPlace:58499", 12).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Decode(_)));
    }

    #[test]
    fn extracts_calls_from_graphql_payload() {
        let payload = json!({
            "data": {
                "stopPlace": {
                    "id": "NSR:StopPlace:58463",
                    "name": "Halhjem ferjekai",
                    "estimatedCalls": [
                        {
                            "realtime": true,
                            "aimedDepartureTime": "2026-02-22T11:05:00+01:00",
                            "expectedDepartureTime": "2026-02-22T11:07:00+01:00",
                            "destinationDisplay": { "frontText": "Sandvikvåg" },
                            "quay": { "id": "NSR:Quay:1", "name": "Halhjem ferjekai" }
                        },
                        {
                            "aimedDepartureTime": "2026-02-22T11:45:00+01:00",
                            "destinationDisplay": null,
                            "quay": null
                        }
                    ]
                }
            }
        });

        let calls = extract_estimated_calls(&payload).unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].realtime, Some(true));
        assert_eq!(calls[0].expected_departure_time.as_deref(), Some("2026-02-22T11:07:00+01:00"));
        assert_eq!(calls[0].destination_front_text.as_deref(), Some("Sandvikvåg"));
        assert_eq!(calls[0].quay_id.as_deref(), Some("NSR:Quay:1"));
        assert_eq!(calls[1].realtime, None);
        assert_eq!(calls[1].destination_front_text, None);
        assert_eq!(calls[1].quay_name, None);
    }

    #[test]
    fn wrongly_typed_fields_are_treated_as_absent() {
        let call = RawCall::from_value(&json!({
            "realtime": "yes",
            "aimedDepartureTime": 1700000000,
            "expectedDepartureTime": "2026-02-22T11:07:00+01:00",
            "destinationDisplay": "Bergen",
            "quay": { "name": 3 }
        }));

        assert_eq!(call.realtime, None);
        assert_eq!(call.aimed_departure_time, None);
        assert_eq!(call.expected_departure_time.as_deref(), Some("2026-02-22T11:07:00+01:00"));
        assert_eq!(call.destination_front_text, None);
        assert_eq!(call.quay_name, None);
    }

    #[test]
    fn missing_stop_place_is_empty_not_error() {
        let calls = extract_estimated_calls(&json!({ "data": { "stopPlace": null } })).unwrap();
        assert!(calls.is_empty());
        let calls = extract_estimated_calls(&json!({})).unwrap();
        assert!(calls.is_empty());
    }

    #[test]
    fn graphql_errors_fail_the_fetch() {
        let err = extract_estimated_calls(&json!({
            "errors": [{ "message": "Stop place not found" }],
            "data": null
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "Entur GraphQL-feil: Stop place not found");

        let err = extract_estimated_calls(&json!({ "errors": [{}] })).unwrap_err();
        assert_eq!(err.to_string(), "Entur GraphQL-feil: Ukjent GraphQL-feil");
    }

    #[test]
    fn empty_error_list_is_success() {
        let calls = extract_estimated_calls(&json!({
            "errors": [],
            "data": { "stopPlace": { "estimatedCalls": [] } }
        }))
        .unwrap();
        assert!(calls.is_empty());
    }
}
