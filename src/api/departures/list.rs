use axum::{
    Json,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};
use utoipa::IntoParams;

use crate::api::{ApiError, AppState, ErrorResponse};
use crate::models::DeparturesEnvelope;
use crate::providers::entur::EstimatedCallSource;
use crate::routes::{self, DirectionKey, RouteDirection, RouteKey};
use crate::services::departures::build_departures;

pub const DEFAULT_LIMIT: usize = 6;
pub const MAX_LIMIT: usize = 12;
/// Lower bound on calls requested upstream, whatever the limit
const MIN_FETCH: usize = 12;
/// Over-fetch to compensate for calls towards other destinations
const FETCH_FACTOR: usize = 3;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DeparturesQuery {
    /// Route key, e.g. "halhjem_sandvikvag"
    pub route: Option<String>,
    /// Direction key belonging to the route, e.g. "halhjem_to_sandvikvag"
    pub direction: Option<String>,
    /// Number of departures, 1-12 (default 6)
    pub limit: Option<String>,
}

impl DeparturesQuery {
    /// Build from raw query pairs. When a key is repeated the first value wins.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "route" => &mut query.route,
                "direction" => &mut query.direction,
                "limit" => &mut query.limit,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        query
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParsedRequest {
    pub route_key: RouteKey,
    pub direction_key: DirectionKey,
    pub limit: usize,
    pub direction: &'static RouteDirection,
}

/// Parse the leading integer of `raw`, falling back to the default when there is none
pub fn parse_limit(raw: Option<&str>) -> usize {
    let Some(raw) = raw else {
        return DEFAULT_LIMIT;
    };

    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };

    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..end];
    if digits.is_empty() {
        return DEFAULT_LIMIT;
    }
    if negative {
        return 1;
    }

    // Overflow only happens for absurdly large values, which clamp to the max anyway
    let value = digits.parse::<u64>().unwrap_or(u64::MAX);
    value.clamp(1, MAX_LIMIT as u64) as usize
}

pub fn parse_request(query: &DeparturesQuery) -> Result<ParsedRequest, ApiError> {
    let route_key = query
        .route
        .as_deref()
        .and_then(RouteKey::parse)
        .ok_or(ApiError::InvalidRequest)?;
    let direction_key = query
        .direction
        .as_deref()
        .and_then(DirectionKey::parse)
        .ok_or(ApiError::InvalidRequest)?;
    let direction = routes::direction(route_key, direction_key).ok_or(ApiError::InvalidRequest)?;

    Ok(ParsedRequest {
        route_key,
        direction_key,
        limit: parse_limit(query.limit.as_deref()),
        direction,
    })
}

/// Number of calls to request upstream for a given display limit
pub fn fetch_size(limit: usize) -> usize {
    (limit * FETCH_FACTOR).max(MIN_FETCH)
}

/// Fetch, normalize and wrap departures for an already validated request
pub async fn load_departures(
    source: &dyn EstimatedCallSource,
    request: &ParsedRequest,
    now: DateTime<Utc>,
) -> Result<DeparturesEnvelope, ApiError> {
    let calls = source
        .estimated_calls(request.direction.from_stop_place_id, fetch_size(request.limit))
        .await
        .map_err(|e| {
            warn!(
                route = %request.route_key,
                direction = %request.direction_key,
                error = %e,
                "Upstream fetch failed"
            );
            ApiError::from(e)
        })?;

    let departures = build_departures(&calls, request.direction, request.limit, now);

    info!(
        route = %request.route_key,
        direction = %request.direction_key,
        calls = calls.len(),
        departures = departures.len(),
        "Built departures"
    );

    Ok(DeparturesEnvelope::live(
        request.route_key,
        request.direction_key,
        departures,
        now,
    ))
}

/// Upcoming departures for one direction of a ferry route
#[utoipa::path(
    get,
    path = "/api/departures",
    params(DeparturesQuery),
    responses(
        (status = 200, description = "Upcoming departures, soonest first", body = DeparturesEnvelope),
        (status = 400, description = "Invalid route, direction or limit", body = ErrorResponse),
        (status = 405, description = "Only GET is supported", body = ErrorResponse),
        (status = 502, description = "Live data could not be fetched upstream", body = ErrorResponse)
    ),
    tag = "departures"
)]
pub async fn get_departures(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, ApiError> {
    let query = DeparturesQuery::from_pairs(pairs);
    let request = parse_request(&query).inspect_err(|_| {
        debug!(?query, "Rejected departures request");
    })?;

    let envelope = load_departures(state.source.as_ref(), &request, Utc::now()).await?;

    Ok((
        [(header::CACHE_CONTROL, state.cache_headers.header_value())],
        Json(envelope),
    ))
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
