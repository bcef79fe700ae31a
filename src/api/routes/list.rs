use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::routes::{DirectionKey, ROUTES, RouteConfig, RouteDirection, RouteKey};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectionSummary {
    pub key: DirectionKey,
    pub label: String,
    pub from_label: String,
    pub to_label: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RouteSummary {
    pub key: RouteKey,
    pub label: String,
    pub directions: Vec<DirectionSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RouteListResponse {
    pub routes: Vec<RouteSummary>,
}

impl From<&RouteDirection> for DirectionSummary {
    fn from(direction: &RouteDirection) -> Self {
        Self {
            key: direction.key,
            label: direction.label.to_string(),
            from_label: direction.from_label.to_string(),
            to_label: direction.to_label.to_string(),
        }
    }
}

impl From<&RouteConfig> for RouteSummary {
    fn from(route: &RouteConfig) -> Self {
        Self {
            key: route.key,
            label: route.label.to_string(),
            directions: route.directions.iter().map(DirectionSummary::from).collect(),
        }
    }
}

/// List the configured ferry routes and their directions
#[utoipa::path(
    get,
    path = "/api/routes",
    responses(
        (status = 200, description = "Configured routes", body = RouteListResponse)
    ),
    tag = "routes"
)]
pub async fn list_routes() -> Json<RouteListResponse> {
    Json(RouteListResponse {
        routes: ROUTES.iter().map(RouteSummary::from).collect(),
    })
}
