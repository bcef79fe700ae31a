pub mod departures;
pub mod error;
pub mod routes;

pub use error::{ApiError, ErrorResponse};

use axum::Router;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CacheHeaderConfig;
use crate::models::{Departure, DeparturesEnvelope};
use crate::providers::entur::EstimatedCallSource;
use crate::routes::{DirectionKey, RouteKey};

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn EstimatedCallSource>,
    pub cache_headers: CacheHeaderConfig,
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Ferjetider API", description = "Upcoming ferry departures from Entur"),
    paths(departures::list::get_departures, routes::list::list_routes),
    components(schemas(
        Departure,
        DeparturesEnvelope,
        ErrorResponse,
        RouteKey,
        DirectionKey,
        routes::list::RouteListResponse,
        routes::list::RouteSummary,
        routes::list::DirectionSummary,
    )),
    tags(
        (name = "departures", description = "Normalized departure boards"),
        (name = "routes", description = "Configured ferry routes")
    )
)]
pub struct ApiDoc;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/departures", departures::router(state))
        .nest("/routes", routes::router())
}

/// Full application: the API under `/api` plus Swagger UI
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", router(state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
