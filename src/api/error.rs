use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::providers::entur::UpstreamError;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unknown route, unknown direction, or a direction from another route
    #[error("Ugyldig forespørsel. Bruk gyldig route/direction og valgfri limit.")]
    InvalidRequest,
    #[error("Kunne ikke hente live-data fra Entur akkurat nå ({0}).")]
    Upstream(#[from] UpstreamError),
    #[error("Kun GET er støttet for dette endepunktet.")]
    MethodNotAllowed,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        match self {
            ApiError::MethodNotAllowed => (status, [(header::ALLOW, "GET")], body).into_response(),
            _ => (status, body).into_response(),
        }
    }
}
