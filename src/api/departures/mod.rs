pub mod list;

pub use list::*;

use axum::{Router, routing::get};

use crate::api::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        // HEAD would otherwise be served by the GET handler
        .route(
            "/",
            get(get_departures)
                .head(method_not_allowed)
                .fallback(method_not_allowed),
        )
        .with_state(state)
}
