pub mod list;

use axum::Router;

pub fn router() -> Router {
    Router::new().route("/", axum::routing::get(list::list_routes))
}
