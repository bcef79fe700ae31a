use axum::http::{HeaderValue, Method, header};
use std::path::Path;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ferjetider::api::{self, AppState};
use ferjetider::config::Config;
use ferjetider::providers::entur::EnturClient;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ferjetider=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ferjetider departures server");

    let config_path =
        std::env::var("FERJETIDER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = if Path::new(&config_path).exists() {
        info!(path = %config_path, "Loading configuration");
        Config::load(&config_path)?
    } else {
        info!(path = %config_path, "No configuration file found, using defaults");
        Config::default()
    }
    .with_env_overrides();

    let entur = EnturClient::new(&config.entur)?;
    info!(
        endpoint = %config.entur.endpoint,
        client_name = %config.entur.client_name,
        "Configured Entur client"
    );

    let state = AppState {
        source: Arc::new(entur),
        cache_headers: config.cache,
    };

    let cors = if config.cors_permissive {
        warn!("CORS is permissive, allowing any origin");
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        CorsLayer::new().allow_origin(origins)
    }
    .allow_methods([Method::GET])
    .allow_headers([header::CONTENT_TYPE]);

    let app = api::app(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening");

    axum::serve(listener, app).await?;

    Ok(())
}
