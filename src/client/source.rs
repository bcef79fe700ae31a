use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::api::ErrorResponse;
use crate::models::DeparturesEnvelope;
use crate::routes::{DirectionKey, RouteKey};

#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Message from the gateway's error body, or a generic status message
    #[error("{0}")]
    Api(String),
    #[error("Kunne ikke hente ferjetider akkurat nå ({0}).")]
    Network(String),
}

/// Where the refresh controller gets its departures from
#[async_trait]
pub trait DeparturesSource: Send + Sync {
    async fn fetch_departures(
        &self,
        route: RouteKey,
        direction: DirectionKey,
        limit: usize,
    ) -> Result<DeparturesEnvelope, FetchError>;
}

/// Talks to the departures gateway over HTTP
#[derive(Debug, Clone)]
pub struct HttpDeparturesSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDeparturesSource {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn departures_url(&self, route: RouteKey, direction: DirectionKey, limit: usize) -> String {
        format!(
            "{}/api/departures?route={}&direction={}&limit={}",
            self.base_url,
            urlencoding::encode(route.as_str()),
            urlencoding::encode(direction.as_str()),
            limit
        )
    }

    async fn get(
        &self,
        route: RouteKey,
        direction: DirectionKey,
        limit: usize,
    ) -> Result<DeparturesEnvelope, FetchError> {
        let url = self.departures_url(route, direction, limit);
        debug!(url = %url, "Fetching departures");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorResponse>().await {
                Ok(body) if !body.error.is_empty() => body.error,
                _ => format!("API-feil ({})", status.as_u16()),
            };
            return Err(FetchError::Api(message));
        }

        response
            .json::<DeparturesEnvelope>()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))
    }
}

#[async_trait]
impl DeparturesSource for HttpDeparturesSource {
    async fn fetch_departures(
        &self,
        route: RouteKey,
        direction: DirectionKey,
        limit: usize,
    ) -> Result<DeparturesEnvelope, FetchError> {
        self.get(route, direction, limit).await
    }
}
