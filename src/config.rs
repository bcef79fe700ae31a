use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_ENTUR_ENDPOINT: &str = "https://api.entur.io/journey-planner/v3/graphql";
pub const DEFAULT_CLIENT_NAME: &str = "ferjetider-app";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default)]
    pub entur: EnturConfig,
    #[serde(default)]
    pub cache: CacheHeaderConfig,
    /// Allowed CORS origins. Required unless cors_permissive is true.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Explicitly allow all origins (development only). Defaults to false.
    #[serde(default)]
    pub cors_permissive: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnturConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Sent as `ET-Client-Name`. Overridden by the ENTUR_CLIENT_NAME environment variable.
    #[serde(default = "default_client_name")]
    pub client_name: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Lifetimes advertised to caching proxies in front of the departures endpoint
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CacheHeaderConfig {
    #[serde(default = "default_s_maxage")]
    pub s_maxage_secs: u32,
    #[serde(default = "default_stale_while_revalidate")]
    pub stale_while_revalidate_secs: u32,
}

impl CacheHeaderConfig {
    pub fn header_value(&self) -> String {
        format!(
            "s-maxage={}, stale-while-revalidate={}",
            self.s_maxage_secs, self.stale_while_revalidate_secs
        )
    }
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENTUR_ENDPOINT.to_string()
}

fn default_client_name() -> String {
    DEFAULT_CLIENT_NAME.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_s_maxage() -> u32 {
    30
}

fn default_stale_while_revalidate() -> u32 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            entur: EnturConfig::default(),
            cache: CacheHeaderConfig::default(),
            cors_origins: Vec::new(),
            cors_permissive: false,
        }
    }
}

impl Default for EnturConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            client_name: default_client_name(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for CacheHeaderConfig {
    fn default() -> Self {
        Self {
            s_maxage_secs: default_s_maxage(),
            stale_while_revalidate_secs: default_stale_while_revalidate(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Apply environment overrides on top of the file values
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(name) = std::env::var("ENTUR_CLIENT_NAME") {
            if !name.trim().is_empty() {
                self.entur.client_name = name;
            }
        }
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse config: {0}")]
    ParseError(String),
}
