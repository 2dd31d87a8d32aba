//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::security::SigningKey;

/// Root configuration for the image proxy service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address, concurrency).
    pub listener: ListenerConfig,

    /// Image proxy pipeline settings.
    pub proxy: ProxyConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum requests served concurrently (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 1024,
        }
    }
}

/// Image proxy pipeline settings. Immutable after load.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Name of the environment variable holding the signing secret.
    pub secret_env: String,

    /// Signing secret, filled from `secret_env` by the loader.
    #[serde(skip)]
    pub secret: Option<SigningKey>,

    /// Hard cap on relayed body bytes.
    pub max_body_bytes: u64,

    /// Budget for DNS, all redirect hops and the body relay, in seconds.
    pub fetch_timeout_secs: u64,

    /// Maximum redirects followed per request.
    pub max_redirects: u32,

    /// Hosts (and their subdomains) that are linked directly, never proxied.
    pub trusted_domains: Vec<String>,

    /// `max-age` / `s-maxage` for successful responses.
    pub cache_max_age_secs: u64,

    /// Route the proxy handler is mounted on.
    pub endpoint_path: String,

    /// Optional origin prepended to generated links (e.g. "https://app.example").
    pub public_base_url: String,

    /// User-Agent sent upstream.
    pub user_agent: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            secret_env: "IMAGE_PROXY_SECRET".to_string(),
            secret: None,
            max_body_bytes: 10 * 1024 * 1024, // 10MB
            fetch_timeout_secs: 10,
            max_redirects: 5,
            trusted_domains: vec!["raw.githubusercontent.com".to_string()],
            cache_max_age_secs: 86_400,
            endpoint_path: "/image-proxy".to_string(),
            public_base_url: String::new(),
            user_agent: concat!("image-proxy/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ProxyConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn signing_key(&self) -> Option<&SigningKey> {
        self.secret.as_ref()
    }

    /// Endpoint used in generated links.
    pub fn link_endpoint(&self) -> String {
        format!("{}{}", self.public_base_url.trim_end_matches('/'), self.endpoint_path)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
