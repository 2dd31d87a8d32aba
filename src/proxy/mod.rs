//! Image proxy pipeline.
//!
//! # Data Flow
//! ```text
//! ProxyRequest { target_url, signature }
//!     → security::signature::verify   (403 on failure, no parsing yet)
//!     → security::guard::check_url     (scheme, local names, literal IPs)
//!     → net::resolver::check_host      (every DNS answer public)
//!     → upstream::RedirectFetcher      (per-hop re-validation, content checks)
//!     → relay::BoundedRelay            (byte cap, deadline, pull-driven)
//! ```
//!
//! # Design Decisions
//! - Only `ProxyConfig` is shared between requests, read-only
//! - One deadline per request covers DNS, every hop and the body

use std::sync::Arc;

use reqwest::Client;
use tokio::time::{timeout_at, Instant};

use crate::config::ProxyConfig;
use crate::net::resolver::{check_host, HostResolver, SystemResolver};
use crate::relay::BoundedRelay;
use crate::security::{guard, signature};
use crate::upstream::{client_builder, ProxyError, ProxyResult, RedirectFetcher};

/// Untrusted query parameters of one proxy request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    pub target_url: String,
    pub signature: String,
}

/// A validated image ready to be streamed to the client.
pub struct ProxiedImage {
    pub content_type: String,
    pub body: BoundedRelay,
}

impl std::fmt::Debug for ProxiedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxiedImage")
            .field("content_type", &self.content_type)
            .field("relay", &self.body.state())
            .finish()
    }
}

/// Request pipeline plus its read-only collaborators.
#[derive(Debug, Clone)]
pub struct ImageProxy {
    config: Arc<ProxyConfig>,
    resolver: Arc<dyn HostResolver>,
    client: Client,
}

impl ImageProxy {
    /// Production wiring: system DNS, pinned connections.
    pub fn new(config: ProxyConfig) -> Result<Self, reqwest::Error> {
        let resolver: Arc<dyn HostResolver> = Arc::new(SystemResolver);
        let client = client_builder(&config, Arc::clone(&resolver)).build()?;
        Ok(Self::with_parts(config, resolver, client))
    }

    /// Custom resolver and client. The client must not follow redirects;
    /// build it from [`client_builder`].
    pub fn with_parts(config: ProxyConfig, resolver: Arc<dyn HostResolver>, client: Client) -> Self {
        Self {
            config: Arc::new(config),
            resolver,
            client,
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Run the whole pipeline for one request.
    pub async fn serve(&self, request: ProxyRequest) -> ProxyResult<ProxiedImage> {
        // Unvalidated configs can reach here through `with_parts`.
        let deadline = Instant::now()
            .checked_add(self.config.fetch_timeout())
            .ok_or(ProxyError::Timeout)?;

        if !signature::verify(
            &request.target_url,
            Some(&request.signature),
            self.config.signing_key(),
        ) {
            return Err(ProxyError::Unauthorized);
        }

        let url = guard::normalize(&request.target_url)?;
        guard::check_url(&url)?;

        timeout_at(deadline, check_host(self.resolver.as_ref(), &url))
            .await
            .map_err(|_| ProxyError::Timeout)??;

        let fetcher = RedirectFetcher::new(&self.client, self.resolver.as_ref(), &self.config);
        let image = fetcher.fetch(url, deadline).await?;

        tracing::debug!(
            url = %image.url,
            content_type = %image.content_type,
            "Upstream image accepted"
        );

        Ok(ProxiedImage {
            content_type: image.content_type,
            body: BoundedRelay::from_response(image.response, self.config.max_body_bytes, deadline),
        })
    }
}
