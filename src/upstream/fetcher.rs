//! Redirect-aware upstream fetching.
//!
//! # Responsibilities
//! - Issue the GET with automatic redirects disabled
//! - Re-run the guard and resolver on every `Location` before following it
//! - Enforce the redirect limit and the request-wide deadline
//! - Check status, content type and declared length of the final response
//!
//! # State Machine
//! ```text
//! Start → Fetching ─┬─ 3xx + Location → [guard + resolve target] → Fetching
//!                   ├─ 2xx → content checks → Terminal(UpstreamImage)
//!                   └─ other → Terminal(error)
//! ```
//!
//! # Design Decisions
//! - Explicit loop, never recursion, so the hop counter stays in one place
//! - Redirect responses are dropped unread, which closes their connection
//! - No retries: third-party fetches are not retried within a request

use std::sync::Arc;

use reqwest::header::{ACCEPT, CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use tokio::time::{timeout_at, Instant};
use url::Url;

use crate::config::ProxyConfig;
use crate::net::resolver::{check_host, HostResolver, PinnedResolver};
use crate::observability::metrics;
use crate::security::guard::check_url;
use crate::upstream::content::{check_content_type, check_declared_length};
use crate::upstream::types::{FetchHop, ProxyError, ProxyResult};

const IMAGE_ACCEPT: &str = "image/avif,image/webp,image/apng,image/png,image/jpeg,image/gif,image/*;q=0.8";

/// Client settings shared by the service and tests.
///
/// Redirects are never followed by the client itself, environment proxies
/// are ignored, and name resolution goes through [`PinnedResolver`].
pub fn client_builder(config: &ProxyConfig, resolver: Arc<dyn HostResolver>) -> ClientBuilder {
    Client::builder()
        .redirect(Policy::none())
        .no_proxy()
        .dns_resolver(Arc::new(PinnedResolver::new(resolver)))
        .connect_timeout(config.fetch_timeout())
        .timeout(config.fetch_timeout())
        .user_agent(config.user_agent.clone())
}

/// A validated upstream response whose body has not been read yet.
#[derive(Debug)]
pub struct UpstreamImage {
    /// URL of the final hop.
    pub url: Url,
    /// Lowercased media type, already checked to be a non-SVG image.
    pub content_type: String,
    pub response: Response,
}

/// Follows redirects one validated hop at a time.
pub struct RedirectFetcher<'a> {
    client: &'a Client,
    resolver: &'a dyn HostResolver,
    config: &'a ProxyConfig,
}

impl<'a> RedirectFetcher<'a> {
    pub fn new(client: &'a Client, resolver: &'a dyn HostResolver, config: &'a ProxyConfig) -> Self {
        Self {
            client,
            resolver,
            config,
        }
    }

    /// Fetch `url`, which must already have passed the guard and resolver.
    pub async fn fetch(&self, url: Url, deadline: Instant) -> ProxyResult<UpstreamImage> {
        let mut hop = FetchHop::origin(url);

        loop {
            tracing::debug!(url = %hop.url, hop = hop.attempt_index, "Fetching upstream");

            let send = self.client.get(hop.url.clone()).header(ACCEPT, IMAGE_ACCEPT).send();
            let response = timeout_at(deadline, send)
                .await
                .map_err(|_| ProxyError::Timeout)?
                .map_err(ProxyError::from_transport)?;
            let status = response.status();

            if is_redirect(status) {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.trim().to_string());
                drop(response);

                if hop.attempt_index >= self.config.max_redirects {
                    tracing::warn!(url = %hop.url, max = self.config.max_redirects, "Redirect limit exceeded");
                    return Err(ProxyError::TooManyRedirects {
                        max: self.config.max_redirects,
                    });
                }

                let location = location
                    .filter(|l| !l.is_empty())
                    .ok_or(ProxyError::MissingLocation)?;
                let target = hop.url.join(&location).map_err(|_| ProxyError::MissingLocation)?;

                self.validate_redirect(&target, deadline).await?;
                metrics::record_redirect();
                tracing::debug!(from = %hop.url, to = %target, status = %status, "Following redirect");
                hop = hop.next(target);
                continue;
            }

            if status == StatusCode::NOT_FOUND {
                return Err(ProxyError::UpstreamNotFound);
            }
            if !status.is_success() {
                return Err(ProxyError::UpstreamStatus(status.as_u16()));
            }

            let content_type = check_content_type(
                response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok()),
            )?;
            check_declared_length(response.content_length(), self.config.max_body_bytes)?;

            return Ok(UpstreamImage {
                url: hop.url,
                content_type,
                response,
            });
        }
    }

    async fn validate_redirect(&self, target: &Url, deadline: Instant) -> ProxyResult<()> {
        let reject = |reason: String| ProxyError::RedirectRejected {
            target: target.to_string(),
            reason,
        };

        check_url(target).map_err(|v| reject(v.to_string()))?;
        timeout_at(deadline, check_host(self.resolver, target))
            .await
            .map_err(|_| ProxyError::Timeout)?
            .map_err(|e| reject(e.to_string()))
    }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}
