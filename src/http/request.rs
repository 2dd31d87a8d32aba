//! Request handling.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every inbound request
//! - Turn the proxy query string into a `ProxyRequest`
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Query values are percent-decoded exactly once; the decoded `url` is the
//!   string the signature covers

use axum::http::{HeaderMap, HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use url::form_urlencoded;
use uuid::Uuid;

use crate::proxy::ProxyRequest;
use crate::upstream::{ProxyError, ProxyResult};

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID of an inbound request, or "unknown".
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Parse `url=<percent-encoded URL>&sig=<hex>`.
///
/// The first occurrence of each parameter wins; empty values count as missing.
pub fn proxy_request_from_query(query: Option<&str>) -> ProxyResult<ProxyRequest> {
    let mut target_url = None;
    let mut signature = None;

    for (key, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        match key.as_ref() {
            "url" if target_url.is_none() => target_url = Some(value.into_owned()),
            "sig" if signature.is_none() => signature = Some(value.into_owned()),
            _ => {}
        }
    }

    let target_url = target_url
        .filter(|v| !v.is_empty())
        .ok_or(ProxyError::InvalidRequest("url"))?;
    let signature = signature
        .filter(|v| !v.is_empty())
        .ok_or(ProxyError::InvalidRequest("sig"))?;

    Ok(ProxyRequest {
        target_url,
        signature,
    })
}
