//! Response handling.
//!
//! # Responsibilities
//! - Build the success response around the streaming relay
//! - Map pipeline errors to HTTP status codes with terse bodies
//!
//! # Design Decisions
//! - Upstream headers are never copied; `Content-Length` in particular is
//!   omitted so an aborted relay cannot look like a complete body
//! - Error bodies carry only `ProxyError::public_message`

use axum::body::Body;
use axum::http::header::{
    CACHE_CONTROL, CONTENT_SECURITY_POLICY, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS,
};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::proxy::ProxiedImage;
use crate::upstream::ProxyError;

pub const IMAGE_CSP: &str = "default-src 'none'; style-src 'unsafe-inline'";

/// Wrap a validated image in the outbound response.
pub fn image_response(image: ProxiedImage, cache_max_age_secs: u64) -> Result<Response, ProxyError> {
    let content_type = HeaderValue::from_str(&image.content_type)
        .map_err(|_| ProxyError::UnsupportedContentType(image.content_type.clone()))?;
    let cache_control = HeaderValue::from_str(&format!(
        "public, max-age={cache_max_age_secs}, s-maxage={cache_max_age_secs}"
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("no-store"));

    let mut response = Response::new(Body::from_stream(image.body));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, content_type);
    headers.insert(CACHE_CONTROL, cache_control);
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(CONTENT_SECURITY_POLICY, HeaderValue::from_static(IMAGE_CSP));
    Ok(response)
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), self.public_message()).into_response()
    }
}
