//! Pipeline error taxonomy and hop bookkeeping.

use axum::http::StatusCode;
use thiserror::Error;
use url::Url;

use crate::security::PolicyViolation;

/// Broad failure class, used for metrics labels and status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    AuthorizationFailure,
    PolicyRejected,
    ResolutionFailure,
    UpstreamFailure,
    ContentPolicyViolation,
    TransportFailure,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::AuthorizationFailure => "authorization_failure",
            ErrorKind::PolicyRejected => "policy_rejected",
            ErrorKind::ResolutionFailure => "resolution_failure",
            ErrorKind::UpstreamFailure => "upstream_failure",
            ErrorKind::ContentPolicyViolation => "content_policy_violation",
            ErrorKind::TransportFailure => "transport_failure",
        }
    }
}

/// Errors that can terminate an image proxy request.
///
/// `Display` carries detail for logs. Clients only ever see
/// [`ProxyError::public_message`].
#[derive(Debug, Error)]
pub enum ProxyError {
    /// A required query parameter is missing or malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    /// Signature missing, malformed, or not matching.
    #[error("signature verification failed")]
    Unauthorized,

    /// Target URL failed the lexical guard.
    #[error("url rejected: {0}")]
    PolicyRejected(#[from] PolicyViolation),

    /// A redirect pointed somewhere the guard or resolver refuses.
    #[error("redirect to {target} rejected: {reason}")]
    RedirectRejected { target: String, reason: String },

    /// DNS lookup failed or returned nothing.
    #[error("could not resolve {host}: {reason}")]
    ResolutionFailed { host: String, reason: String },

    /// DNS answer contained an address that is not public unicast.
    #[error("{host} resolves to non-public address {addr}")]
    PrivateAddress { host: String, addr: std::net::IpAddr },

    #[error("redirect limit of {max} exceeded")]
    TooManyRedirects { max: u32 },

    #[error("redirect response without a usable Location header")]
    MissingLocation,

    #[error("upstream returned 404")]
    UpstreamNotFound,

    #[error("upstream returned status {0}")]
    UpstreamStatus(u16),

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("body exceeds limit of {limit} bytes")]
    BodyTooLarge { limit: u64 },

    #[error("fetch timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type for pipeline operations.
pub type ProxyResult<T> = Result<T, ProxyError>;

impl ProxyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProxyError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            ProxyError::Unauthorized => ErrorKind::AuthorizationFailure,
            ProxyError::PolicyRejected(_) | ProxyError::RedirectRejected { .. } => ErrorKind::PolicyRejected,
            ProxyError::ResolutionFailed { .. } | ProxyError::PrivateAddress { .. } => {
                ErrorKind::ResolutionFailure
            }
            ProxyError::TooManyRedirects { .. }
            | ProxyError::MissingLocation
            | ProxyError::UpstreamNotFound
            | ProxyError::UpstreamStatus(_) => ErrorKind::UpstreamFailure,
            ProxyError::UnsupportedContentType(_) | ProxyError::BodyTooLarge { .. } => {
                ErrorKind::ContentPolicyViolation
            }
            ProxyError::Timeout | ProxyError::Transport(_) => ErrorKind::TransportFailure,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidRequest(_)
            | ProxyError::PolicyRejected(_)
            | ProxyError::RedirectRejected { .. }
            | ProxyError::ResolutionFailed { .. }
            | ProxyError::PrivateAddress { .. }
            | ProxyError::UnsupportedContentType(_) => StatusCode::BAD_REQUEST,
            ProxyError::Unauthorized => StatusCode::FORBIDDEN,
            ProxyError::UpstreamNotFound => StatusCode::NOT_FOUND,
            ProxyError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::TooManyRedirects { .. }
            | ProxyError::MissingLocation
            | ProxyError::UpstreamStatus(_)
            | ProxyError::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Terse message safe to send to clients.
    pub fn public_message(&self) -> &'static str {
        match self {
            ProxyError::InvalidRequest("url") => "Missing url parameter",
            ProxyError::InvalidRequest("sig") => "Missing sig parameter",
            ProxyError::InvalidRequest(_) => "Invalid request",
            ProxyError::Unauthorized => "Invalid signature",
            ProxyError::PolicyRejected(_) => "URL not allowed",
            ProxyError::RedirectRejected { .. } => "Redirect target not allowed",
            ProxyError::ResolutionFailed { .. } | ProxyError::PrivateAddress { .. } => "Host not allowed",
            ProxyError::TooManyRedirects { .. } => "Too many redirects",
            ProxyError::MissingLocation => "Invalid redirect",
            ProxyError::UpstreamNotFound => "Image not found",
            ProxyError::UpstreamStatus(_) => "Upstream error",
            ProxyError::UnsupportedContentType(_) => "Unsupported content type",
            ProxyError::BodyTooLarge { .. } => "Image too large",
            ProxyError::Timeout => "Upstream timeout",
            ProxyError::Transport(_) => "Upstream request failed",
        }
    }

    /// Map a reqwest failure, keeping timeouts distinct.
    ///
    /// A rejection raised by the pinned resolver at connect time arrives
    /// wrapped in the client's error chain and keeps its own classification.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if let Some(rejection) = resolution_cause(&err) {
            rejection
        } else if err.is_timeout() {
            ProxyError::Timeout
        } else {
            ProxyError::Transport(err.to_string())
        }
    }
}

/// Find a resolution failure anywhere in the `source()` chain of `err`.
fn resolution_cause(err: &(dyn std::error::Error + 'static)) -> Option<ProxyError> {
    let mut source = err.source();
    while let Some(cause) = source {
        match cause.downcast_ref::<ProxyError>() {
            Some(ProxyError::PrivateAddress { host, addr }) => {
                return Some(ProxyError::PrivateAddress {
                    host: host.clone(),
                    addr: *addr,
                });
            }
            Some(ProxyError::ResolutionFailed { host, reason }) => {
                return Some(ProxyError::ResolutionFailed {
                    host: host.clone(),
                    reason: reason.clone(),
                });
            }
            _ => source = cause.source(),
        }
    }
    None
}

/// One followed redirect. Lives only for the duration of the fetch loop.
#[derive(Debug, Clone)]
pub struct FetchHop {
    pub url: Url,
    /// Number of redirects followed before this hop (0 for the original URL).
    pub attempt_index: u32,
}

impl FetchHop {
    pub fn origin(url: Url) -> Self {
        Self { url, attempt_index: 0 }
    }

    pub fn next(&self, url: Url) -> Self {
        Self {
            url,
            attempt_index: self.attempt_index + 1,
        }
    }
}
