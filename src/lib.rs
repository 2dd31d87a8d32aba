//! Signed image proxy.
//!
//! Fetches third-party images on behalf of clients that hold a signed link,
//! without letting the link reach internal services.
//!
//! # Architecture Overview
//!
//! ```text
//!     GET /image-proxy?url=..&sig=..
//!     ──────────────────────────────▶ http::server ──▶ proxy::ImageProxy
//!                                                        │
//!                         security::signature ◀──────────┤ verify
//!                         security::guard     ◀──────────┤ scheme, host, literal IPs
//!                         net::resolver       ◀──────────┤ every DNS answer public
//!                         upstream::fetcher   ◀──────────┤ manual redirects, re-checked
//!                                                        ▼
//!     ◀────────────────────────────── http::response ◀── relay::BoundedRelay
//!        nosniff, CSP, cache headers                    byte cap, deadline
//!
//!     rewrite::ImageUrlRewriter produces the signed links for rendered HTML.
//! ```

pub mod config;
pub mod http;
pub mod net;
pub mod proxy;
pub mod relay;
pub mod rewrite;
pub mod upstream;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::{ProxyConfig, ServiceConfig};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::{ImageProxy, ProxiedImage, ProxyRequest};
pub use rewrite::{ImageUrlRewriter, Rewritten};
pub use upstream::{ErrorKind, ProxyError};
