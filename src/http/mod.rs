//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, concurrency limit)
//!     → request.rs (query → ProxyRequest)
//!     → proxy::ImageProxy (verify, guard, resolve, fetch)
//!     → response.rs (security headers + streaming relay, or mapped error)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{proxy_request_from_query, MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
