//! Response relay subsystem.
//!
//! # Data Flow
//! ```text
//! UpstreamImage.response (unread)
//!     → body.rs: BoundedRelay (pull-driven, byte-capped, deadline-bound)
//!     → axum Body::from_stream → client (chunked, no Content-Length)
//! ```
//!
//! # Design Decisions
//! - Backpressure comes from polling: upstream is read only when the client
//!   side is ready for the next chunk; there is no intermediate queue
//! - Overflow is an error, never a silent truncation
//! - Dropping the relay (client disconnect, shutdown) drops the upstream body

pub mod body;

pub use body::{BoundedRelay, RelayState};
