//! Upstream fetching subsystem.
//!
//! # Data Flow
//! ```text
//! Validated URL + deadline
//!     → fetcher.rs (GET, redirects off)
//!         → 3xx: security::guard + net::resolver on Location, loop
//!         → 2xx: content.rs (image type, not SVG, declared length)
//!     → UpstreamImage (unread body) handed to relay
//! ```
//!
//! # Design Decisions
//! - Every hop is untrusted; validation repeats per hop
//! - Hops are strictly sequential
//! - Errors are typed (types.rs) and mapped to HTTP status at the edge

pub mod content;
pub mod fetcher;
pub mod types;

pub use fetcher::{client_builder, RedirectFetcher, UpstreamImage};
pub use types::{ErrorKind, FetchHop, ProxyError, ProxyResult};
