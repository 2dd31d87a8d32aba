//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming proxy request:
//!     → signature.rs (verify the capability tag over the exact URL string)
//!     → guard.rs (scheme, local names, literal addresses)
//!     → address.rs (classify literal IPs; reused by net::resolver for DNS answers)
//!     → Pass to resolution and fetching
//! ```
//!
//! # Design Decisions
//! - Signature first: no parsing or I/O happens on an unsigned URL
//! - Fail closed: every ambiguous input is a rejection
//! - No trust in client input

pub mod address;
pub mod guard;
pub mod signature;

pub use address::{classify, HostClassification};
pub use guard::{check_url, is_allowed, normalize, PolicyViolation, TrustedDomains};
pub use signature::{sign, verify, SigningKey, UrlSigner};
