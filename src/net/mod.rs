//! Network subsystem.
//!
//! # Data Flow
//! ```text
//! Guarded URL (host is a name)
//!     → resolver.rs: HostResolver::lookup (all A/AAAA records)
//!     → classify every answer
//!     → reject on any non-public address
//!
//! Connection time (reqwest connector)
//!     → PinnedResolver runs the same validation
//!     → socket only ever opened to a validated address
//! ```
//!
//! # Design Decisions
//! - Resolver is a trait object so tests and deployments can swap DNS sources
//! - Lookups are bounded by the caller's request deadline

pub mod resolver;

pub use resolver::{
    check_host, resolve_and_validate, validated_addrs, HostResolver, PinnedResolver, SystemResolver,
};
