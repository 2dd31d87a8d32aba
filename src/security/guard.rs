//! URL policy guard.
//!
//! # Responsibilities
//! - Normalize protocol-relative references to `https:`
//! - Reject URLs that must never be fetched, on lexical grounds only
//! - Answer trusted-domain membership for the rendering side
//!
//! # Design Decisions
//! - No network I/O; safe to call on every redirect target
//! - Literal IP hosts are classified here with the same classifier the resolver uses
//! - The WHATWG parser in `url` canonicalizes numeric hosts (`2130706433`, `0x7f.1`)
//!   into `Host::Ipv4`, so alternate encodings of private addresses are caught too

use std::net::IpAddr;

use thiserror::Error;
use url::{Host, Url};

use crate::security::address::classify;

const BLOCKED_HOSTNAMES: &[&str] = &["localhost"];
const BLOCKED_SUFFIXES: &[&str] = &[".localhost", ".local", ".internal"];

/// Reason a URL failed the guard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("URL could not be parsed")]
    Unparseable,

    #[error("scheme '{0}' is not allowed")]
    UnsupportedScheme(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("host '{0}' is a local name")]
    LocalHostname(String),

    #[error("address {0} is not public unicast")]
    NonUnicastAddress(IpAddr),
}

/// Parse a raw reference, treating `//host/path` as `https://host/path`.
pub fn normalize(raw: &str) -> Result<Url, PolicyViolation> {
    let raw = raw.trim();
    let parsed = if raw.starts_with("//") {
        Url::parse(&format!("https:{raw}"))
    } else {
        Url::parse(raw)
    };
    parsed.map_err(|_| PolicyViolation::Unparseable)
}

/// Lexical check of an already parsed URL.
pub fn check_url(url: &Url) -> Result<(), PolicyViolation> {
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(PolicyViolation::UnsupportedScheme(other.to_string())),
    }

    match url.host() {
        None => Err(PolicyViolation::MissingHost),
        Some(Host::Ipv4(v4)) => check_literal(IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => check_literal(IpAddr::V6(v6)),
        Some(Host::Domain(domain)) => {
            let name = canonical_hostname(domain);
            if name.is_empty() {
                return Err(PolicyViolation::MissingHost);
            }
            // Opaque hosts of non-special schemes never get here; this catches
            // stray bracketed forms that slipped past the parser.
            if let Ok(ip) = name.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>() {
                return check_literal(ip);
            }
            if BLOCKED_HOSTNAMES.contains(&name.as_str())
                || BLOCKED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
            {
                return Err(PolicyViolation::LocalHostname(name));
            }
            Ok(())
        }
    }
}

/// `true` when the raw URL may be fetched.
pub fn is_allowed(raw: &str) -> bool {
    normalize(raw).and_then(|url| check_url(&url)).is_ok()
}

fn check_literal(ip: IpAddr) -> Result<(), PolicyViolation> {
    if classify(ip).is_unicast() {
        Ok(())
    } else {
        Err(PolicyViolation::NonUnicastAddress(ip))
    }
}

/// Lowercase and strip the root-zone dot so `LOCALHOST.` matches `localhost`.
pub(crate) fn canonical_hostname(host: &str) -> String {
    host.trim_end_matches('.').to_ascii_lowercase()
}

/// Membership test against the trusted-domain allowlist.
#[derive(Debug, Clone, Default)]
pub struct TrustedDomains {
    domains: Vec<String>,
}

impl TrustedDomains {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(|d| canonical_hostname(d.as_ref()))
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    /// `true` when the host equals, or is a subdomain of, a trusted entry.
    pub fn contains(&self, url: &Url) -> bool {
        let Some(Host::Domain(domain)) = url.host() else {
            return false;
        };
        let host = canonical_hostname(domain);
        self.domains.iter().any(|trusted| {
            host == *trusted
                || host
                    .strip_suffix(trusted.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }

    /// Raw-string form used by the rendering side.
    pub fn is_trusted_domain(&self, raw: &str) -> bool {
        normalize(raw).map(|url| self.contains(&url)).unwrap_or(false)
    }
}
