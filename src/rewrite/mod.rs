//! Image reference rewriting for rendered HTML.
//!
//! # Responsibilities
//! - Leave inline and in-page references alone (`data:`, `#fragment`, empty)
//! - Link trusted domains directly
//! - Replace every other allowed external image with a signed proxy link
//! - Never sign a URL the guard would refuse
//!
//! # Design Decisions
//! - Protocol-relative references are signed in their `https:` form, which is
//!   the exact string the proxy later verifies

use crate::config::ProxyConfig;
use crate::security::guard::{check_url, normalize, TrustedDomains};
use crate::security::signature::UrlSigner;

/// What to emit for an image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewritten {
    /// Not an external reference; emit as given.
    Unchanged(String),
    /// Trusted host; emit this URL directly.
    Trusted(String),
    /// Emit this signed proxy link.
    Proxied(String),
    /// Refused by policy; emit nothing.
    Blocked,
}

impl Rewritten {
    /// The `src` value to emit, if any.
    pub fn into_src(self) -> Option<String> {
        match self {
            Rewritten::Unchanged(s) | Rewritten::Trusted(s) | Rewritten::Proxied(s) => Some(s),
            Rewritten::Blocked => None,
        }
    }
}

/// Rewrites `<img src>` values for the rendering pipeline.
#[derive(Debug, Clone)]
pub struct ImageUrlRewriter {
    signer: UrlSigner,
    trusted: TrustedDomains,
}

impl ImageUrlRewriter {
    pub fn new(signer: UrlSigner, trusted: TrustedDomains) -> Self {
        Self { signer, trusted }
    }

    /// Build from service config. `None` when no secret is configured.
    pub fn from_config(config: &ProxyConfig) -> Option<Self> {
        let key = config.signing_key()?.clone();
        Some(Self::new(
            UrlSigner::new(key, config.link_endpoint()),
            TrustedDomains::new(&config.trusted_domains),
        ))
    }

    pub fn rewrite(&self, src: &str) -> Rewritten {
        let src = src.trim();
        if src.is_empty() || src.starts_with('#') || has_scheme(src, "data") {
            return Rewritten::Unchanged(src.to_string());
        }

        let canonical = if src.starts_with("//") {
            format!("https:{src}")
        } else {
            src.to_string()
        };

        let Ok(url) = normalize(&canonical) else {
            return Rewritten::Blocked;
        };
        if self.trusted.contains(&url) {
            return Rewritten::Trusted(canonical);
        }
        if let Err(violation) = check_url(&url) {
            tracing::debug!(reason = %violation, "Image reference not proxied");
            return Rewritten::Blocked;
        }

        Rewritten::Proxied(self.signer.build_proxy_url(&canonical))
    }

    pub fn signer(&self) -> &UrlSigner {
        &self.signer
    }
}

fn has_scheme(src: &str, scheme: &str) -> bool {
    src.len() > scheme.len()
        && src.as_bytes()[scheme.len()] == b':'
        && src[..scheme.len()].eq_ignore_ascii_case(scheme)
}
