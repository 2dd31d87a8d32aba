//! Capability signatures for proxied URLs.
//!
//! # Responsibilities
//! - Tag a URL string with HMAC-SHA-256 under the process secret
//! - Verify a presented tag in constant time
//! - Build proxy links for the rendering side
//!
//! # Design Decisions
//! - The MAC covers the exact URL string, byte for byte; callers must not
//!   re-serialize the URL between signing and verification
//! - Tags are lowercase hex; verification accepts either case
//! - Missing tag or missing key is a plain `false`, never a panic

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use url::form_urlencoded;

type HmacSha256 = Hmac<Sha256>;

/// Process-wide signing secret.
///
/// Never printed; `Debug` is redacted.
#[derive(Clone)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    /// Returns `None` for an empty secret.
    pub fn new(secret: impl Into<Vec<u8>>) -> Option<Self> {
        let bytes = secret.into();
        if bytes.is_empty() {
            None
        } else {
            Some(Self(bytes))
        }
    }

    fn mac(&self, url: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.0).expect("HMAC accepts keys of any length");
        mac.update(url.as_bytes());
        mac
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// Compute the hex tag for `url`.
pub fn sign(url: &str, key: &SigningKey) -> String {
    hex::encode(key.mac(url).finalize().into_bytes())
}

/// Check `tag` against `url`.
pub fn verify(url: &str, tag: Option<&str>, key: Option<&SigningKey>) -> bool {
    let (Some(tag), Some(key)) = (tag, key) else {
        return false;
    };
    let Ok(presented) = hex::decode(tag.trim()) else {
        return false;
    };
    let expected = key.mac(url).finalize().into_bytes();
    // Length mismatch yields false without comparing contents.
    expected.as_slice().ct_eq(presented.as_slice()).into()
}

/// Signs URLs and builds proxy links for HTML output.
#[derive(Debug, Clone)]
pub struct UrlSigner {
    key: SigningKey,
    endpoint: String,
}

impl UrlSigner {
    /// `endpoint` is the proxy route, optionally absolute
    /// (`/image-proxy` or `https://app.example/image-proxy`).
    pub fn new(key: SigningKey, endpoint: impl Into<String>) -> Self {
        Self {
            key,
            endpoint: endpoint.into(),
        }
    }

    pub fn sign_url(&self, url: &str) -> String {
        sign(url, &self.key)
    }

    pub fn build_proxy_url(&self, url: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("url", url)
            .append_pair("sig", &self.sign_url(url))
            .finish();
        format!("{}?{}", self.endpoint, query)
    }

    pub fn key(&self) -> &SigningKey {
        &self.key
    }
}
