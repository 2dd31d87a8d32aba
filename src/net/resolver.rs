//! Host resolution validation.
//!
//! # Responsibilities
//! - Resolve a hostname to every address record
//! - Reject the host if any returned address is not public unicast
//! - Hand only validated addresses to the HTTP client's connector
//!
//! # Design Decisions
//! - A mixed answer (public + private) is treated as hostile
//! - Empty answers and lookup errors fail closed
//! - [`PinnedResolver`] replaces reqwest's resolver, so the connection uses the
//!   addresses that were just validated instead of performing its own lookup.
//!   This closes the rebinding window between validation and connect.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use url::{Host, Url};

use crate::security::address::classify;
use crate::security::guard::canonical_hostname;
use crate::upstream::types::{ProxyError, ProxyResult};

/// Source of DNS answers.
pub trait HostResolver: Send + Sync + std::fmt::Debug {
    /// Return all address records for `host`.
    fn lookup<'a>(&'a self, host: &'a str) -> BoxFuture<'a, io::Result<Vec<IpAddr>>>;
}

/// Resolver backed by the operating system (`getaddrinfo` via Tokio).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl HostResolver for SystemResolver {
    fn lookup<'a>(&'a self, host: &'a str) -> BoxFuture<'a, io::Result<Vec<IpAddr>>> {
        Box::pin(async move {
            let addrs = tokio::net::lookup_host((host, 0)).await?;
            let mut ips: Vec<IpAddr> = addrs.map(|addr| addr.ip()).collect();
            ips.dedup();
            Ok(ips)
        })
    }
}

/// Resolve `host` and return its addresses only if every one is public unicast.
pub async fn validated_addrs(resolver: &dyn HostResolver, host: &str) -> ProxyResult<Vec<IpAddr>> {
    let host = canonical_hostname(host);
    let ips = resolver
        .lookup(&host)
        .await
        .map_err(|e| ProxyError::ResolutionFailed {
            host: host.clone(),
            reason: e.to_string(),
        })?;

    if ips.is_empty() {
        return Err(ProxyError::ResolutionFailed {
            host,
            reason: "no address records".to_string(),
        });
    }

    if let Some(bad) = ips.iter().find(|ip| !classify(**ip).is_unicast()) {
        tracing::warn!(host = %host, addr = %bad, answers = ips.len(), "DNS answer contains non-public address");
        return Err(ProxyError::PrivateAddress { host, addr: *bad });
    }

    Ok(ips)
}

/// Validate the host of `url`; literal IPs skip DNS entirely.
pub async fn check_host(resolver: &dyn HostResolver, url: &Url) -> ProxyResult<()> {
    match url.host() {
        Some(Host::Ipv4(v4)) => check_literal(IpAddr::V4(v4)),
        Some(Host::Ipv6(v6)) => check_literal(IpAddr::V6(v6)),
        Some(Host::Domain(domain)) => validated_addrs(resolver, domain).await.map(|_| ()),
        None => Err(ProxyError::ResolutionFailed {
            host: String::new(),
            reason: "URL has no host".to_string(),
        }),
    }
}

/// `true` only when every address the host resolves to is public unicast.
pub async fn resolve_and_validate(resolver: &dyn HostResolver, url: &Url) -> bool {
    check_host(resolver, url).await.is_ok()
}

fn check_literal(ip: IpAddr) -> ProxyResult<()> {
    if classify(ip).is_unicast() {
        Ok(())
    } else {
        Err(ProxyError::PrivateAddress {
            host: ip.to_string(),
            addr: ip,
        })
    }
}

/// reqwest DNS hook that only ever yields validated addresses.
#[derive(Debug, Clone)]
pub struct PinnedResolver {
    inner: Arc<dyn HostResolver>,
}

impl PinnedResolver {
    pub fn new(inner: Arc<dyn HostResolver>) -> Self {
        Self { inner }
    }

    /// Validated socket addresses for `host`. The connector fills in the port
    /// from the request URL.
    pub async fn socket_addrs(&self, host: &str) -> ProxyResult<Vec<SocketAddr>> {
        let ips = validated_addrs(self.inner.as_ref(), host).await?;
        Ok(ips.into_iter().map(|ip| SocketAddr::new(ip, 0)).collect())
    }
}

impl Resolve for PinnedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = self.clone();
        Box::pin(async move {
            match resolver.socket_addrs(name.as_str()).await {
                Ok(addrs) => Ok(Box::new(addrs.into_iter()) as Addrs),
                Err(e) => Err(Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, Default)]
    struct FixedResolver {
        answers: HashMap<String, Vec<IpAddr>>,
    }

    impl FixedResolver {
        fn with(mut self, host: &str, ips: &[&str]) -> Self {
            self.answers
                .insert(host.to_string(), ips.iter().map(|ip| ip.parse().unwrap()).collect());
            self
        }
    }

    impl HostResolver for FixedResolver {
        fn lookup<'a>(&'a self, host: &'a str) -> BoxFuture<'a, io::Result<Vec<IpAddr>>> {
            let result = self
                .answers
                .get(host)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "NXDOMAIN"));
            Box::pin(async move { result })
        }
    }

    fn resolver() -> FixedResolver {
        FixedResolver::default()
            .with("public.example", &["93.184.216.34", "2606:2800:220:1::1"])
            .with("mixed.example", &["93.184.216.34", "10.0.0.7"])
            .with("private.example", &["192.168.1.1"])
            .with("empty.example", &[])
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_public_answers_pass() {
        let r = resolver();
        assert!(resolve_and_validate(&r, &url("https://public.example/a.png")).await);
        assert!(resolve_and_validate(&r, &url("https://PUBLIC.example./a.png")).await);
    }

    #[tokio::test]
    async fn test_mixed_answer_is_rejected() {
        let r = resolver();
        assert!(!resolve_and_validate(&r, &url("https://mixed.example/a.png")).await);
        match check_host(&r, &url("https://mixed.example/")).await {
            Err(ProxyError::PrivateAddress { addr, .. }) => assert_eq!(addr, "10.0.0.7".parse::<IpAddr>().unwrap()),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failures_are_rejections() {
        let r = resolver();
        assert!(!resolve_and_validate(&r, &url("https://private.example/")).await);
        assert!(!resolve_and_validate(&r, &url("https://empty.example/")).await);
        assert!(!resolve_and_validate(&r, &url("https://nxdomain.example/")).await);
    }

    #[tokio::test]
    async fn test_literal_addresses_skip_dns() {
        // The fixed resolver knows none of these, so a lookup would fail.
        let r = FixedResolver::default();
        assert!(resolve_and_validate(&r, &url("http://93.184.216.34/x")).await);
        assert!(!resolve_and_validate(&r, &url("http://127.0.0.1/x")).await);
        assert!(!resolve_and_validate(&r, &url("http://[fd00::1]/x")).await);
    }

    #[tokio::test]
    async fn test_pinned_resolver_yields_only_validated_addrs() {
        let pinned = PinnedResolver::new(Arc::new(resolver()));
        let addrs = pinned.socket_addrs("public.example").await.unwrap();
        assert_eq!(addrs.len(), 2);
        assert!(addrs.iter().all(|a| a.port() == 0));

        assert!(pinned.socket_addrs("mixed.example").await.is_err());
    }
}
