//! Shared utilities for integration testing.
//!
//! Upstreams are raw TCP mocks on 127.0.0.1. The pipeline refuses loopback,
//! so tests address them by a made-up name that a [`StaticResolver`] maps to
//! a public address; the client's `.resolve` override then routes the actual
//! connection to the mock. URLs must carry the mock's port.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use image_proxy::config::ProxyConfig;
use image_proxy::net::HostResolver;
use image_proxy::security::{sign, SigningKey};
use image_proxy::upstream::client_builder;
use image_proxy::{ImageProxy, ProxyRequest};

pub const SECRET: &str = "integration-secret";
pub const IMAGE_HOST: &str = "img.test";
pub const PUBLIC_IP: &str = "93.184.216.34";

/// What a mock upstream sends back.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Omit Content-Length and close the connection after the body.
    pub close_delimited: bool,
    /// Wait this long before writing anything.
    pub delay: Option<Duration>,
}

impl MockResponse {
    pub fn image(content_type: &str, body: &[u8]) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type".into(), content_type.into())],
            body: body.to_vec(),
            close_delimited: false,
            delay: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            close_delimited: false,
            delay: None,
        }
    }

    pub fn redirect(location: &str) -> Self {
        Self::status(302).header("Location", location)
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn without_content_length(mut self) -> Self {
        self.close_delimited = true;
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// A running mock upstream.
#[derive(Debug, Clone)]
pub struct MockUpstream {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl MockUpstream {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// `http://img.test:<port><path>`
    pub fn url(&self, path: &str) -> String {
        format!("http://{}:{}{}", IMAGE_HOST, self.port(), path)
    }
}

/// Start a programmable mock upstream. `route` maps the request path to a response.
pub async fn start_upstream<F>(route: F) -> MockUpstream
where
    F: Fn(&str) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let route = Arc::new(route);

    let counter = Arc::clone(&hits);
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let route = Arc::clone(&route);
            let counter = Arc::clone(&counter);
            tokio::spawn(async move {
                let Some(path) = read_request_path(&mut socket).await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let response = route(&path);

                if let Some(delay) = response.delay {
                    tokio::time::sleep(delay).await;
                }

                let mut head = format!("HTTP/1.1 {} Mock\r\n", response.status);
                for (name, value) in &response.headers {
                    head.push_str(&format!("{name}: {value}\r\n"));
                }
                if !response.close_delimited {
                    head.push_str(&format!("Content-Length: {}\r\n", response.body.len()));
                }
                head.push_str("Connection: close\r\n\r\n");

                if socket.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                for chunk in response.body.chunks(4096) {
                    if socket.write_all(chunk).await.is_err() {
                        return;
                    }
                }
                let _ = socket.shutdown().await;
            });
        }
    });

    MockUpstream { addr, hits }
}

async fn read_request_path(socket: &mut tokio::net::TcpStream) -> Option<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let head = String::from_utf8_lossy(&buf);
    head.lines()
        .next()?
        .split_whitespace()
        .nth(1)
        .map(str::to_string)
}

/// Resolver answering from a fixed table; unknown names fail.
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    records: HashMap<String, Vec<IpAddr>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default().with(IMAGE_HOST, &[PUBLIC_IP])
    }

    pub fn with(mut self, host: &str, addrs: &[&str]) -> Self {
        self.records.insert(
            host.to_string(),
            addrs.iter().map(|a| a.parse().unwrap()).collect(),
        );
        self
    }
}

impl HostResolver for StaticResolver {
    fn lookup<'a>(&'a self, host: &'a str) -> BoxFuture<'a, io::Result<Vec<IpAddr>>> {
        let answer = self
            .records
            .get(host)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no records for {host}")));
        Box::pin(async move { answer })
    }
}

/// Answers with a public address on the first lookup of a name and with
/// loopback on every later one, like a rebinding DNS server.
#[derive(Debug, Default)]
pub struct RebindingResolver {
    lookups: AtomicUsize,
}

impl RebindingResolver {
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl HostResolver for RebindingResolver {
    fn lookup<'a>(&'a self, _host: &'a str) -> BoxFuture<'a, io::Result<Vec<IpAddr>>> {
        let answer = if self.lookups.fetch_add(1, Ordering::SeqCst) == 0 {
            PUBLIC_IP.parse().unwrap()
        } else {
            IpAddr::from([127, 0, 0, 1])
        };
        Box::pin(async move { Ok(vec![answer]) })
    }
}

pub fn test_config() -> ProxyConfig {
    ProxyConfig {
        secret: SigningKey::new(SECRET),
        fetch_timeout_secs: 5,
        ..ProxyConfig::default()
    }
}

/// Pipeline whose connections to each named host go to the paired mock.
/// Names without an override connect wherever `resolver` says.
pub fn build_proxy(
    config: ProxyConfig,
    resolver: Arc<dyn HostResolver>,
    upstreams: &[(&str, &MockUpstream)],
) -> ImageProxy {
    let mut builder = client_builder(&config, Arc::clone(&resolver));
    for (host, upstream) in upstreams {
        builder = builder.resolve(host, upstream.addr);
    }
    let client = builder.build().unwrap();
    ImageProxy::with_parts(config, resolver, client)
}

/// Pipeline with `img.test` pointing at `upstream`.
pub fn proxy_for(config: ProxyConfig, upstream: &MockUpstream) -> ImageProxy {
    build_proxy(config, static_resolver(StaticResolver::new()), &[(IMAGE_HOST, upstream)])
}

pub fn static_resolver(resolver: StaticResolver) -> Arc<dyn HostResolver> {
    Arc::new(resolver)
}

pub fn signed(url: &str) -> ProxyRequest {
    ProxyRequest {
        target_url: url.to_string(),
        signature: sign(url, &SigningKey::new(SECRET).unwrap()),
    }
}
