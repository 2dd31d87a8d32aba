//! Address classification.
//!
//! # Responsibilities
//! - Decide whether a single IP address is publicly routable
//! - Unwrap IPv4-mapped, NAT64 and 6to4 IPv6 forms before deciding
//!
//! # Design Decisions
//! - Shared by the URL guard (literal hosts) and the resolver (DNS answers)
//! - Anything that is not clearly public unicast is refused by callers

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Result of classifying one resolved or literal address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostClassification {
    /// Publicly routable unicast address.
    Unicast,
    /// Loopback, RFC 1918, link-local, shared (CGNAT), unique-local or site-local.
    Private,
    /// Unspecified, broadcast, multicast, documentation, benchmarking or reserved.
    Invalid,
}

impl HostClassification {
    pub fn is_unicast(self) -> bool {
        self == HostClassification::Unicast
    }
}

/// Classify an address.
pub fn classify(ip: IpAddr) -> HostClassification {
    match ip {
        IpAddr::V4(v4) => classify_v4(v4),
        IpAddr::V6(v6) => classify_v6(v6),
    }
}

fn classify_v4(ip: Ipv4Addr) -> HostClassification {
    let [a, b, c, _] = ip.octets();

    if ip.is_loopback() || ip.is_private() || ip.is_link_local() {
        return HostClassification::Private;
    }
    // 100.64.0.0/10 shared address space
    if a == 100 && (b & 0xc0) == 64 {
        return HostClassification::Private;
    }

    if ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_multicast()
        || ip.is_documentation()
        || a == 0
        // 192.0.0.0/24 protocol assignments
        || (a == 192 && b == 0 && c == 0)
        // 198.18.0.0/15 benchmarking
        || (a == 198 && (b & 0xfe) == 18)
        // 240.0.0.0/4 reserved
        || a >= 240
    {
        return HostClassification::Invalid;
    }

    HostClassification::Unicast
}

fn classify_v6(ip: Ipv6Addr) -> HostClassification {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return classify_v4(v4);
    }

    let segments = ip.segments();

    // 64:ff9b::/96 NAT64 embeds an IPv4 destination
    if segments[0] == 0x64 && segments[1] == 0xff9b && segments[2..6].iter().all(|s| *s == 0) {
        let [hi, lo] = [segments[6], segments[7]];
        let embedded = Ipv4Addr::new((hi >> 8) as u8, hi as u8, (lo >> 8) as u8, lo as u8);
        return classify_v4(embedded);
    }

    // 2002::/16 6to4 embeds the relay's IPv4 address in the next 32 bits
    if segments[0] == 0x2002 {
        let [hi, lo] = [segments[1], segments[2]];
        let embedded = Ipv4Addr::new((hi >> 8) as u8, hi as u8, (lo >> 8) as u8, lo as u8);
        return classify_v4(embedded);
    }

    if ip.is_loopback() {
        return HostClassification::Private;
    }
    // fc00::/7 unique local
    if (segments[0] & 0xfe00) == 0xfc00 {
        return HostClassification::Private;
    }
    // fe80::/10 link-local, fec0::/10 deprecated site-local
    if (segments[0] & 0xffc0) == 0xfe80 || (segments[0] & 0xffc0) == 0xfec0 {
        return HostClassification::Private;
    }

    if ip.is_unspecified() || ip.is_multicast() {
        return HostClassification::Invalid;
    }
    // ::/96 deprecated IPv4-compatible
    if segments[..6].iter().all(|s| *s == 0) {
        return HostClassification::Invalid;
    }
    // 2001:db8::/32 documentation
    if segments[0] == 0x2001 && segments[1] == 0x0db8 {
        return HostClassification::Invalid;
    }
    // 2001::/32 Teredo tunnels can reach arbitrary IPv4 destinations
    if segments[0] == 0x2001 && segments[1] == 0 {
        return HostClassification::Invalid;
    }

    HostClassification::Unicast
}
