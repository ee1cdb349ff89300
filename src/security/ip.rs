//! Restricted address ranges.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Returns true if `ip` must never be the target of an outbound fetch.
///
/// IPv4 ranges:
/// - 0.0.0.0/8 (this network)
/// - 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16 (RFC 1918)
/// - 127.0.0.0/8 (loopback)
/// - 169.254.0.0/16 (link-local, includes cloud metadata endpoints)
/// - 224.0.0.0/4 (multicast) and 240.0.0.0/4 (reserved)
///
/// IPv6: `::`, `::1`, fc00::/7, fe80::/10, ff00::/8, and IPv4-mapped
/// addresses whose embedded IPv4 address is restricted.
pub fn is_restricted_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_restricted_ipv4(v4),
        IpAddr::V6(v6) => is_restricted_ipv6(v6),
    }
}

fn is_restricted_ipv4(ip: Ipv4Addr) -> bool {
    let o = ip.octets();
    match o[0] {
        0 | 10 | 127 => true,
        172 => (16..=31).contains(&o[1]),
        192 => o[1] == 168,
        169 => o[1] == 254,
        224..=255 => true,
        _ => false,
    }
}

fn is_restricted_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_restricted_ipv4(v4);
    }
    let s = ip.segments();
    ip.is_unspecified()
        || ip.is_loopback()
        // fc00::/7 unique-local
        || (s[0] & 0xfe00) == 0xfc00
        // fe80::/10 link-local
        || (s[0] & 0xffc0) == 0xfe80
        // ff00::/8 multicast
        || (s[0] & 0xff00) == 0xff00
}
