//! Reverse-DNS owner names
//!
//! IPv4 addresses map into `in-addr.arpa.` (octets reversed), IPv6 addresses
//! into `ip6.arpa.` (all 32 nibbles reversed, least significant first).

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Fully-qualified PTR owner name for an address
pub fn reverse_name(addr: IpAddr) -> String {
    match addr {
        IpAddr::V4(v4) => reverse_name_v4(v4),
        IpAddr::V6(v6) => reverse_name_v6(v6),
    }
}

fn reverse_name_v4(addr: Ipv4Addr) -> String {
    let [a, b, c, d] = addr.octets();
    format!("{d}.{c}.{b}.{a}.in-addr.arpa.")
}

fn reverse_name_v6(addr: Ipv6Addr) -> String {
    let mut name = String::with_capacity(72);
    for byte in addr.octets().iter().rev() {
        name.push(HEX_DIGITS[(byte & 0x0f) as usize] as char);
        name.push('.');
        name.push(HEX_DIGITS[(byte >> 4) as usize] as char);
        name.push('.');
    }
    name.push_str("ip6.arpa.");
    name
}
