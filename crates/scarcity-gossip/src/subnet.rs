//! Peer subnet diversity.
//!
//! Peers are tallied per IPv4 /24 (or IPv6 /48). The tally feeds the
//! diversity figure in gossip stats and weighs outbound-initiated peers
//! higher; it never filters peers.

use std::collections::HashMap;
use std::net::IpAddr;

/// Subnet key for an address: "a.b.c" for IPv4 /24, the first three
/// segments for IPv6 /48.
pub fn subnet_key(addr: &IpAddr) -> String {
    match addr {
        IpAddr::V4(v4) => {
            let octets = v4.octets();
            format!("{}.{}.{}", octets[0], octets[1], octets[2])
        }
        IpAddr::V6(v6) => {
            let segments = v6.segments();
            format!("{:x}:{:x}:{:x}", segments[0], segments[1], segments[2])
        }
    }
}

/// Count distinct subnets among the given keys.
pub fn distinct_subnets<'a>(keys: impl Iterator<Item = &'a str>) -> usize {
    let mut tally: HashMap<&str, u32> = HashMap::new();
    for key in keys {
        *tally.entry(key).or_insert(0) += 1;
    }
    tally.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv4_slash24() {
        let a: IpAddr = "192.168.7.1".parse().expect("addr");
        let b: IpAddr = "192.168.7.254".parse().expect("addr");
        let c: IpAddr = "192.168.8.1".parse().expect("addr");
        assert_eq!(subnet_key(&a), subnet_key(&b));
        assert_ne!(subnet_key(&a), subnet_key(&c));
    }

    #[test]
    fn test_ipv6_slash48() {
        let a: IpAddr = "2001:db8:1::1".parse().expect("addr");
        let b: IpAddr = "2001:db8:1:ffff::1".parse().expect("addr");
        let c: IpAddr = "2001:db8:2::1".parse().expect("addr");
        assert_eq!(subnet_key(&a), subnet_key(&b));
        assert_ne!(subnet_key(&a), subnet_key(&c));
    }

    #[test]
    fn test_distinct_subnets() {
        let keys = ["10.0.0", "10.0.0", "10.0.1"];
        assert_eq!(distinct_subnets(keys.iter().copied()), 2);
        assert_eq!(distinct_subnets(std::iter::empty()), 0);
    }
}
