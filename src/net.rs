// Copyright © 2026 Rudis Laboratories LLC

use lazy_static::lazy_static;
use log::warn;
use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};

lazy_static! {
    static ref INET_RE: Regex = Regex::new(r"inet\s+([\d.]+)/(\d+)").unwrap();
    static ref ETHER_RE: Regex = Regex::new(r"(?i)link/ether\s+([0-9a-f:]+)").unwrap();
    static ref DEFAULT_ROUTE_RE: Regex = Regex::new(r"default via ([\d.]+)").unwrap();
}

/// Prefix length to dotted-quad netmask, e.g. 20 -> 255.255.240.0
pub fn cidr_to_netmask(bits: u8) -> Result<String> {
    if bits > 32 {
        return Err(Error::InvalidParameter(format!(
            "prefix length {bits} out of range 0..=32"
        )));
    }
    let mut remaining = bits as u32;
    let mut octets = Vec::with_capacity(4);
    for _ in 0..4 {
        let n = remaining.min(8);
        octets.push((256 - (1u32 << (8 - n))).to_string());
        remaining -= n;
    }
    Ok(octets.join("."))
}

/// Dotted-quad netmask to prefix length by counting set bits per octet
pub fn netmask_to_cidr(netmask: &str) -> Result<u8> {
    let octets = netmask
        .trim()
        .split('.')
        .map(|o| o.parse::<u8>())
        .collect::<std::result::Result<Vec<u8>, _>>()
        .map_err(|e| Error::Parse(format!("netmask '{netmask}': {e}")))?;
    if octets.len() != 4 {
        return Err(Error::Parse(format!(
            "netmask '{netmask}' must have 4 octets"
        )));
    }
    let mask = u32::from_be_bytes([octets[0], octets[1], octets[2], octets[3]]);
    if mask.leading_ones() != mask.count_ones() {
        warn!("netmask {} is not contiguous", netmask);
    }
    Ok(octets.iter().map(|o| o.count_ones() as u8).sum())
}

/// First IPv4 configuration of an interface, from `ip addr show <if>`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceAddress {
    pub address: String,
    pub prefix: u8,
    pub netmask: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    pub up: bool,
    /// 172.x.x.x/16 is what a container on the default bridge sees
    pub docker_bridge: bool,
}

pub fn parse_ip_addr(output: &str) -> Option<InterfaceAddress> {
    let caps = INET_RE.captures(output)?;
    let address = caps[1].to_string();
    let prefix: u8 = caps[2].parse().ok()?;
    let netmask = cidr_to_netmask(prefix).ok()?;
    let mac = ETHER_RE
        .captures(output)
        .map(|c| c[1].to_lowercase());
    Some(InterfaceAddress {
        docker_bridge: address.starts_with("172.") && prefix == 16,
        address,
        prefix,
        netmask,
        mac,
        up: output.contains("state UP"),
    })
}

/// Default gateway from `ip route` output
pub fn parse_default_gateway(output: &str) -> Option<String> {
    DEFAULT_ROUTE_RE
        .captures(output)
        .map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cidr_netmask_round_trip() {
        for n in 0..=32u8 {
            let mask = cidr_to_netmask(n).unwrap();
            assert_eq!(netmask_to_cidr(&mask).unwrap(), n, "mask {mask}");
        }
    }

    #[test]
    fn test_known_masks() {
        assert_eq!(cidr_to_netmask(0).unwrap(), "0.0.0.0");
        assert_eq!(cidr_to_netmask(20).unwrap(), "255.255.240.0");
        assert_eq!(cidr_to_netmask(24).unwrap(), "255.255.255.0");
        assert_eq!(cidr_to_netmask(32).unwrap(), "255.255.255.255");
        assert!(cidr_to_netmask(33).is_err());
    }

    #[test]
    fn test_bad_netmask() {
        assert!(netmask_to_cidr("255.255.0").is_err());
        assert!(netmask_to_cidr("255.255.256.0").is_err());
        assert!(netmask_to_cidr("abc").is_err());
        assert_eq!(netmask_to_cidr(" 255.255.255.128 ").unwrap(), 25);
    }

    #[test]
    fn test_parse_ip_addr() {
        let output = "2: eth0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500 qdisc mq state UP group default qlen 1000
    link/ether 00:01:C0:2A:7B:10 brd ff:ff:ff:ff:ff:ff
    inet 192.168.1.42/24 brd 192.168.1.255 scope global dynamic eth0
       valid_lft 85742sec preferred_lft 85742sec";
        let addr = parse_ip_addr(output).unwrap();
        assert_eq!(addr.address, "192.168.1.42");
        assert_eq!(addr.prefix, 24);
        assert_eq!(addr.netmask, "255.255.255.0");
        assert_eq!(addr.mac.as_deref(), Some("00:01:c0:2a:7b:10"));
        assert!(addr.up);
        assert!(!addr.docker_bridge);
    }

    #[test]
    fn test_parse_ip_addr_docker_and_missing() {
        let addr = parse_ip_addr("inet 172.17.0.2/16 brd 172.17.255.255 scope global eth0").unwrap();
        assert!(addr.docker_bridge);
        assert!(!addr.up);
        assert!(parse_ip_addr("3: wlan0: <NO-CARRIER> state DOWN").is_none());
    }

    #[test]
    fn test_default_gateway() {
        let routes = "default via 10.0.0.1 dev eth0 proto dhcp metric 100\n10.0.0.0/24 dev eth0";
        assert_eq!(parse_default_gateway(routes).as_deref(), Some("10.0.0.1"));
        assert_eq!(parse_default_gateway("10.0.0.0/24 dev eth0"), None);
    }
}
