//! Network stack model
//!
//! The packet filter does not own interfaces. This module models the part of
//! the surrounding stack it consumes:
//! - Address records assigned to an interface (any family)
//! - The set of attached interfaces, behind the interface set lock
//! - Per-interface address lists, behind the global serialization lock
//!
//! Lock order is always interface set lock, then serialization lock.

mod stack;

pub use stack::{IfnetGuard, NetStack, SerialGuard};

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Address family of an interface address record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddrFamily {
    /// IPv4
    Inet,
    /// IPv6
    Inet6,
    /// Link-layer (not filterable)
    Link,
}

/// One address assigned to an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IfAddr {
    Inet(Ipv4Addr),
    Inet6(Ipv6Addr),
    Link([u8; 6]),
}

impl IfAddr {
    /// Returns the address family of this record
    pub fn family(&self) -> AddrFamily {
        match self {
            IfAddr::Inet(_) => AddrFamily::Inet,
            IfAddr::Inet6(_) => AddrFamily::Inet6,
            IfAddr::Link(_) => AddrFamily::Link,
        }
    }

    /// The IP address of this record, if it has one
    pub fn ip(&self) -> Option<IpAddr> {
        match *self {
            IfAddr::Inet(a) => Some(IpAddr::V4(a)),
            IfAddr::Inet6(a) => Some(IpAddr::V6(a)),
            IfAddr::Link(_) => None,
        }
    }
}

impl From<IpAddr> for IfAddr {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(a) => IfAddr::Inet(a),
            IpAddr::V6(a) => IfAddr::Inet6(a),
        }
    }
}

impl From<Ipv4Addr> for IfAddr {
    fn from(addr: Ipv4Addr) -> Self {
        IfAddr::Inet(addr)
    }
}

impl From<Ipv6Addr> for IfAddr {
    fn from(addr: Ipv6Addr) -> Self {
        IfAddr::Inet6(addr)
    }
}

impl fmt::Display for IfAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IfAddr::Inet(a) => write!(f, "{}", a),
            IfAddr::Inet6(a) => write!(f, "{}", a),
            IfAddr::Link(m) => write!(
                f,
                "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                m[0], m[1], m[2], m[3], m[4], m[5]
            ),
        }
    }
}
