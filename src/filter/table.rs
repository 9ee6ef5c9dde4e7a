//! Filter tables
//!
//! A table is a named set of addresses that filter rules refer to by
//! identity. Members are exact addresses (no netmask).

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Maximum table name length, including the terminator reserved by the
/// rule compiler's name buffer
pub const TABLE_MAX_NAME_LEN: usize = 32;

/// Prefix of interface address table names
pub const IFNET_TABLE_PREFIX: &str = ".ifnet-";

#[cfg(test)]
thread_local! {
    static FAIL_NEXT_RESERVE: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

/// Make the next `Table::try_reserve` on this thread fail
#[cfg(test)]
pub(crate) fn fail_next_reserve() {
    FAIL_NEXT_RESERVE.with(|fail| fail.set(true));
}

/// Table identity, assigned when the rule compiler registers the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Table kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    /// Addresses assigned to an interface, maintained by the synchronizer
    IfAddr,
    /// Static hash table
    Hash,
    /// Static tree table
    Tree,
    /// Constant table
    Const,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TableKind::IfAddr => "ifaddr",
            TableKind::Hash => "hash",
            TableKind::Tree => "tree",
            TableKind::Const => "const",
        };
        f.write_str(s)
    }
}

/// Table member: address family plus fixed-width address bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableAddr {
    V4([u8; 4]),
    V6([u8; 16]),
}

impl TableAddr {
    /// Address length in bytes (4 or 16)
    pub fn addr_len(&self) -> usize {
        match self {
            TableAddr::V4(_) => 4,
            TableAddr::V6(_) => 16,
        }
    }
}

impl From<Ipv4Addr> for TableAddr {
    fn from(addr: Ipv4Addr) -> Self {
        TableAddr::V4(addr.octets())
    }
}

impl From<Ipv6Addr> for TableAddr {
    fn from(addr: Ipv6Addr) -> Self {
        TableAddr::V6(addr.octets())
    }
}

impl From<IpAddr> for TableAddr {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(a) => a.into(),
            IpAddr::V6(a) => a.into(),
        }
    }
}

impl From<TableAddr> for IpAddr {
    fn from(addr: TableAddr) -> Self {
        match addr {
            TableAddr::V4(b) => IpAddr::V4(Ipv4Addr::from(b)),
            TableAddr::V6(b) => IpAddr::V6(Ipv6Addr::from(b)),
        }
    }
}

impl fmt::Display for TableAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", IpAddr::from(*self))
    }
}

/// Canonical table name for the addresses of interface `ifname`
///
/// The rule compiler registers interface tables under this same name, so
/// truncation must match it exactly: the result is cut to
/// `TABLE_MAX_NAME_LEN - 1` bytes, backing off to a character boundary.
pub fn table_name_for(ifname: &str) -> String {
    let mut name = format!("{}{}", IFNET_TABLE_PREFIX, ifname);
    let max = TABLE_MAX_NAME_LEN - 1;
    if name.len() > max {
        let mut end = max;
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        name.truncate(end);
    }
    name
}

/// An address table
///
/// Once shared through a `TableSet` a table is only reachable behind an
/// `Arc` and cannot change; replacing its contents means building a new
/// table and swapping it in.
#[derive(Debug)]
pub struct Table {
    name: String,
    id: TableId,
    kind: TableKind,
    members: HashSet<TableAddr>,
}

impl Table {
    pub fn new(name: impl Into<String>, id: TableId, kind: TableKind) -> Self {
        Self {
            name: name.into(),
            id,
            kind,
            members: HashSet::new(),
        }
    }

    /// Reserve room for `additional` members, reporting allocation failure
    pub fn try_reserve(&mut self, additional: usize) -> Result<()> {
        #[cfg(test)]
        let additional = if FAIL_NEXT_RESERVE.with(|fail| fail.replace(false)) {
            usize::MAX
        } else {
            additional
        };
        self.members
            .try_reserve(additional)
            .map_err(|source| Error::TableAlloc {
                name: self.name.clone(),
                source,
            })
    }

    /// Insert a member, returning false if it was already present
    pub fn insert(&mut self, addr: TableAddr) -> bool {
        self.members.insert(addr)
    }

    pub fn contains(&self, addr: &TableAddr) -> bool {
        self.members.contains(addr)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableAddr> {
        self.members.iter()
    }
}
