//! Interface set and address lists

use super::IfAddr;
use crate::{Error, Result};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use tracing::debug;

/// Address lists of every attached interface, keyed by interface name
#[derive(Debug, Default)]
struct AddrLists {
    by_ifname: HashMap<String, Vec<IfAddr>>,
}

/// The interfaces known to the network stack
///
/// Two locks protect this state:
/// - the interface set lock guards the set of attached interfaces
///   (and their enumeration order)
/// - the global serialization lock guards every interface's address list
///
/// Whoever needs both takes the interface set lock first.
#[derive(Debug, Default)]
pub struct NetStack {
    ifnet: Mutex<Vec<String>>,
    serial: Mutex<AddrLists>,
}

impl NetStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new interface with no addresses
    pub fn attach(&self, name: &str) -> Result<()> {
        let mut ifnet = self.ifnet.lock();
        let mut lists = self.serial.lock();

        if lists.by_ifname.contains_key(name) {
            return Err(Error::Config(format!("interface {} already attached", name)));
        }
        ifnet.push(name.to_string());
        lists.by_ifname.insert(name.to_string(), Vec::new());
        debug!(interface = name, "interface attached");
        Ok(())
    }

    /// Detach an interface, returning the addresses it still had
    pub fn detach(&self, name: &str) -> Result<Vec<IfAddr>> {
        let mut ifnet = self.ifnet.lock();
        let mut lists = self.serial.lock();

        let addrs = lists
            .by_ifname
            .remove(name)
            .ok_or_else(|| Error::InterfaceNotFound {
                name: name.to_string(),
            })?;
        ifnet.retain(|n| n != name);
        debug!(interface = name, "interface detached");
        Ok(addrs)
    }

    /// Assign an address to an interface
    ///
    /// Assigning an address the interface already has is a no-op.
    pub fn add_address(&self, name: &str, addr: IfAddr) -> Result<()> {
        let mut lists = self.serial.lock();
        let addrs = lists
            .by_ifname
            .get_mut(name)
            .ok_or_else(|| Error::InterfaceNotFound {
                name: name.to_string(),
            })?;
        if !addrs.contains(&addr) {
            addrs.push(addr);
        }
        Ok(())
    }

    /// Remove an address from an interface, returning whether it was present
    pub fn remove_address(&self, name: &str, addr: &IfAddr) -> Result<bool> {
        let mut lists = self.serial.lock();
        let addrs = lists
            .by_ifname
            .get_mut(name)
            .ok_or_else(|| Error::InterfaceNotFound {
                name: name.to_string(),
            })?;
        let before = addrs.len();
        addrs.retain(|a| a != addr);
        Ok(addrs.len() != before)
    }

    /// Names of all attached interfaces, in attach order
    pub fn interface_names(&self) -> Vec<String> {
        self.ifnet.lock().clone()
    }

    /// Take the interface set lock
    pub fn lock_interfaces(&self) -> IfnetGuard<'_> {
        IfnetGuard {
            stack: self,
            names: self.ifnet.lock(),
        }
    }

    /// Take the global serialization lock
    pub fn serialize(&self) -> SerialGuard<'_> {
        SerialGuard {
            lists: self.serial.lock(),
        }
    }
}

/// Proof that the interface set lock is held
pub struct IfnetGuard<'a> {
    stack: &'a NetStack,
    names: MutexGuard<'a, Vec<String>>,
}

impl IfnetGuard<'_> {
    /// Attached interface names, in attach order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Take the global serialization lock while holding the interface set lock
    pub fn serialize(&self) -> SerialGuard<'_> {
        self.stack.serialize()
    }
}

/// Proof that the global serialization lock is held
///
/// Interface address lists can only be read through this guard.
pub struct SerialGuard<'a> {
    lists: MutexGuard<'a, AddrLists>,
}

impl SerialGuard<'_> {
    /// Addresses currently assigned to `name`, or `None` if it is not attached
    pub fn addresses(&self, name: &str) -> Option<&[IfAddr]> {
        self.lists.by_ifname.get(name).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_attach_and_addresses() {
        let stack = NetStack::new();
        stack.attach("eth0").unwrap();
        stack
            .add_address("eth0", IfAddr::Inet(Ipv4Addr::new(10, 0, 0, 1)))
            .unwrap();
        // Duplicate is ignored
        stack
            .add_address("eth0", IfAddr::Inet(Ipv4Addr::new(10, 0, 0, 1)))
            .unwrap();

        let serial = stack.serialize();
        assert_eq!(serial.addresses("eth0").unwrap().len(), 1);
        assert!(serial.addresses("eth1").is_none());
    }

    #[test]
    fn test_attach_twice() {
        let stack = NetStack::new();
        stack.attach("eth0").unwrap();
        assert!(matches!(stack.attach("eth0"), Err(Error::Config(_))));
    }

    #[test]
    fn test_detach() {
        let stack = NetStack::new();
        stack.attach("eth0").unwrap();
        stack.attach("eth1").unwrap();
        stack
            .add_address("eth0", IfAddr::Inet(Ipv4Addr::new(10, 0, 0, 1)))
            .unwrap();

        let addrs = stack.detach("eth0").unwrap();
        assert_eq!(addrs.len(), 1);
        assert_eq!(stack.interface_names(), vec!["eth1".to_string()]);
        assert!(matches!(
            stack.detach("eth0"),
            Err(Error::InterfaceNotFound { .. })
        ));
    }

    #[test]
    fn test_remove_address() {
        let stack = NetStack::new();
        stack.attach("eth0").unwrap();
        let addr = IfAddr::Inet(Ipv4Addr::new(10, 0, 0, 1));
        stack.add_address("eth0", addr).unwrap();

        assert!(stack.remove_address("eth0", &addr).unwrap());
        assert!(!stack.remove_address("eth0", &addr).unwrap());
        assert!(stack.serialize().addresses("eth0").unwrap().is_empty());
    }

    #[test]
    fn test_ifnet_guard_enumeration() {
        let stack = NetStack::new();
        for name in ["net0", "net1", "net2"] {
            stack.attach(name).unwrap();
        }

        let ifnet = stack.lock_interfaces();
        assert_eq!(ifnet.names(), ["net0", "net1", "net2"]);
        let serial = ifnet.serialize();
        assert!(serial.addresses("net1").is_some());
    }
}
