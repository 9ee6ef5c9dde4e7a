//! Interface address tables
//!
//! Filter rules can match against "addresses of interface X" through a table
//! named `.ifnet-X`. The rule compiler only registers the table identity;
//! this module fills it with the interface's current addresses and replaces
//! it whenever they change.
//!
//! Each sync is a full rebuild: look up the table under the global
//! serialization lock, build a fresh table, swap it in, pass the barrier,
//! then destroy the old one.

use super::engine::{ConfigSection, FilterEngine};
use super::table::{table_name_for, Table, TableAddr, TableId, TableKind};
use crate::net::{AddrFamily, IfAddr, NetStack, SerialGuard};
use crate::{Error, Result};
use tracing::{debug, info, warn};

/// Result of syncing or flushing one interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No table is registered for the interface; nothing was touched
    NotOfInterest,
    /// A new table was published
    Published { id: TableId, members: usize },
}

/// Totals for a sync of every interface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub published: usize,
    pub not_of_interest: usize,
    pub failed: usize,
}

/// What a rebuilt table is filled with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fill {
    Addresses,
    Empty,
}

/// Copy the address of `addr` into table form
///
/// Only IPv4 and IPv6 addresses can be matched by rules; other families
/// yield `None`.
pub fn extract(addr: &IfAddr) -> Option<TableAddr> {
    match addr.family() {
        AddrFamily::Inet | AddrFamily::Inet6 => addr.ip().map(TableAddr::from),
        AddrFamily::Link => None,
    }
}

/// Build an unpublished interface table from an address list
pub fn build_table(name: &str, id: TableId, addrs: &[IfAddr]) -> Result<Table> {
    let mut table = Table::new(name, id, TableKind::IfAddr);
    table.try_reserve(addrs.len())?;
    for addr in addrs.iter().filter_map(extract) {
        table.insert(addr);
    }
    Ok(table)
}

/// The configuration critical section, held open between `lookup` and
/// `publish`
///
/// Borrows the serialization guard it was obtained under, so the
/// serialization lock is always the outer one.
pub struct HeldSection<'a> {
    section: ConfigSection<'a>,
    id: TableId,
    name: String,
}

impl HeldSection<'_> {
    /// Identity of the table being replaced
    pub fn id(&self) -> TableId {
        self.id
    }

    /// Name of the table being replaced
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Check whether the live configuration has a table for `ifname`
///
/// On a hit the critical section stays held in the returned value. On a miss
/// it has already been exited. Fails if this thread has a read section open.
pub fn lookup<'a>(
    engine: &'a FilterEngine,
    _serial: &'a SerialGuard<'_>,
    ifname: &str,
) -> Result<Option<HeldSection<'a>>> {
    let name = table_name_for(ifname);
    let section = engine.enter()?;
    let Some(id) = section.config().tableset().id_by_name(&name) else {
        return Ok(None);
    };
    Ok(Some(HeldSection { section, id, name }))
}

/// Swap `table` into the live configuration and exit the critical section
///
/// Returns the displaced table once no reader can reach it.
pub fn publish(held: HeldSection<'_>, table: Table) -> Result<Table> {
    if table.id() != held.id {
        return Err(Error::IdentityMismatch {
            held: held.id,
            table: table.id(),
        });
    }
    let displaced = held.section.swap_table(table)?;
    let displaced = held.section.sync(displaced);
    held.section.exit();
    Ok(displaced)
}

/// Rebuild the table of one interface from its current addresses
pub fn sync(engine: &FilterEngine, stack: &NetStack, ifname: &str) -> Result<SyncOutcome> {
    let serial = stack.serialize();
    engine.metrics().syncs.inc();
    rebuild(engine, &serial, ifname, Fill::Addresses)
}

/// Replace the table of one interface with an empty one
///
/// The identity stays registered; the interface need not be attached.
pub fn flush(engine: &FilterEngine, stack: &NetStack, ifname: &str) -> Result<SyncOutcome> {
    let serial = stack.serialize();
    engine.metrics().flushes.inc();
    rebuild(engine, &serial, ifname, Fill::Empty)
}

/// Rebuild the tables of every attached interface
///
/// A failure on one interface is logged and counted; the others still sync.
pub fn sync_all(engine: &FilterEngine, stack: &NetStack) -> SyncSummary {
    let ifnet = stack.lock_interfaces();
    let mut summary = SyncSummary::default();

    for ifname in ifnet.names() {
        let serial = ifnet.serialize();
        engine.metrics().syncs.inc();
        match rebuild(engine, &serial, ifname, Fill::Addresses) {
            Ok(SyncOutcome::Published { .. }) => summary.published += 1,
            Ok(SyncOutcome::NotOfInterest) => summary.not_of_interest += 1,
            Err(e) => {
                warn!(interface = %ifname, error = %e, "interface table sync failed");
                summary.failed += 1;
            }
        }
    }
    summary
}

fn rebuild(
    engine: &FilterEngine,
    serial: &SerialGuard<'_>,
    ifname: &str,
    fill: Fill,
) -> Result<SyncOutcome> {
    let metrics = engine.metrics();

    let Some(held) = lookup(engine, serial, ifname)? else {
        metrics.not_of_interest.inc();
        debug!(interface = ifname, "no interface table registered");
        return Ok(SyncOutcome::NotOfInterest);
    };

    let addrs = match fill {
        Fill::Empty => &[][..],
        Fill::Addresses => serial
            .addresses(ifname)
            .ok_or_else(|| Error::InterfaceNotFound {
                name: ifname.to_string(),
            })?,
    };

    let table = build_table(held.name(), held.id(), addrs).inspect_err(|_| {
        metrics.alloc_failures.inc();
    })?;
    let id = held.id();
    let members = table.len();
    debug!(interface = ifname, table = %id, members, "interface table built");

    let displaced = publish(held, table)?;
    metrics.published.inc();
    metrics.members_published.add(members as u64);
    info!(
        interface = ifname,
        table = %id,
        members,
        previous = displaced.len(),
        "interface table published"
    );

    drop(displaced);
    metrics.tables_reclaimed.inc();

    Ok(SyncOutcome::Published { id, members })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::table::fail_next_reserve;
    use crate::filter::{Config, TableSet};
    use crate::telemetry::SyncMetrics;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::sync::Arc;

    fn setup() -> (FilterEngine, NetStack) {
        let mut builder = TableSet::builder();
        builder
            .register(Table::new(".ifnet-eth0", TableId(2), TableKind::IfAddr))
            .unwrap();
        let engine = FilterEngine::new(
            Config::new(builder.build(), true),
            Arc::new(SyncMetrics::new()),
        );

        let stack = NetStack::new();
        stack.attach("eth0").unwrap();
        stack.attach("eth1").unwrap();
        (engine, stack)
    }

    #[test]
    fn test_extract() {
        assert_eq!(
            extract(&IfAddr::Inet(Ipv4Addr::new(10, 0, 0, 1))),
            Some(TableAddr::V4([10, 0, 0, 1]))
        );
        assert_eq!(
            extract(&IfAddr::Inet6(Ipv6Addr::LOCALHOST)),
            Some(TableAddr::V6(Ipv6Addr::LOCALHOST.octets()))
        );
        assert_eq!(extract(&IfAddr::Link([2, 0, 0, 0, 0, 1])), None);
    }

    #[test]
    fn test_build_table_skips_link_addresses() {
        let addrs = [
            IfAddr::Inet(Ipv4Addr::new(10, 0, 0, 1)),
            IfAddr::Link([2, 0, 0, 0, 0, 1]),
            IfAddr::Inet(Ipv4Addr::new(10, 0, 0, 1)),
        ];
        let table = build_table(".ifnet-eth0", TableId(2), &addrs).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.kind(), TableKind::IfAddr);
        assert_eq!(table.id(), TableId(2));
    }

    #[test]
    fn test_lookup_miss_releases_section() {
        let (engine, stack) = setup();
        let serial = stack.serialize();
        assert!(lookup(&engine, &serial, "eth1").unwrap().is_none());
        // The critical section is free again
        drop(engine.enter().unwrap());
    }

    #[test]
    fn test_lookup_publish() {
        let (engine, stack) = setup();
        let serial = stack.serialize();

        let held = lookup(&engine, &serial, "eth0").unwrap().unwrap();
        assert_eq!(held.id(), TableId(2));
        assert_eq!(held.name(), ".ifnet-eth0");

        let table = build_table(
            held.name(),
            held.id(),
            &[IfAddr::Inet(Ipv4Addr::new(192, 168, 0, 1))],
        )
        .unwrap();
        let displaced = publish(held, table).unwrap();
        assert!(displaced.is_empty());

        assert!(engine
            .read()
            .contains(TableId(2), &TableAddr::V4([192, 168, 0, 1])));
    }

    #[test]
    fn test_publish_identity_mismatch() {
        let (engine, stack) = setup();
        let serial = stack.serialize();

        let held = lookup(&engine, &serial, "eth0").unwrap().unwrap();
        let table = Table::new(".ifnet-eth0", TableId(9), TableKind::IfAddr);
        assert!(matches!(
            publish(held, table),
            Err(Error::IdentityMismatch { .. })
        ));
        // Section was exited on the error path
        drop(engine.enter().unwrap());
    }

    #[test]
    fn test_sync_detached_interface() {
        let (engine, stack) = setup();
        stack.detach("eth0").unwrap();

        assert!(matches!(
            sync(&engine, &stack, "eth0"),
            Err(Error::InterfaceNotFound { .. })
        ));
        // Flush still works for a detached interface
        assert_eq!(
            flush(&engine, &stack, "eth0").unwrap(),
            SyncOutcome::Published {
                id: TableId(2),
                members: 0
            }
        );
    }

    #[test]
    fn test_metrics() {
        let (engine, stack) = setup();
        stack
            .add_address("eth0", IfAddr::Inet(Ipv4Addr::new(10, 0, 0, 1)))
            .unwrap();

        sync(&engine, &stack, "eth0").unwrap();
        sync(&engine, &stack, "eth1").unwrap();
        flush(&engine, &stack, "eth0").unwrap();

        let metrics = engine.metrics();
        assert_eq!(metrics.syncs.get(), 2);
        assert_eq!(metrics.flushes.get(), 1);
        assert_eq!(metrics.not_of_interest.get(), 1);
        assert_eq!(metrics.published.get(), 2);
        assert_eq!(metrics.members_published.get(), 1);
        assert_eq!(metrics.tables_reclaimed.get(), 2);
    }

    #[test]
    fn test_alloc_failure_keeps_published_table() {
        let (engine, stack) = setup();
        stack
            .add_address("eth0", IfAddr::Inet(Ipv4Addr::new(10, 0, 0, 1)))
            .unwrap();
        sync(&engine, &stack, "eth0").unwrap();
        let before = engine.read().config().tableset().get(TableId(2)).unwrap();

        stack
            .add_address("eth0", IfAddr::Inet(Ipv4Addr::new(10, 0, 0, 2)))
            .unwrap();
        fail_next_reserve();
        assert!(matches!(
            sync(&engine, &stack, "eth0"),
            Err(Error::TableAlloc { ref name, .. }) if name == ".ifnet-eth0"
        ));

        let after = engine.read().config().tableset().get(TableId(2)).unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.len(), 1);
        drop((before, after));

        // Section was exited on the error path
        drop(engine.enter().unwrap());
        let metrics = engine.metrics();
        assert_eq!(metrics.alloc_failures.get(), 1);
        assert_eq!(metrics.published.get(), 1);

        // The next sync goes through
        sync(&engine, &stack, "eth0").unwrap();
        assert!(engine
            .read()
            .contains(TableId(2), &TableAddr::V4([10, 0, 0, 2])));
    }

    #[test]
    fn test_alloc_failure_on_flush() {
        let (engine, stack) = setup();
        fail_next_reserve();
        assert!(matches!(
            flush(&engine, &stack, "eth0"),
            Err(Error::TableAlloc { .. })
        ));
        assert_eq!(engine.metrics().alloc_failures.get(), 1);
        assert_eq!(engine.metrics().published.get(), 0);
    }

    #[test]
    fn test_sync_from_inside_read() {
        let (engine, stack) = setup();
        let read = engine.read();
        assert!(matches!(
            sync(&engine, &stack, "eth0"),
            Err(Error::ReadInProgress)
        ));
        let summary = sync_all(&engine, &stack);
        assert_eq!(summary.failed, 2);
        drop(read);

        assert!(sync(&engine, &stack, "eth0").is_ok());
    }
}
