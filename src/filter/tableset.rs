//! Table registry
//!
//! Maps table names and identities to the currently installed table.
//! The set of identities is fixed when the registry is built; afterwards
//! the only mutation is swapping the table installed at an identity.

use super::table::{Table, TableAddr, TableId};
use crate::{Error, Result};
use arc_swap::ArcSwap;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Registry of the tables of one configuration
#[derive(Debug, Default)]
pub struct TableSet {
    slots: BTreeMap<TableId, ArcSwap<Table>>,
    names: HashMap<String, TableId>,
}

impl TableSet {
    pub fn builder() -> TableSetBuilder {
        TableSetBuilder::default()
    }

    /// Identity of the table registered under `name`
    pub fn id_by_name(&self, name: &str) -> Option<TableId> {
        self.names.get(name).copied()
    }

    /// Run `f` on the table currently installed under `name`
    pub fn with_table_by_name<R>(&self, name: &str, f: impl FnOnce(&Table) -> R) -> Option<R> {
        self.id_by_name(name).and_then(|id| self.with_table(id, f))
    }

    /// Run `f` on the table currently installed at `id`
    ///
    /// The table is only borrowed for the duration of `f`. A publisher
    /// displacing it waits for `f` to return before destroying it, so `f`
    /// should be short.
    pub fn with_table<R>(&self, id: TableId, f: impl FnOnce(&Table) -> R) -> Option<R> {
        self.slots.get(&id).map(|slot| f(&slot.load()))
    }

    /// Run `f` on every installed table, ordered by id
    pub fn for_each_table(&self, mut f: impl FnMut(&Table)) {
        for slot in self.slots.values() {
            f(&slot.load());
        }
    }

    /// Check membership of `addr` in table `id`
    pub fn contains(&self, id: TableId, addr: &TableAddr) -> bool {
        self.with_table(id, |table| table.contains(addr)).unwrap_or(false)
    }

    #[cfg(test)]
    pub(crate) fn get(&self, id: TableId) -> Option<Arc<Table>> {
        self.slots.get(&id).map(|slot| slot.load_full())
    }

    /// Install `table` at its identity, returning the table it displaced
    ///
    /// Callers must hold the configuration critical section.
    pub(crate) fn swap(&self, table: Table) -> Result<Arc<Table>> {
        let id = table.id();
        let slot = self.slots.get(&id).ok_or(Error::UnknownTable { id })?;
        Ok(slot.swap(Arc::new(table)))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Builds a `TableSet`, rejecting duplicate identities and names
#[derive(Debug, Default)]
pub struct TableSetBuilder {
    tables: Vec<Table>,
}

impl TableSetBuilder {
    /// Register a table, populated or not
    pub fn register(&mut self, table: Table) -> Result<&mut Self> {
        if self.tables.iter().any(|t| t.id() == table.id()) {
            return Err(Error::DuplicateTable(format!("id {}", table.id())));
        }
        if self.tables.iter().any(|t| t.name() == table.name()) {
            return Err(Error::DuplicateTable(format!("name {}", table.name())));
        }
        self.tables.push(table);
        Ok(self)
    }

    pub fn build(self) -> TableSet {
        let mut set = TableSet::default();
        for table in self.tables {
            set.names.insert(table.name().to_string(), table.id());
            set.slots.insert(table.id(), ArcSwap::from_pointee(table));
        }
        set
    }
}
