//! Filter configuration and its synchronization
//!
//! Access to the live configuration falls in three groups:
//! - Reads from the packet path, through `FilterEngine::read`
//! - Writes to one table, inside the critical section from `FilterEngine::enter`
//! - Replacement of the whole configuration, through `FilterEngine::load`
//!
//! Readers never lock. Writers serialize on the configuration lock and, when
//! they displace something readers may still be looking at, pass it through
//! the barrier (`ConfigSection::sync`) before destroying it.
//!
//! The barrier only waits on readers inside `ReadSection::with_table` (for a
//! displaced table) or holding a `ReadSection` (for a displaced
//! configuration). Neither can be entered by a thread that is writing, and a
//! thread that is reading cannot start a write.

use super::ifaddr::{self, SyncSummary};
use super::table::{Table, TableAddr, TableId};
use super::tableset::TableSet;
use crate::net::NetStack;
use crate::telemetry::SyncMetrics;
use crate::{Error, Result};
use arc_swap::{ArcSwap, Guard};
use parking_lot::{Mutex, MutexGuard};
use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Spins before the barrier starts yielding the CPU
const BARRIER_SPIN_LIMIT: u32 = 64;

thread_local! {
    /// Read sections open on this thread
    static READ_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Fails if this thread has a read section open
///
/// A write started from inside a read would wait in the barrier for that
/// same read to finish.
fn ensure_not_reading() -> Result<()> {
    if READ_DEPTH.with(Cell::get) > 0 {
        return Err(Error::ReadInProgress);
    }
    Ok(())
}

/// A filter configuration
#[derive(Debug)]
pub struct Config {
    tableset: TableSet,
    default_pass: bool,
}

impl Config {
    pub fn new(tableset: TableSet, default_pass: bool) -> Self {
        Self {
            tableset,
            default_pass,
        }
    }

    /// Configuration with no tables that passes everything
    pub fn empty() -> Self {
        Self::new(TableSet::default(), true)
    }

    pub fn tableset(&self) -> &TableSet {
        &self.tableset
    }

    pub fn default_pass(&self) -> bool {
        self.default_pass
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::empty()
    }
}

/// Owner of the live filter configuration
#[derive(Debug)]
pub struct FilterEngine {
    config: ArcSwap<Config>,
    config_lock: Mutex<()>,
    metrics: Arc<SyncMetrics>,
}

impl FilterEngine {
    pub fn new(config: Config, metrics: Arc<SyncMetrics>) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            config_lock: Mutex::new(()),
            metrics,
        }
    }

    pub fn metrics(&self) -> &SyncMetrics {
        &self.metrics
    }

    /// Enter the configuration critical section
    ///
    /// The section is exited when the returned guard is dropped. Fails with
    /// `Error::ReadInProgress` if this thread has a read section open.
    pub fn enter(&self) -> Result<ConfigSection<'_>> {
        ensure_not_reading()?;
        let guard = self.config_lock.lock();
        Ok(ConfigSection {
            _guard: guard,
            config: self.config.load_full(),
        })
    }

    /// Begin a read of the live configuration
    ///
    /// Does not block writers that replace single tables. Replacing the whole
    /// configuration waits for open read sections, so they should be short.
    pub fn read(&self) -> ReadSection {
        READ_DEPTH.with(|depth| depth.set(depth.get() + 1));
        ReadSection {
            config: self.config.load(),
            _thread: PhantomData,
        }
    }

    /// Replace the whole configuration
    ///
    /// The old configuration is destroyed once no reader can reach it.
    /// Interface tables of the new configuration start out as registered,
    /// so every interface is synchronized afterwards.
    pub fn load(&self, stack: &NetStack, config: Config) -> Result<SyncSummary> {
        {
            ensure_not_reading()?;
            let _guard = self.config_lock.lock();
            let old = self.config.swap(Arc::new(config));
            let old = quiesce(old);
            debug!(tables = old.tableset().len(), "old configuration drained");
            self.metrics.config_loads.inc();
        }

        let summary = ifaddr::sync_all(self, stack);
        info!(
            published = summary.published,
            failed = summary.failed,
            "configuration loaded"
        );
        Ok(summary)
    }
}

/// The configuration critical section
///
/// Holding one excludes every other writer. Dropping it exits the section.
pub struct ConfigSection<'a> {
    _guard: MutexGuard<'a, ()>,
    config: Arc<Config>,
}

impl ConfigSection<'_> {
    /// The configuration that was live when the section was entered
    ///
    /// It stays live until the section is exited, since replacing it also
    /// requires the section.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Install `table` at its identity, returning the displaced table
    pub fn swap_table(&self, table: Table) -> Result<Arc<Table>> {
        self.config.tableset().swap(table)
    }

    /// Wait until nothing but the caller references `displaced`
    ///
    /// Readers that loaded `displaced` before it was swapped out are the only
    /// ones left holding it; once they finish, it is handed back by value and
    /// can be destroyed. For a table that means readers still inside
    /// `with_table`; for a configuration, open read sections.
    pub fn sync<T>(&self, displaced: Arc<T>) -> T {
        quiesce(displaced)
    }

    /// Exit the critical section
    pub fn exit(self) {}
}

/// Read access to the live configuration
///
/// Tied to the thread that opened it.
pub struct ReadSection {
    config: Guard<Arc<Config>>,
    _thread: PhantomData<*const ()>,
}

impl ReadSection {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn default_pass(&self) -> bool {
        self.config.default_pass()
    }

    /// Check whether `addr` is a member of table `id`
    pub fn contains(&self, id: TableId, addr: &TableAddr) -> bool {
        self.config.tableset().contains(id, addr)
    }

    /// Run `f` on the table at `id`
    pub fn with_table<R>(&self, id: TableId, f: impl FnOnce(&Table) -> R) -> Option<R> {
        self.config.tableset().with_table(id, f)
    }

    pub fn with_table_by_name<R>(&self, name: &str, f: impl FnOnce(&Table) -> R) -> Option<R> {
        self.config.tableset().with_table_by_name(name, f)
    }

    /// Run `f` on every table, ordered by id
    pub fn for_each_table(&self, f: impl FnMut(&Table)) {
        self.config.tableset().for_each_table(f)
    }
}

impl Drop for ReadSection {
    fn drop(&mut self) {
        READ_DEPTH.with(|depth| depth.set(depth.get() - 1));
    }
}

fn quiesce<T>(mut displaced: Arc<T>) -> T {
    let mut spins: u32 = 0;
    loop {
        match Arc::try_unwrap(displaced) {
            Ok(value) => {
                trace!(spins, "barrier passed");
                return value;
            }
            Err(shared) => {
                displaced = shared;
                if spins < BARRIER_SPIN_LIMIT {
                    std::hint::spin_loop();
                } else {
                    std::thread::yield_now();
                }
                spins = spins.saturating_add(1);
            }
        }
    }
}
