//! Packet filter tables
//!
//! Provides the parts of the filter that interface address tables touch:
//! - Tables and the table registry of a configuration
//! - The live configuration with its critical section, reader side and barrier
//! - Synchronization of interface address tables

mod engine;
pub mod ifaddr;
mod table;
mod tableset;

pub use engine::{Config, ConfigSection, FilterEngine, ReadSection};
pub use ifaddr::{SyncOutcome, SyncSummary};
pub use table::{
    table_name_for, Table, TableAddr, TableId, TableKind, IFNET_TABLE_PREFIX, TABLE_MAX_NAME_LEN,
};
pub use tableset::{TableSet, TableSetBuilder};
