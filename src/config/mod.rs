//! Configuration management
//!
//! Handles config.toml: table identities registered for the filter, and the
//! interfaces with their addresses.

mod types;
mod validation;

pub use types::*;
pub use validation::{validate, ValidationResult};

use crate::filter::{Config, Table, TableAddr, TableId, TableKind, TableSet};
use crate::net::{IfAddr, NetStack};
use crate::{Error, Result};
use std::net::IpAddr;
use std::path::Path;

/// Load configuration from a TOML file
pub fn load<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    let config: FileConfig = toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
    Ok(config)
}

/// Register every configured table identity
///
/// Static tables get their entries; interface tables start out empty and
/// are filled by the synchronizer.
pub fn build_filter_config(config: &FileConfig) -> Result<Config> {
    let mut builder = TableSet::builder();

    for table_cfg in &config.filter.tables {
        let name = table_cfg.table_name().ok_or_else(|| {
            Error::Config(format!("table {}: no name or interface", table_cfg.id))
        })?;
        let mut table = Table::new(name, TableId(table_cfg.id), table_cfg.kind);

        if table_cfg.kind != TableKind::IfAddr {
            table.try_reserve(table_cfg.entries.len())?;
            for entry in &table_cfg.entries {
                table.insert(TableAddr::from(parse_addr(entry)?));
            }
        }
        builder.register(table)?;
    }

    Ok(Config::new(builder.build(), config.filter.default_pass))
}

/// Attach the configured interfaces and assign their addresses
///
/// Interfaces are attached in name order.
pub fn build_net_stack(config: &FileConfig) -> Result<NetStack> {
    let stack = NetStack::new();

    let mut names: Vec<&String> = config.interfaces.keys().collect();
    names.sort();

    for name in names {
        stack.attach(name)?;
        for addr in &config.interfaces[name].addresses {
            stack.add_address(name, IfAddr::from(parse_addr(addr)?))?;
        }
    }
    Ok(stack)
}

fn parse_addr(s: &str) -> Result<IpAddr> {
    s.parse()
        .map_err(|e| Error::Parse(format!("address {}: {}", s, e)))
}
