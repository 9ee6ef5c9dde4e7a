//! Configuration types

use crate::filter::{table_name_for, TableKind};
use crate::telemetry::LogConfig;
use serde::Deserialize;
use std::collections::HashMap;

/// Configuration file (config.toml)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub logging: LogConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub interfaces: HashMap<String, InterfaceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_pass")]
    pub default_pass: bool,
    #[serde(default)]
    pub tables: Vec<TableConfig>,
}

fn default_pass() -> bool {
    true
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            default_pass: default_pass(),
            tables: Vec::new(),
        }
    }
}

/// A table identity registered by the rule compiler
#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
    pub id: u32,
    pub kind: TableKind,
    /// Table name (static tables)
    pub name: Option<String>,
    /// Interface whose addresses fill the table (ifaddr tables)
    pub interface: Option<String>,
    /// Initial members (static tables)
    #[serde(default)]
    pub entries: Vec<String>,
}

impl TableConfig {
    /// Name the table is registered under
    ///
    /// Interface tables are named after their interface, the same way the
    /// synchronizer names them.
    pub fn table_name(&self) -> Option<String> {
        match self.kind {
            TableKind::IfAddr => self.interface.as_deref().map(table_name_for),
            _ => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterfaceConfig {
    #[serde(default)]
    pub addresses: Vec<String>,
}
