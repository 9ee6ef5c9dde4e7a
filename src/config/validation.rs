//! Configuration validation

use super::FileConfig;
use crate::filter::{TableKind, IFNET_TABLE_PREFIX, TABLE_MAX_NAME_LEN};
use crate::telemetry::is_known_level;
use std::collections::HashSet;
use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn print_diagnostics(&self) {
        for warning in &self.warnings {
            println!("[WARN] {}", warning);
        }
        for error in &self.errors {
            println!("[ERROR] {}", error);
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate configuration and return warnings/errors
pub fn validate(config: &FileConfig) -> ValidationResult {
    let mut result = ValidationResult::new();

    validate_logging(config, &mut result);
    validate_tables(config, &mut result);
    validate_interfaces(config, &mut result);

    result
}

fn validate_logging(config: &FileConfig, result: &mut ValidationResult) {
    if !is_known_level(&config.logging.level) {
        result.warn(format!(
            "logging.level: unknown level '{}', using info",
            config.logging.level
        ));
    }
    if !matches!(
        config.logging.format.as_str(),
        "pretty" | "compact" | "json"
    ) {
        result.warn(format!(
            "logging.format: unknown format '{}', using pretty",
            config.logging.format
        ));
    }
}

fn validate_tables(config: &FileConfig, result: &mut ValidationResult) {
    let mut ids = HashSet::new();
    let mut names = HashSet::new();

    for (i, table) in config.filter.tables.iter().enumerate() {
        let ctx = format!("filter.tables[{}] (id {})", i, table.id);

        if !ids.insert(table.id) {
            result.error(format!("{}: duplicate table id", ctx));
        }

        match table.kind {
            TableKind::IfAddr => validate_ifaddr_table(config, table, &ctx, result),
            _ => validate_static_table(table, &ctx, result),
        }

        if let Some(name) = table.table_name() {
            if !names.insert(name.clone()) {
                result.error(format!("{}: duplicate table name {}", ctx, name));
            }
        }
    }
}

fn validate_ifaddr_table(
    config: &FileConfig,
    table: &super::TableConfig,
    ctx: &str,
    result: &mut ValidationResult,
) {
    let Some(ifname) = table.interface.as_deref() else {
        result.error(format!("{}: ifaddr table requires interface", ctx));
        return;
    };

    if table.name.is_some() {
        result.warn(format!(
            "{}: name is ignored for ifaddr tables, using {}{}",
            ctx, IFNET_TABLE_PREFIX, ifname
        ));
    }
    if !table.entries.is_empty() {
        result.error(format!(
            "{}: ifaddr table entries come from the interface, not the config",
            ctx
        ));
    }
    if IFNET_TABLE_PREFIX.len() + ifname.len() > TABLE_MAX_NAME_LEN - 1 {
        result.warn(format!(
            "{}: interface name {} is too long, table name will be truncated",
            ctx, ifname
        ));
    }
    if !config.interfaces.contains_key(ifname) {
        result.warn(format!(
            "{}: interface {} is not configured, table stays empty until it appears",
            ctx, ifname
        ));
    }
}

fn validate_static_table(table: &super::TableConfig, ctx: &str, result: &mut ValidationResult) {
    let Some(name) = table.name.as_deref() else {
        result.error(format!("{}: {} table requires name", ctx, table.kind));
        return;
    };

    if name.starts_with('.') {
        result.error(format!(
            "{}: table name {} uses the reserved '.' prefix",
            ctx, name
        ));
    }
    if name.len() > TABLE_MAX_NAME_LEN - 1 {
        result.error(format!(
            "{}: table name {} exceeds {} bytes",
            ctx,
            name,
            TABLE_MAX_NAME_LEN - 1
        ));
    }
    if table.interface.is_some() {
        result.warn(format!("{}: interface is ignored for {} tables", ctx, table.kind));
    }
    for entry in &table.entries {
        if entry.parse::<IpAddr>().is_err() {
            result.error(format!("{}: invalid entry {}", ctx, entry));
        }
    }
}

fn validate_interfaces(config: &FileConfig, result: &mut ValidationResult) {
    for (name, iface) in &config.interfaces {
        if name.is_empty() {
            result.error("interfaces: empty interface name");
        }
        for addr in &iface.addresses {
            if addr.parse::<IpAddr>().is_err() {
                result.error(format!("interfaces.{}: invalid address {}", name, addr));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> FileConfig {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_valid_config() {
        let config = parse(
            r#"
            [[filter.tables]]
            id = 7
            kind = "ifaddr"
            interface = "net0"

            [interfaces.net0]
            addresses = ["10.0.0.1", "fe80::1"]
            "#,
        );
        let result = validate(&config);
        assert!(!result.has_errors());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_duplicate_id() {
        let config = parse(
            r#"
            [[filter.tables]]
            id = 1
            kind = "hash"
            name = "a"

            [[filter.tables]]
            id = 1
            kind = "hash"
            name = "b"
            "#,
        );
        let result = validate(&config);
        assert!(result.errors.iter().any(|e| e.contains("duplicate table id")));
    }

    #[test]
    fn test_ifaddr_without_interface() {
        let config = parse(
            r#"
            [[filter.tables]]
            id = 1
            kind = "ifaddr"
            "#,
        );
        assert!(validate(&config).has_errors());
    }

    #[test]
    fn test_reserved_prefix() {
        let config = parse(
            r#"
            [[filter.tables]]
            id = 1
            kind = "hash"
            name = ".ifnet-eth0"
            "#,
        );
        let result = validate(&config);
        assert!(result.errors.iter().any(|e| e.contains("reserved")));
    }

    #[test]
    fn test_long_interface_name_warns() {
        let config = parse(
            r#"
            [[filter.tables]]
            id = 1
            kind = "ifaddr"
            interface = "a-very-long-interface-name-0"

            [interfaces.a-very-long-interface-name-0]
            "#,
        );
        let result = validate(&config);
        assert!(!result.has_errors());
        assert!(result.warnings.iter().any(|w| w.contains("truncated")));
    }

    #[test]
    fn test_unknown_interface_warns() {
        let config = parse(
            r#"
            [[filter.tables]]
            id = 1
            kind = "ifaddr"
            interface = "eth9"
            "#,
        );
        let result = validate(&config);
        assert!(!result.has_errors());
        assert!(result.warnings.iter().any(|w| w.contains("not configured")));
    }

    #[test]
    fn test_invalid_addresses() {
        let config = parse(
            r#"
            [[filter.tables]]
            id = 1
            kind = "hash"
            name = "blocklist"
            entries = ["192.0.2.300"]

            [interfaces.eth0]
            addresses = ["10.0.0.1/24"]
            "#,
        );
        let result = validate(&config);
        assert_eq!(result.errors.len(), 2);
    }
}
