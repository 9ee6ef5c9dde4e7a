use clap::{Parser, Subcommand};
use ifsync::config;
use ifsync::filter::{self, FilterEngine};
use ifsync::telemetry::{init_logging, SyncMetrics};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "ifsync")]
#[command(about = "Interface address tables for a packet filter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Load the configuration, sync every interface table and print the result
    Sync {
        /// Path to config.toml
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,

        /// Flush the table of this interface after syncing (repeatable)
        #[arg(long = "flush", value_name = "IFNAME")]
        flush: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate config.toml
    Validate {
        /// Path to config.toml
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Config {
            action: ConfigAction::Validate { config },
        } => {
            init_logging(None);
            cmd_config_validate(&config)
        }
        Commands::Sync { config, flush } => cmd_sync(&config, &flush),
    };

    if let Err(e) = result {
        eprintln!("[ERROR] {}", e);
        std::process::exit(1);
    }
}

fn cmd_config_validate(config_path: &Path) -> Result<(), String> {
    println!("[INFO] Validating {}...", config_path.display());

    let cfg = config::load(config_path).map_err(|e| format!("Failed to parse config: {}", e))?;

    let validation = config::validate(&cfg);
    validation.print_diagnostics();

    if validation.has_errors() {
        Err("Validation failed".to_string())
    } else {
        println!("[INFO] Configuration is valid");
        Ok(())
    }
}

fn cmd_sync(config_path: &Path, flush: &[String]) -> Result<(), String> {
    let cfg = config::load(config_path).map_err(|e| format!("Failed to parse config: {}", e))?;
    init_logging(Some(&cfg.logging));

    let validation = config::validate(&cfg);
    validation.print_diagnostics();
    if validation.has_errors() {
        return Err("Validation failed".to_string());
    }

    let stack = config::build_net_stack(&cfg).map_err(|e| e.to_string())?;
    let filter_config = config::build_filter_config(&cfg).map_err(|e| e.to_string())?;

    // Start from an empty configuration so loading goes through the same
    // swap-and-sync path as a reload would.
    let metrics = Arc::new(SyncMetrics::new());
    let engine = FilterEngine::new(filter::Config::empty(), metrics.clone());

    let summary = engine
        .load(&stack, filter_config)
        .map_err(|e| format!("Failed to load filter configuration: {}", e))?;
    info!(
        published = summary.published,
        skipped = summary.not_of_interest,
        failed = summary.failed,
        "initial sync done"
    );

    for ifname in flush {
        let outcome = filter::ifaddr::flush(&engine, &stack, ifname)
            .map_err(|e| format!("Failed to flush {}: {}", ifname, e))?;
        info!(interface = %ifname, ?outcome, "flushed");
    }

    engine.read().for_each_table(|table| {
        println!(
            "table {} ({}, {}): {} member(s)",
            table.id(),
            table.name(),
            table.kind(),
            table.len()
        );
        let mut members: Vec<_> = table.iter().collect();
        members.sort();
        for addr in members {
            println!("  {}", addr);
        }
    });

    for (name, value) in metrics.export() {
        println!("{} {}", name, value);
    }
    Ok(())
}
