// # zonesync - DNS zone sync tool
//
// Thin command-line wrapper around `zonesync_core::SyncEngine`:
//
// 1. Parse arguments and set up logging
// 2. Read the configuration file
// 3. Register providers and inventories
// 4. Run one diff or push and print the changes
//
// ## Usage
//
// ```bash
// zonesync [--config FILE] [--log-level LEVEL] diff
// zonesync [--config FILE] [--log-level LEVEL] push
// ```
//
// Without `--config`, `zonesync.yaml`, `zonesync.yml` or `zonesync.json` is
// looked up in `/usr/local/etc/zonesync`, `/etc/zonesync` and the current
// directory, in that order.
//
// ## Environment
//
// - `ZONESYNC_LOG_LEVEL`: log level when `--log-level` is not given
// - `ZONESYNC_CLOUDDNS_TOKEN`: bearer token for `clouddns` zones
//
// ## Output
//
// One line per change on stdout (`- ` removals, `+ ` additions), then a
// summary line. Logs and warnings go to stderr.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;
use zonesync_core::config::{DEFAULT_CONFIG_DIRS, DEFAULT_CONFIG_EXTENSIONS, find_config};
use zonesync_core::{Error, ProviderRegistry, SyncEngine, SyncMode, SyncReport, ZonesyncConfig};

/// Environment variable read when `--log-level` is absent
const LOG_LEVEL_ENV: &str = "ZONESYNC_LOG_LEVEL";

/// Base name of the configuration file
const CONFIG_BASENAME: &str = "zonesync";

/// Exit codes
///
/// - 0: Every zone synced (or diffed) cleanly
/// - 1: Configuration error
/// - 2: Runtime error, or at least one zone failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZonesyncExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<ZonesyncExitCode> for ExitCode {
    fn from(code: ZonesyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Sync DNS zones with an IP address inventory
#[derive(Debug, Parser)]
#[command(name = "zonesync", version)]
struct Cli {
    /// Configuration file (.yaml, .yml or .json)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum Command {
    /// Print the changes without applying them
    Diff,
    /// Apply the changes and save every changed zone
    Push,
}

impl From<Command> for SyncMode {
    fn from(command: Command) -> Self {
        match command {
            Command::Diff => SyncMode::Diff,
            Command::Push => SyncMode::Push,
        }
    }
}

fn parse_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "Log level '{}' is not valid. Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

fn load_config(path: Option<&Path>) -> Result<ZonesyncConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => find_config(CONFIG_BASENAME, DEFAULT_CONFIG_DIRS, DEFAULT_CONFIG_EXTENSIONS)?,
    };

    info!("Reading configuration from {}", path.display());
    Ok(ZonesyncConfig::from_file(&path)?)
}

fn build_registry() -> ProviderRegistry {
    let registry = ProviderRegistry::with_builtins();

    #[cfg(feature = "zonefile")]
    {
        info!("Registering zone file provider");
        zonesync_provider_zonefile::register(&registry);
    }

    #[cfg(feature = "clouddns")]
    {
        info!("Registering Cloud DNS provider");
        zonesync_provider_clouddns::register(&registry);
    }

    #[cfg(feature = "netbox")]
    {
        info!("Registering NetBox inventory");
        zonesync_inventory_netbox::register(&registry);
    }

    registry
}

fn print_report(report: &SyncReport) {
    for zone in &report.zones {
        for record in &zone.removed {
            println!("- {}", record);
        }
        for record in &zone.added {
            println!("+ {}", record);
        }
        if let Some(err) = &zone.error {
            eprintln!("Zone {} failed: {}", zone.zone, err);
        }
    }

    for name in &report.unrouted_reverse {
        eprintln!("Warning: no reverse zone configured for {}", name);
    }

    let verb = match report.mode {
        SyncMode::Diff => "Diff",
        SyncMode::Push => "Push",
    };
    println!(
        "{} complete.  {} removals, {} additions found",
        verb,
        report.remove_count(),
        report.add_count()
    );
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level_name = cli
        .log_level
        .clone()
        .or_else(|| env::var(LOG_LEVEL_ENV).ok())
        .unwrap_or_else(|| "info".to_string());

    let log_level = match parse_level(&level_name) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ZonesyncExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ZonesyncExitCode::ConfigError.into();
    }

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ZonesyncExitCode::ConfigError.into();
        }
    };

    let registry = Arc::new(build_registry());
    let (engine, events) = match SyncEngine::new(registry, config) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ZonesyncExitCode::ConfigError.into();
        }
    };
    // Progress is reported from the final SyncReport
    drop(events);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ZonesyncExitCode::RuntimeError.into();
        }
    };

    let code = match rt.block_on(engine.run(cli.command.into())) {
        Ok(report) => {
            print_report(&report);
            if report.has_failures() {
                ZonesyncExitCode::RuntimeError
            } else {
                ZonesyncExitCode::Success
            }
        }
        Err(e @ Error::Config(_)) => {
            eprintln!("Configuration error: {}", e);
            ZonesyncExitCode::ConfigError
        }
        Err(e) => {
            error!("Sync failed: {}", e);
            eprintln!("Sync failed: {}", e);
            ZonesyncExitCode::RuntimeError
        }
    };

    code.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG").unwrap(), Level::DEBUG);
        assert_eq!(parse_level("warn").unwrap(), Level::WARN);
        assert!(parse_level("verbose").is_err());
    }

    #[test]
    fn test_cli_arguments() {
        let cli = Cli::try_parse_from(["zonesync", "--config", "/tmp/z.yaml", "push"]).unwrap();
        assert_eq!(cli.command, Command::Push);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/z.yaml")));

        let cli = Cli::try_parse_from(["zonesync", "--log-level", "debug", "diff"]).unwrap();
        assert_eq!(SyncMode::from(cli.command), SyncMode::Diff);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));

        assert!(Cli::try_parse_from(["zonesync"]).is_err());
        assert!(Cli::try_parse_from(["zonesync", "apply"]).is_err());
    }

    #[test]
    fn test_registry_has_all_backends() {
        let registry = build_registry();
        assert!(registry.has_provider("memory"));
        assert!(registry.has_inventory("static"));
        #[cfg(feature = "zonefile")]
        assert!(registry.has_provider("zonefile"));
        #[cfg(feature = "clouddns")]
        assert!(registry.has_provider("clouddns"));
        #[cfg(feature = "netbox")]
        assert!(registry.has_inventory("netbox"));
    }

    #[test]
    fn test_missing_config_file() {
        assert!(load_config(Some(Path::new("/nonexistent/zonesync.yaml"))).is_err());
    }
}
