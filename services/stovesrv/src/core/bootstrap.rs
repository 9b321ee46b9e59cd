//! Service Bootstrap and Initialization
//!
//! Command-line parsing, configuration resolution and logging setup for the
//! `stovesrv` binary.

use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::info;

use common::config_loader::get_config_value;
use common::service_bootstrap::ServiceInfo;
use errors::{ServiceError, ServiceResult};

use crate::core::config::AppConfig;
use crate::error::Result;

/// Command-line arguments for stovesrv
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "stovesrv",
    version = env!("CARGO_PKG_VERSION"),
    about = "Pellet stove serial link service",
    long_about = None
)]
pub struct Args {
    /// Configuration file (default: STOVESRV_CONFIG or config/stovesrv.yaml)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long)]
    pub log_level: Option<String>,

    /// Serial device, overrides serial.port
    #[arg(short = 'p', long)]
    pub port: Option<String>,

    /// Talk to the built-in stove simulator instead of a serial port
    #[arg(long)]
    pub simulate: bool,

    /// Validation mode - only validate configuration without starting service
    #[arg(long)]
    pub validate: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

/// Load the configuration file and apply command-line overrides
///
/// Priority per setting: CLI > environment > file > default.
pub fn resolve_config(args: &Args, service: &ServiceInfo) -> Result<AppConfig> {
    let path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(common::service_bootstrap::get_config_path(service)));

    let mut config = AppConfig::load(&path)?;
    apply_overrides(&mut config, args);
    config.validate()?;
    Ok(config)
}

fn apply_overrides(config: &mut AppConfig, args: &Args) {
    config.serial.port = get_config_value(
        args.port.clone(),
        "STOVESRV_PORT",
        config.serial.port.clone(),
    );
    config.logging.level = get_config_value(
        args.log_level.clone(),
        "STOVESRV_LOG_LEVEL",
        config.logging.level.clone(),
    );
    if args.simulate {
        config.serial.simulate = true;
    }
}

/// Initialize logging from the resolved configuration
pub fn initialize_logging(args: &Args, service: &ServiceInfo, config: &AppConfig) -> ServiceResult<()> {
    common::service_bootstrap::init_logging(
        service,
        &config.logging.level,
        config.logging.dir.as_deref().map(Path::new),
        !args.no_color,
        config.logging.json,
    )
    .map_err(|e| ServiceError::Configuration(format!("Failed to init logging: {e}")))
}

/// Log what the service is about to do with this configuration
pub fn log_configuration(config: &AppConfig) {
    let link = if config.serial.simulate {
        "simulated stove".to_string()
    } else {
        format!("{} @ {} baud", config.serial.port, config.serial.baud_rate)
    };
    info!("Link: {link}");
    info!(
        "Setpoint limits: {:.1}..{:.1} °C, cache TTL {} ms",
        config.controller.min_temperature,
        config.controller.max_temperature,
        config.controller.cache_ttl_ms
    );
    info!(
        "Read budget: {} x ({} ms sync, {} ms response); write budget: {} x ({} ms, {} ms)",
        config.link.read_attempts,
        config.link.read_sync_timeout_ms,
        config.link.read_response_timeout_ms,
        config.link.write_attempts,
        config.link.write_sync_timeout_ms,
        config.link.write_response_timeout_ms
    );
    if config.monitor.enabled {
        info!("Monitor: every {} ms", config.monitor.interval_ms);
    } else {
        info!("Monitor: disabled");
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::try_parse_from([
            "stovesrv",
            "--port",
            "/dev/ttyS1",
            "-l",
            "debug",
            "--simulate",
            "--validate",
        ])
        .unwrap();
        assert_eq!(args.port.as_deref(), Some("/dev/ttyS1"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.simulate);
        assert!(args.validate);
        assert!(!args.no_color);
    }

    #[test]
    fn test_cli_overrides_config() {
        let mut config = AppConfig::default();
        let args = Args {
            port: Some("/dev/ttyS3".to_string()),
            log_level: Some("trace".to_string()),
            simulate: true,
            ..Default::default()
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config.serial.port, "/dev/ttyS3");
        assert_eq!(config.logging.level, "trace");
        assert!(config.serial.simulate);
    }

    #[test]
    fn test_resolve_config_with_missing_file() {
        let service = ServiceInfo::new("stovesrv", "0.1.0", "test");
        let args = Args {
            config: Some(PathBuf::from("/nonexistent/stovesrv.yaml")),
            simulate: true,
            ..Default::default()
        };
        let config = resolve_config(&args, &service).unwrap();
        assert!(config.serial.simulate);
    }
}
