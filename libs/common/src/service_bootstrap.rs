//! Service bootstrap utilities
//!
//! Startup banner, logging initialization and environment setup shared by the
//! stove services.

use std::path::{Path, PathBuf};

use crate::logging::{self, LogConfig};
use tracing::info;

/// Service metadata for startup
pub struct ServiceInfo {
    /// Service name (e.g., "stovesrv")
    pub name: String,
    /// Service version, passed in from the binary crate
    pub version: String,
    /// Service description
    pub description: String,
}

impl ServiceInfo {
    /// Create new service info
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
        }
    }
}

/// Print startup banner for a service
///
/// `target` names what the service talks to (serial port, simulator, ...).
pub fn print_startup_banner(service: &ServiceInfo, target: &str) {
    let banner = r#"
 ███████╗████████╗ ██████╗ ██╗   ██╗███████╗
 ██╔════╝╚══██╔══╝██╔═══██╗██║   ██║██╔════╝
 ███████╗   ██║   ██║   ██║██║   ██║█████╗
 ╚════██║   ██║   ██║   ██║╚██╗ ██╔╝██╔══╝
 ███████║   ██║   ╚██████╔╝ ╚████╔╝ ███████╗
 ╚══════╝   ╚═╝    ╚═════╝   ╚═══╝  ╚══════╝
            "#;

    info!("{}", banner);
    info!("");
    info!(" {} v{}", service.name.to_uppercase(), service.version);
    info!(" {}", service.description);
    info!(" Link: {}", target);
    info!("");
}

/// Install logging for `service`
///
/// `STOVE_LOG_DIR` overrides `log_dir`; with neither set only the console is used.
pub fn init_logging(
    service: &ServiceInfo,
    level: &str,
    log_dir: Option<&Path>,
    ansi: bool,
    enable_json: bool,
) -> anyhow::Result<()> {
    let log_dir = non_empty_env("STOVE_LOG_DIR")
        .map(PathBuf::from)
        .or_else(|| log_dir.map(Path::to_path_buf));

    logging::init_with_config(LogConfig {
        service_name: service.name.clone(),
        log_dir,
        level: logging::parse_level(level),
        enable_json,
        ansi,
    })
    .map_err(|e| anyhow::anyhow!("logging setup failed: {e}"))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// `KEY=value` from one `.env` line; comments and blank lines yield `None`
fn parse_env_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    (!key.is_empty()).then(|| (key, value.trim()))
}

/// Debug builds only: export `.env` entries that are not already set
pub fn load_development_env() {
    if !cfg!(debug_assertions) {
        return;
    }
    let Ok(content) = std::fs::read_to_string(".env") else {
        return;
    };
    for (key, value) in content.lines().filter_map(parse_env_line) {
        if std::env::var_os(key).is_none() {
            std::env::set_var(key, value);
        }
    }
}

/// `<NAME>_CONFIG` if set, else `config/<name>.yaml`
pub fn get_config_path(service: &ServiceInfo) -> String {
    non_empty_env(&format!("{}_CONFIG", service.name.to_uppercase()))
        .unwrap_or_else(|| format!("config/{}.yaml", service.name))
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_service_info_creation() {
        let service = ServiceInfo::new("stovesrv", "0.1.0", "Pellet stove link");
        assert_eq!(service.name, "stovesrv");
        assert_eq!(service.version, "0.1.0");
        assert_eq!(service.description, "Pellet stove link");
    }

    #[test]
    fn test_parse_env_line() {
        assert_eq!(parse_env_line("STOVESRV_PORT=/dev/ttyS1"), Some(("STOVESRV_PORT", "/dev/ttyS1")));
        assert_eq!(parse_env_line("  RUST_LOG = debug "), Some(("RUST_LOG", "debug")));
        assert_eq!(parse_env_line("# comment"), None);
        assert_eq!(parse_env_line(""), None);
        assert_eq!(parse_env_line("=orphan"), None);
        assert_eq!(parse_env_line("no-separator"), None);
    }

    #[test]
    fn test_get_config_path_default() {
        let service = ServiceInfo::new("teststove", "0.1.0", "Test");
        let path = get_config_path(&service);
        assert_eq!(path, "config/teststove.yaml");
    }
}
