//! Logging setup for stove services
//!
//! The console always gets `timestamp [LEVEL] message` lines. When a log
//! directory is configured a daily rolling file is added, either in the same
//! line format or as JSON.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{
        self,
        format::{FmtSpan, Writer},
        FmtContext, FormatEvent, FormatFields,
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

// Dropping the guard stops the background file writer
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// `[INFO]`, `[WARN]`, ...
fn level_tag(level: Level) -> &'static str {
    match level {
        Level::ERROR => "[ERROR]",
        Level::WARN => "[WARN]",
        Level::INFO => "[INFO]",
        Level::DEBUG => "[DEBUG]",
        Level::TRACE => "[TRACE]",
    }
}

fn level_color(level: Level) -> &'static str {
    match level {
        Level::ERROR => "\x1b[31m",
        Level::WARN => "\x1b[33m",
        Level::INFO => "\x1b[32m",
        Level::DEBUG => "\x1b[34m",
        Level::TRACE => "\x1b[35m",
    }
}

/// `2026-01-12T07:30:02.118204Z [INFO] Link established, heartbeat received`
struct LevelTagFormat;

impl<S, N> FormatEvent<S, N> for LevelTagFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let level = *event.metadata().level();
        let mut prefix = chrono::Utc::now()
            .format("%Y-%m-%dT%H:%M:%S%.6fZ ")
            .to_string();
        if writer.has_ansi_escapes() {
            write!(prefix, "{}{}\x1b[0m ", level_color(level), level_tag(level))?;
        } else {
            write!(prefix, "{} ", level_tag(level))?;
        }
        writer.write_str(&prefix)?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log file prefix and default filter target
    pub service_name: String,
    /// `None` keeps logging on the console only
    pub log_dir: Option<PathBuf>,
    /// Used when `RUST_LOG` is unset
    pub level: Level,
    /// JSON lines in the log file
    pub enable_json: bool,
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "service".to_string(),
            log_dir: None,
            level: Level::INFO,
            enable_json: false,
            ansi: true,
        }
    }
}

/// `RUST_LOG` wins; otherwise `<level>,<service>=<level>`
fn build_filter(config: &LogConfig) -> EnvFilter {
    let from_env = std::env::var("RUST_LOG").ok().filter(|s| !s.is_empty());
    let directives = from_env.unwrap_or_else(|| {
        let level = config.level.as_str().to_lowercase();
        format!("{level},{}={level}", config.service_name)
    });
    EnvFilter::new(directives)
}

/// Parse a level name; unknown names mean INFO
pub fn parse_level(level: &str) -> Level {
    level.parse().unwrap_or(Level::INFO)
}

fn file_layer<S>(dir: &Path, config: &LogConfig) -> std::io::Result<BoxedLayer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::daily(dir, format!("{}.log", config.service_name));
    let (writer, guard) = tracing_appender::non_blocking(appender);
    if FILE_GUARD.set(guard).is_err() {
        eprintln!("Warning: file logging already initialized, keeping the first writer");
    }

    let layer = if config.enable_json {
        fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .event_format(LevelTagFormat)
            .boxed()
    };
    Ok(layer)
}

/// Install the global subscriber
pub fn init_with_config(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let console = fmt::layer()
        .with_ansi(config.ansi)
        .event_format(LevelTagFormat)
        .boxed();
    let file = config
        .log_dir
        .as_deref()
        .map(|dir| file_layer(dir, &config))
        .transpose()?;

    tracing_subscriber::registry()
        .with(build_filter(&config))
        .with(console)
        .with(file)
        .try_init()?;

    if let Some(dir) = &config.log_dir {
        tracing::info!(service = %config.service_name, dir = %dir.display(), "File logging enabled");
    }
    Ok(())
}

/// Console-only logging at `level`
pub fn init(level: &str) -> Result<(), Box<dyn std::error::Error>> {
    init_with_config(LogConfig {
        level: parse_level(level),
        ..Default::default()
    })
}
