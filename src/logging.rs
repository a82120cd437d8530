//! Structured logging initialisation.
//!
//! The crate only emits `tracing` events. Every dispatched request runs inside a
//! `request` span carrying `method`, `path` and `request_id`, and the router and
//! dispatcher log with `route_pattern`, `status` and `duration_us` fields. [`init_logging`]
//! installs a `tracing-subscriber` stack that renders those fields as JSON lines or as
//! pretty multi-line output.
//!
//! | Variable | Default |
//! |---|---|
//! | `SWITCHYARD_LOG_LEVEL` | `info` |
//! | `SWITCHYARD_LOG_FORMAT` | `json` (`pretty` for humans) |
//! | `SWITCHYARD_LOG_ASYNC` | `false` |
//! | `SWITCHYARD_LOG_TARGET_FILTER` | unset, e.g. `switchyard::router=debug` |
//! | `SWITCHYARD_LOG_INCLUDE_LOCATION` | `false` |
//!
//! `RUST_LOG`, when set, replaces the level.

use std::env;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Output rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    /// `pretty` in any case selects [`LogFormat::Pretty`]; anything else is JSON.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("pretty") {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    /// Write through a non-blocking background writer.
    pub async_logging: bool,
    /// Extra comma-separated filter directives.
    pub target_filter: Option<String>,
    /// Include `file:line` in every event.
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Json,
            async_logging: false,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Unparseable values keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };
        Self {
            level: lookup("SWITCHYARD_LOG_LEVEL")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.level),
            format: lookup("SWITCHYARD_LOG_FORMAT")
                .map_or(defaults.format, |v| LogFormat::parse(&v)),
            async_logging: flag("SWITCHYARD_LOG_ASYNC", defaults.async_logging),
            target_filter: lookup("SWITCHYARD_LOG_TARGET_FILTER")
                .filter(|v| !v.trim().is_empty()),
            include_location: flag("SWITCHYARD_LOG_INCLUDE_LOCATION", defaults.include_location),
        }
    }

    fn directives(&self) -> impl Iterator<Item = &str> {
        self.target_filter
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    fn filter(&self) -> EnvFilter {
        let base = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str()));
        self.directives()
            .fold(base, |filter, directive| match directive.parse() {
                Ok(parsed) => filter.add_directive(parsed),
                Err(_) => {
                    // No subscriber exists yet to report through.
                    eprintln!("switchyard: ignoring invalid log directive '{directive}'");
                    filter
                }
            })
    }
}

/// Install the global subscriber described by `config`.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let (writer, guard) = if config.async_logging {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
        (BoxMakeWriter::new(non_blocking), Some(guard))
    } else {
        (BoxMakeWriter::new(std::io::stdout), None)
    };

    let layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(config.filter())
        .with(layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    // The background writer stops when its guard drops.
    if let Some(guard) = guard {
        std::mem::forget(guard);
    }
    Ok(())
}
