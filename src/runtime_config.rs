//! # Runtime Configuration Module
//!
//! Environment-variable configuration for the dispatcher.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Effect |
//! |---|---|---|
//! | `SWITCHYARD_REQUEST_TIMEOUT_MS` | unset | Installs a timeout guard around the whole chain (408 on expiry). `0` disables. |
//! | `SWITCHYARD_TRUST_PROXY` | `false` | Honour `X-Forwarded-*` headers in the request accessors. |
//! | `SWITCHYARD_SUBDOMAIN_OFFSET` | `2` | Trailing host labels ignored by `subdomains()`. |
//! | `SWITCHYARD_STATIC_ROOT` | unset | Base directory for `send_file` / `download`. |
//! | `SWITCHYARD_VIEWS_ROOT` | unset | Base directory for `render`. |
//!
//! Unparseable values fall back to the default and log a warning.
//!
//! ## Usage
//!
//! ```rust
//! use switchyard::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("timeout: {:?}", config.request_timeout);
//! ```

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub request_timeout: Option<Duration>,
    pub trust_proxy: bool,
    pub subdomain_offset: usize,
    pub static_root: Option<PathBuf>,
    pub views_root: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            request_timeout: None,
            trust_proxy: false,
            subdomain_offset: 2,
            static_root: None,
            views_root: None,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let timeout_ms: u64 = parse_or("SWITCHYARD_REQUEST_TIMEOUT_MS", &lookup, 0);
        Self {
            request_timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            trust_proxy: parse_or("SWITCHYARD_TRUST_PROXY", &lookup, defaults.trust_proxy),
            subdomain_offset: parse_or(
                "SWITCHYARD_SUBDOMAIN_OFFSET",
                &lookup,
                defaults.subdomain_offset,
            ),
            static_root: lookup("SWITCHYARD_STATIC_ROOT")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            views_root: lookup("SWITCHYARD_VIEWS_ROOT")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> T
where
    T: FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "Invalid configuration value, using default");
            default
        }),
        None => default,
    }
}
