//! Structured logging for Zerobite tools
//!
//! Logs go to stderr so command output on stdout stays machine-readable.
//! `RUST_LOG` overrides the configured filter. Each process gets a session id
//! that [`root_span`] stamps onto every event.

use anyhow::Context;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::Span;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

static SESSION_ID: Lazy<String> = Lazy::new(|| Uuid::new_v4().to_string());

/// Filter used by `--verbose`
const VERBOSE_FILTER: &str = "zerobite=debug,zerobite_api_client=debug,info";

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human-readable output
    #[default]
    Compact,
    /// One JSON object per line
    Json,
}

/// Subscriber settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Output format
    pub format: LogFormat,
    /// Include the module path of each event
    pub show_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
            format: LogFormat::Compact,
            show_target: false,
        }
    }
}

impl TelemetryConfig {
    /// Settings from the `[logging]` table of `zerobite.toml`
    #[must_use]
    pub fn from_logging(level: impl Into<String>, json: bool) -> Self {
        Self {
            filter: level.into(),
            format: if json { LogFormat::Json } else { LogFormat::Compact },
            ..Self::default()
        }
    }

    /// Debug output for the client crates, with targets
    #[must_use]
    pub fn verbose(self) -> Self {
        Self {
            filter: VERBOSE_FILTER.to_string(),
            show_target: true,
            ..self
        }
    }
}

/// Install the global subscriber
pub fn init(config: &TelemetryConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)
            .with_context(|| format!("invalid log filter `{}`", config.filter))?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(config.show_target)
                    .with_writer(std::io::stderr),
            ),
        ),
        LogFormat::Compact => tracing::subscriber::set_global_default(
            registry.with(
                fmt::layer()
                    .compact()
                    .with_target(config.show_target)
                    .with_writer(std::io::stderr),
            ),
        ),
    };
    installed.context("a tracing subscriber is already installed")?;

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "Logging initialized");
    Ok(())
}

/// Per-process session id
pub fn session_id() -> &'static str {
    &SESSION_ID
}

/// Span carrying the session id; enter it around a whole command run
#[must_use]
pub fn root_span() -> Span {
    tracing::info_span!("zerobite", session = %session_id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_is_stable_uuid() {
        let id = session_id();
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(id, session_id());
    }

    #[test]
    fn test_from_logging() {
        let config = TelemetryConfig::from_logging("info", true);
        assert_eq!(config.filter, "info");
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.show_target);
    }

    #[test]
    fn test_verbose_keeps_format() {
        let config = TelemetryConfig::from_logging("warn", true).verbose();
        assert!(config.filter.contains("zerobite_api_client=debug"));
        assert!(config.show_target);
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_default_is_quiet_compact() {
        let config = TelemetryConfig::default();
        assert_eq!(config.filter, "warn");
        assert_eq!(config.format, LogFormat::Compact);
    }
}
