//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ConfigSchema {
    #[serde(default)]
    pub api: ApiSection,

    #[serde(default)]
    pub session: SessionSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ApiSection {
    /// API base URL, e.g. `https://api.zerobite.app/api`
    pub url: Option<String>,

    /// Origin used for root-relative paths outside the API root
    pub app_origin: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Session persistence settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SessionSection {
    /// Where the credential slots are persisted
    pub credentials_path: Option<PathBuf>,

    /// Keep the session in memory only
    #[serde(default)]
    pub ephemeral: bool,
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSection {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of compact text
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
