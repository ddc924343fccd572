//! Errors raised while reading configuration or persisted session state
//!
//! Every [`Error`] carries a stable [`ErrorCode`], the file it concerns when
//! there is one, and an optional hint the CLI shows to the user. Errors can be
//! rendered as an [`ErrorReport`] for JSON output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Stable error codes, grouped by the thousands digit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bug or unexpected state
    Internal = 1000,

    /// Generic filesystem failure
    IoError = 2000,
    /// File or directory missing
    FileNotFound = 2001,
    /// Access refused by the OS
    PermissionDenied = 2002,

    /// Invalid configuration value
    ConfigError = 3000,
    /// Explicit configuration file missing
    ConfigNotFound = 3001,
    /// Configuration file is not valid TOML
    ConfigParseError = 3002,

    /// Slot store could not be read or written
    StorageError = 4000,
    /// Slot file exists but is not a JSON object of strings
    StorageCorrupted = 4001,
}

/// Broad grouping of [`ErrorCode`]s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Internal failures
    Internal,
    /// Filesystem
    Io,
    /// Configuration discovery and parsing
    Config,
    /// Persisted session state
    Storage,
}

impl ErrorCode {
    /// Numeric code
    #[must_use]
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Group this code belongs to
    #[must_use]
    pub fn category(self) -> ErrorCategory {
        match self {
            Self::Internal => ErrorCategory::Internal,
            Self::IoError | Self::FileNotFound | Self::PermissionDenied => ErrorCategory::Io,
            Self::ConfigError | Self::ConfigNotFound | Self::ConfigParseError => {
                ErrorCategory::Config
            }
            Self::StorageError | Self::StorageCorrupted => ErrorCategory::Storage,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

/// Core error
#[derive(Error, Debug)]
pub struct Error {
    /// Stable code
    pub code: ErrorCode,
    /// What went wrong
    pub message: String,
    /// File the error concerns
    pub path: Option<PathBuf>,
    /// What was being attempted
    pub context: Option<String>,
    /// How the user can fix it
    pub hint: Option<String>,
    /// Underlying cause
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(path) = &self.path {
            write!(f, " ({})", path.display())?;
        }
        if let Some(ctx) = &self.context {
            write!(f, "\n  while {ctx}")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {hint}")?;
        }
        Ok(())
    }
}

impl Error {
    /// Error with a code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
            context: None,
            hint: None,
            source: None,
        }
    }

    /// Attach the file this error concerns
    #[must_use]
    pub fn at(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Describe what was being attempted
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Tell the user how to recover
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attach the underlying cause
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Process exit code the CLI should use for this error
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self.code.category() {
            ErrorCategory::Config => exit_codes::CONFIG_ERROR,
            _ => exit_codes::FAILURE,
        }
    }

    /// Serializable form for JSON output
    #[must_use]
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code,
            code_str: self.code.to_string(),
            category: self.code.category(),
            message: self.message.clone(),
            path: self.path.clone(),
            context: self.context.clone(),
            hint: self.hint.clone(),
            source: self.source.as_ref().map(ToString::to_string),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    pub fn config_not_found(path: impl AsRef<Path>) -> Self {
        Self::new(ErrorCode::ConfigNotFound, "Configuration file not found")
            .at(path)
            .with_hint("Create zerobite.toml or point --config at an existing file")
    }

    pub fn config_parse(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigParseError, message).at(path)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }

    pub fn storage_corrupted(path: impl AsRef<Path>) -> Self {
        Self::new(ErrorCode::StorageCorrupted, "Stored session is not valid JSON")
            .at(path)
            .with_hint("Delete the file and sign in again")
    }
}

/// JSON-friendly view of an [`Error`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub code_str: String,
    pub category: ErrorCategory,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Exit codes for CLI commands
pub mod exit_codes {
    pub const SUCCESS: u8 = 0;
    pub const FAILURE: u8 = 1;
    pub const CONFIG_ERROR: u8 = 3;
    pub const SESSION_EXPIRED: u8 = 4;
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            _ => ErrorCode::IoError,
        };
        Error::new(code, err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::new(ErrorCode::StorageCorrupted, err.to_string()).with_source(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::new(ErrorCode::ConfigParseError, err.message().to_string()).with_source(err)
    }
}

/// Attach context to a [`Result`]
pub trait ResultExt<T> {
    /// Describe what was being attempted
    fn context(self, context: impl Into<String>) -> Result<T>;
    /// Attach the file the failure concerns
    fn at(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn at(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| e.into().at(path))
    }
}
