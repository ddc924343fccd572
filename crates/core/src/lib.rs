//! Core utilities for the Zerobite client
//!
//! This crate provides the pieces shared by the API client and the CLI:
//!
//! - **Error handling**: coded errors with the offending path and a recovery hint
//! - **Storage**: a durable key-value area for session state
//! - **Configuration**: TOML-based configuration discovery and parsing

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod storage;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, ConfigSchema};
    pub use crate::error::{exit_codes, Error, ErrorCode, Result, ResultExt};
    pub use crate::storage::{FileStore, KeyValueStore, MemoryStore};
}
