//! Configuration loading and schema definitions
//!
//! Optional TOML configuration shared by the client and the CLI.

mod loader;
mod schema;

pub use loader::Config;
pub use schema::*;
