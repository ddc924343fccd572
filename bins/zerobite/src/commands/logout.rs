//! Logout command

use crate::settings::Settings;
use anyhow::Result;
use owo_colors::OwoColorize;
use serde_json::json;
use zerobite_core::error::exit_codes;

/// Clear the stored session
pub fn run(settings: &Settings, format: &str) -> Result<u8> {
    settings.client()?.auth().logout();

    if format == "json" {
        println!("{}", json!({ "signed_in": false }));
    } else {
        println!("{} Signed out", "✓".green());
    }

    Ok(exit_codes::SUCCESS)
}
