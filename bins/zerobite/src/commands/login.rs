//! Login command

use crate::settings::Settings;
use anyhow::Result;
use owo_colors::OwoColorize;
use serde_json::json;
use zerobite_core::error::exit_codes;

/// Sign in and persist the session
pub async fn run(settings: &Settings, username: &str, password: &str, format: &str) -> Result<u8> {
    let client = settings.client()?;
    let profile = client.auth().login(username, password).await?;

    if format == "json" {
        let output = json!({ "signed_in": true, "user": profile.as_ref().map(|p| p.as_json()) });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{} Signed in as {}", "✓".green(), username.bold());
    }

    Ok(exit_codes::SUCCESS)
}
