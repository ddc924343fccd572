//! Whoami command

use crate::settings::Settings;
use anyhow::Result;
use owo_colors::OwoColorize;
use serde_json::json;
use zerobite_api_client::RefreshOutcome;
use zerobite_core::error::exit_codes;

/// Show the signed-in user, restoring the access token if only the refresh
/// token survived
pub async fn run(settings: &Settings, format: &str) -> Result<u8> {
    let client = settings.client()?;
    let auth = client.auth();

    let restored = auth.restore().await;
    let expired = matches!(
        restored,
        Some(RefreshOutcome::Denied | RefreshOutcome::NetworkFailure)
    );
    let profile = auth.profile();

    if format == "json" {
        let output = json!({
            "signed_in": auth.is_authenticated(),
            "user": profile.as_ref().map(|p| p.as_json()),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !auth.is_authenticated() {
        println!("{}", "Not signed in".yellow());
    } else {
        let field = |key: &str| {
            profile
                .as_ref()
                .and_then(|p| p.as_json().get(key))
                .and_then(|v| v.as_str())
                .map(String::from)
        };
        match field("username") {
            Some(name) => println!("{} {}", "Signed in as".green(), name.bold()),
            None => println!("{}", "Signed in".green()),
        }
        if let Some(role) = field("role") {
            println!("  {} {}", "Role:".dimmed(), role);
        }
    }

    Ok(if expired {
        exit_codes::SESSION_EXPIRED
    } else {
        exit_codes::SUCCESS
    })
}
