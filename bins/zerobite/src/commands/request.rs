//! Request command

use crate::settings::Settings;
use anyhow::{bail, Context, Result};
use owo_colors::OwoColorize;
use reqwest::Method;
use serde_json::json;
use zerobite_api_client::RequestOptions;
use zerobite_core::error::exit_codes;

/// Send one authenticated request and print the response
pub async fn run(
    settings: &Settings,
    method: &str,
    target: &str,
    data: Option<&str>,
    headers: &[String],
    format: &str,
) -> Result<u8> {
    let method: Method = method
        .to_uppercase()
        .parse()
        .with_context(|| format!("`{method}` is not an HTTP method"))?;
    let mut options = RequestOptions::new(method);

    for raw in headers {
        let Some((name, value)) = raw.split_once(':') else {
            bail!("header must look like `Name: value`, got `{raw}`");
        };
        options = options.try_header(name.trim(), value.trim())?;
    }

    if let Some(data) = data {
        let body: serde_json::Value =
            serde_json::from_str(data).context("--data must be valid JSON")?;
        options = options.json(body);
    }

    let client = settings.client()?;
    let outcome = client.send(target, options).await?;
    let expired = outcome.is_session_expired();
    let response = outcome.into_response();
    let status = response.status();
    let body = response
        .json::<serde_json::Value>()
        .unwrap_or_else(|_| serde_json::Value::String(response.text()));

    if format == "json" {
        let output = json!({
            "status": status.as_u16(),
            "session_expired": expired,
            "body": body,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let line = status.to_string();
        if status.is_success() {
            println!("{}", line.green().bold());
        } else {
            println!("{}", line.red().bold());
        }
        match &body {
            serde_json::Value::String(text) => println!("{text}"),
            other => println!("{}", serde_json::to_string_pretty(other)?),
        }
    }

    Ok(if expired {
        exit_codes::SESSION_EXPIRED
    } else if status.is_success() {
        exit_codes::SUCCESS
    } else {
        exit_codes::FAILURE
    })
}
