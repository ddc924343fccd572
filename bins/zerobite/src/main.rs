//! Zerobite CLI
//!
//! Sign in to the Zerobite food-donation API and issue authenticated requests
//! from the terminal. The session is persisted between runs.

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Instrument;
use zerobite_core::error::exit_codes;
use zerobite_telemetry::TelemetryConfig;

mod commands;
mod settings;

use commands::{login, logout, request, whoami};

/// Zerobite API client
#[derive(Parser)]
#[command(name = "zerobite")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: String,

    /// Configuration file (defaults to ./zerobite.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    Login {
        /// Account username
        username: String,

        /// Account password
        #[arg(short, long, env = "ZEROBITE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Send an authenticated request
    Request {
        /// HTTP method
        method: String,

        /// API-relative path, root-relative path or absolute URL
        target: String,

        /// JSON request body
        #[arg(short, long)]
        data: Option<String>,

        /// Extra header as `Name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match settings::Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            report_error(&e, &cli.format);
            return ExitCode::from(exit_codes::CONFIG_ERROR);
        }
    };

    let mut telemetry = TelemetryConfig::from_logging(settings.log_level.clone(), settings.log_json);
    if cli.verbose {
        telemetry = telemetry.verbose();
    }
    if let Err(e) = zerobite_telemetry::init(&telemetry) {
        eprintln!("{} {:#}", "Warning:".yellow().bold(), e);
    }

    let format = cli.format.clone();
    let result = async {
        match cli.command {
            Commands::Login { username, password } => {
                login::run(&settings, &username, &password, &format).await
            }
            Commands::Logout => logout::run(&settings, &format),
            Commands::Whoami => whoami::run(&settings, &format).await,
            Commands::Request {
                method,
                target,
                data,
                headers,
            } => request::run(&settings, &method, &target, data.as_deref(), &headers, &format).await,
        }
    }
    .instrument(zerobite_telemetry::root_span())
    .await;

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            report_error(&e, &format);
            let code = e
                .downcast_ref::<zerobite_core::Error>()
                .map_or(exit_codes::FAILURE, zerobite_core::Error::exit_code);
            ExitCode::from(code)
        }
    }
}

fn report_error(err: &anyhow::Error, format: &str) {
    if format == "json" {
        let report = match err.downcast_ref::<zerobite_core::Error>() {
            Some(core) => serde_json::to_value(core.to_report()).unwrap_or_default(),
            None => serde_json::json!({ "message": err.to_string() }),
        };
        eprintln!("{}", serde_json::json!({ "error": report }));
    } else {
        eprintln!("{} {}", "Error:".red().bold(), err);
    }
}
