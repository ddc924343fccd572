//! Settings resolution for the CLI
//!
//! Environment variables win over `zerobite.toml`, which wins over the
//! built-in defaults.

use anyhow::Result;
use std::env;
use std::path::Path;
use std::sync::Arc;
use zerobite_api_client::{AuthenticatedClient, ClientConfig, CredentialStore, ReqwestTransport};
use zerobite_core::config::Config;

/// Resolved CLI settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub client: ClientConfig,
    pub ephemeral: bool,
    pub log_level: String,
    pub log_json: bool,
}

impl Settings {
    /// Load the config file (if any) and layer the environment on top
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = Config::load(path)?.schema;
        let mut client = ClientConfig::from_env()?;

        if let Some(url) = file.api.url.filter(|_| unset("ZEROBITE_API_URL")) {
            client = client.with_api_url(url);
        }
        if let Some(origin) = file.api.app_origin.filter(|_| unset("ZEROBITE_APP_ORIGIN")) {
            client = client.with_app_origin(origin);
        }
        if let Some(secs) = file.api.timeout_secs.filter(|_| unset("ZEROBITE_TIMEOUT_SECS")) {
            client = client.with_timeout(std::time::Duration::from_secs(secs));
        }
        if let Some(path) = file
            .session
            .credentials_path
            .filter(|_| unset("ZEROBITE_CREDENTIALS_PATH"))
        {
            client = client.with_credentials_path(path);
        }

        client.validate()?;

        Ok(Self {
            client,
            ephemeral: file.session.ephemeral,
            log_level: file.logging.level,
            log_json: file.logging.json,
        })
    }

    /// Build a client for these settings
    pub fn client(&self) -> Result<AuthenticatedClient> {
        if self.ephemeral {
            let transport = Arc::new(ReqwestTransport::new(&self.client)?);
            let store = Arc::new(CredentialStore::in_memory());
            return Ok(AuthenticatedClient::from_parts(self.client.clone(), store, transport)?);
        }
        Ok(AuthenticatedClient::with_config(self.client.clone())?)
    }
}

fn unset(var: &str) -> bool {
    env::var_os(var).is_none()
}
