//! Client settings
//!
//! [`ClientConfig::from_env`] starts from the preset named by `ZEROBITE_ENV`
//! and applies the `ZEROBITE_*` overrides on top.

use crate::error::{ApiError, ApiResult};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const LOCAL_API_URL: &str = "http://127.0.0.1:8000/api";
const HOSTED_API_URL: &str = "https://api.zerobite.app/api";
const USER_AGENT: &str = concat!("zerobite-api-client/", env!("CARGO_PKG_VERSION"));

/// Deployment the client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Backend running on this machine
    #[default]
    Development,
    /// Hosted backend
    Production,
}

impl FromStr for Environment {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "dev" | "development" | "local" => Ok(Self::Development),
            "prod" | "production" => Ok(Self::Production),
            other => Err(ApiError::config(format!("unknown environment `{other}`"))),
        }
    }
}

/// Settings shared by the normalizer, the transport and the credential store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API base; API-relative targets are joined onto it
    pub api_url: String,
    /// Origin for root-relative targets outside `/api`. Falls back to the
    /// origin of `api_url`.
    pub app_origin: Option<String>,
    /// Per-request timeout, serialized as whole seconds
    #[serde(with = "secs")]
    pub timeout: Duration,
    /// Credential file. `None` means the platform data directory.
    pub credentials_path: Option<PathBuf>,
    /// `User-Agent` header value
    pub user_agent: String,
    /// Preset this config started from
    pub environment: Environment,
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_environment(Environment::Development)
    }
}

impl ClientConfig {
    /// Preset for an environment
    #[must_use]
    pub fn for_environment(environment: Environment) -> Self {
        let (api_url, timeout) = match environment {
            Environment::Development => (LOCAL_API_URL, 10),
            Environment::Production => (HOSTED_API_URL, 30),
        };
        Self {
            api_url: api_url.to_string(),
            app_origin: None,
            timeout: Duration::from_secs(timeout),
            credentials_path: None,
            user_agent: USER_AGENT.to_string(),
            environment,
        }
    }

    /// Local backend, 10 s timeout
    #[must_use]
    pub fn development() -> Self {
        Self::for_environment(Environment::Development)
    }

    /// Hosted backend, 30 s timeout
    #[must_use]
    pub fn production() -> Self {
        Self::for_environment(Environment::Production)
    }

    /// Preset from `ZEROBITE_ENV`, then overrides from
    /// `ZEROBITE_API_URL`, `ZEROBITE_APP_ORIGIN`, `ZEROBITE_CREDENTIALS_PATH`
    /// and `ZEROBITE_TIMEOUT_SECS`
    pub fn from_env() -> ApiResult<Self> {
        let environment = var("ZEROBITE_ENV")
            .map(|raw| raw.parse())
            .transpose()?
            .unwrap_or_default();
        let mut config = Self::for_environment(environment);

        if let Some(url) = var("ZEROBITE_API_URL") {
            config.api_url = url;
        }
        config.app_origin = var("ZEROBITE_APP_ORIGIN");
        config.credentials_path = env::var_os("ZEROBITE_CREDENTIALS_PATH")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        if let Some(raw) = var("ZEROBITE_TIMEOUT_SECS") {
            let secs = raw.parse::<u64>().map_err(|_| {
                ApiError::config(format!("ZEROBITE_TIMEOUT_SECS must be whole seconds, got `{raw}`"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Set the API base
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set the origin for root-relative targets
    #[must_use]
    pub fn with_app_origin(mut self, origin: impl Into<String>) -> Self {
        self.app_origin = Some(origin.into());
        self
    }

    /// Set the per-request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Persist credentials at `path`
    #[must_use]
    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    /// Set the `User-Agent` header
    #[must_use]
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// `<api base>/token/refresh/`
    #[must_use]
    pub fn refresh_url(&self) -> String {
        format!("{}/token/refresh/", self.api_url.trim_end_matches('/'))
    }

    /// Reject settings the client cannot work with
    pub fn validate(&self) -> ApiResult<()> {
        if self.api_url.is_empty() {
            return Err(ApiError::config("api_url cannot be empty"));
        }
        http_url(&self.api_url)?;
        if let Some(origin) = &self.app_origin {
            http_url(origin)?;
        }
        if self.timeout.is_zero() {
            return Err(ApiError::config("timeout cannot be zero"));
        }
        Ok(())
    }
}

/// Non-empty environment variable
fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn http_url(raw: &str) -> ApiResult<Url> {
    let url = Url::parse(raw).map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ApiError::config(format!(
            "{raw}: scheme must be http or https, not {scheme}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_targets_local_backend() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url, "http://127.0.0.1:8000/api");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.environment, Environment::Development);
        assert!(config.credentials_path.is_none());
        assert!(config.user_agent.starts_with("zerobite-api-client/"));
    }

    #[test]
    fn test_production_preset() {
        let config = ClientConfig::production();
        assert!(config.api_url.starts_with("https://"));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.environment, Environment::Production);
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("local".parse::<Environment>().unwrap(), Environment::Development);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_builders() {
        let config = ClientConfig::default()
            .with_api_url("https://api.example/api")
            .with_timeout(Duration::from_secs(60))
            .with_credentials_path("/tmp/zerobite.json");

        assert_eq!(config.api_url, "https://api.example/api");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.credentials_path, Some(PathBuf::from("/tmp/zerobite.json")));
    }

    #[test]
    fn test_refresh_url_ignores_trailing_slash() {
        let config = ClientConfig::default().with_api_url("https://api.example/api/");
        assert_eq!(config.refresh_url(), "https://api.example/api/token/refresh/");
    }

    #[test]
    fn test_validation() {
        assert!(ClientConfig::default().validate().is_ok());
        assert!(ClientConfig::default().with_api_url("").validate().is_err());
        assert!(ClientConfig::default().with_api_url("ftp://x").validate().is_err());
        assert!(ClientConfig::default().with_api_url("not a url").validate().is_err());
        assert!(ClientConfig::default()
            .with_app_origin("not a url")
            .validate()
            .is_err());
        assert!(ClientConfig::default()
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_config_serializes_timeout_as_seconds() {
        let json = serde_json::to_value(ClientConfig::production()).unwrap();
        assert_eq!(json["timeout"], 30);
        assert_eq!(json["environment"], "production");
    }
}
