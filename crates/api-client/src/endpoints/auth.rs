//! Login, logout and session restore

use crate::client::AuthenticatedClient;
use crate::credentials::{Credentials, Profile};
use crate::error::{ApiError, ApiResult};
use crate::refresh::RefreshOutcome;
use crate::request::RequestOptions;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Authentication API interface
#[derive(Clone)]
pub struct AuthApi {
    client: AuthenticatedClient,
}

impl AuthApi {
    /// Create a new auth API interface
    pub(crate) fn new(client: AuthenticatedClient) -> Self {
        Self { client }
    }

    /// Sign in and store the issued tokens and profile as one unit
    ///
    /// A response without a `user` object stores and returns no profile.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<Option<Profile>> {
        let options = RequestOptions::post().json_from(&LoginRequest { username, password })?;
        let response = self.client.send_anonymous("login/", options).await?;

        if !response.is_success() {
            let detail = response
                .json::<ErrorDetail>()
                .ok()
                .and_then(|d| d.detail)
                .unwrap_or_else(|| response.text());
            debug!(status = response.status().as_u16(), "Login rejected");
            return Err(ApiError::rejected(response.status().as_u16(), detail));
        }

        let LoginResponse {
            access,
            refresh,
            user,
        } = response.json()?;

        let usable = |t: &String| !t.is_empty();
        let (Some(access), Some(refresh)) = (access.filter(usable), refresh.filter(usable)) else {
            return Err(ApiError::InvalidResponse(
                "login response is missing a token".to_string(),
            ));
        };

        let profile = user.filter(|u| !u.is_null()).map(Profile::new);
        self.client
            .credentials()
            .replace(Credentials::new(access, refresh, profile.clone()));
        info!(username, "Signed in");

        Ok(profile)
    }

    /// Forget the stored session
    pub fn logout(&self) {
        self.client.credentials().clear();
        info!("Signed out");
    }

    /// Recover an access token at startup when only a refresh token survived
    ///
    /// Returns `None` when nothing needed restoring.
    pub async fn restore(&self) -> Option<RefreshOutcome> {
        let creds = self.client.credentials().get();
        if creds.access_token.is_some() || creds.refresh_token.is_none() {
            return None;
        }

        debug!("Restoring session from refresh token");
        Some(self.client.coordinator().refresh().await)
    }

    /// Profile of the signed-in user
    #[must_use]
    pub fn profile(&self) -> Option<Profile> {
        self.client.credentials().get().profile
    }

    /// Whether an access token is on file
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.client.credentials().access_token().is_some()
    }
}

/// Body of `POST login/`
#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Success body of `POST login/`
#[derive(Debug, Deserialize)]
struct LoginResponse {
    access: Option<String>,
    refresh: Option<String>,
    user: Option<serde_json::Value>,
}

/// Error body the backend uses for rejections
#[derive(Debug, Deserialize)]
struct ErrorDetail {
    detail: Option<String>,
}
