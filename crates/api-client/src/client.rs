//! Authenticated request client

use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::endpoints::AuthApi;
use crate::error::{ApiResult, ErrorContext};
use crate::refresh::{RefreshCoordinator, RefreshOutcome};
use crate::request::{RequestDescriptor, RequestNormalizer, RequestOptions};
use crate::response::Response;
use crate::transport::{ReqwestTransport, Transport};
use zerobite_core::storage::FileStore;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Message returned to callers once the session cannot be recovered
pub const SESSION_EXPIRED_DETAIL: &str = "Session expired, please log in again.";

/// Why a request ended with an unrecoverable session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionExpired {
    /// Outcome of the refresh attempt that failed
    pub reason: RefreshOutcome,
}

impl SessionExpired {
    /// Human-readable explanation
    #[must_use]
    pub fn detail(&self) -> &'static str {
        SESSION_EXPIRED_DETAIL
    }

    /// The synthetic `401` response handed to callers that want a plain response
    #[must_use]
    pub fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let body = serde_json::json!({ "detail": SESSION_EXPIRED_DETAIL }).to_string();
        Response::new(StatusCode::UNAUTHORIZED, headers, body)
    }
}

/// Terminal result of [`AuthenticatedClient::send`]
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// The backend answered (on the first attempt or the single retry)
    Completed(Response),
    /// Authentication failed and the refresh token could not recover it
    SessionExpired(SessionExpired),
}

impl SendOutcome {
    /// Flatten into a response, synthesizing one for an expired session
    #[must_use]
    pub fn into_response(self) -> Response {
        match self {
            Self::Completed(response) => response,
            Self::SessionExpired(expired) => expired.into_response(),
        }
    }

    /// True for [`SendOutcome::SessionExpired`]
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired(_))
    }
}

/// Zerobite API client that attaches credentials and recovers from expiry
///
/// Cheap to clone; clones share the credential store and the refresh
/// coordinator, so concurrent requests from any clone join the same refresh.
#[derive(Clone)]
pub struct AuthenticatedClient {
    config: Arc<ClientConfig>,
    normalizer: RequestNormalizer,
    store: Arc<CredentialStore>,
    coordinator: RefreshCoordinator,
    transport: Arc<dyn Transport>,
}

impl AuthenticatedClient {
    /// Create a new client with configuration from the environment
    pub fn new() -> ApiResult<Self> {
        let config = ClientConfig::from_env()?;
        Self::with_config(config)
    }

    /// Create a client with a specific configuration
    ///
    /// Credentials are persisted at `credentials_path` when set, otherwise at
    /// the platform data directory.
    pub fn with_config(config: ClientConfig) -> ApiResult<Self> {
        config.validate()?;

        let path = config
            .credentials_path
            .clone()
            .unwrap_or_else(FileStore::default_path);
        let store = Arc::new(CredentialStore::open(path)?);
        let transport = Arc::new(ReqwestTransport::new(&config)?);

        Self::from_parts(config, store, transport)
    }

    /// Assemble a client from already-built parts
    pub fn from_parts(
        config: ClientConfig,
        store: Arc<CredentialStore>,
        transport: Arc<dyn Transport>,
    ) -> ApiResult<Self> {
        let normalizer = RequestNormalizer::new(&config)?;
        let coordinator = RefreshCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&transport),
            normalizer.clone(),
            config.refresh_url(),
        );

        Ok(Self {
            config: Arc::new(config),
            normalizer,
            store,
            coordinator,
            transport,
        })
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Shared credential store
    #[must_use]
    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Shared refresh coordinator
    #[must_use]
    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Access login/logout endpoints
    #[must_use]
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    // -------------------------------------------------------------------------
    // Request pipeline
    // -------------------------------------------------------------------------

    /// Send a request with the stored access token
    ///
    /// A `401` with a refresh token on file triggers one refresh through the
    /// shared coordinator and exactly one retry. Transport failures are
    /// returned as errors and never retried.
    #[instrument(skip(self, options), fields(method = %options.method))]
    pub async fn send(&self, target: &str, options: RequestOptions) -> ApiResult<SendOutcome> {
        let request = self.normalizer.normalize(target, options);
        let attached = self.store.access_token();
        let request = match &attached {
            Some(token) => request.with_bearer(token)?,
            None => request,
        };

        let response = self.execute(&request).await?;

        if !response.is_unauthorized() || self.store.refresh_token().is_none() {
            return Ok(SendOutcome::Completed(response));
        }

        // Another call already replaced the token this request carried
        if let Some(current) = self.store.access_token().filter(|t| Some(t) != attached.as_ref()) {
            debug!(url = %request.url(), "Access token was refreshed meanwhile, retrying");
            let retry = request.with_bearer(&current)?;
            return Ok(SendOutcome::Completed(self.execute(&retry).await?));
        }

        debug!(url = %request.url(), "Access token rejected, refreshing");

        match self.coordinator.refresh().await {
            RefreshOutcome::Success(token) => {
                let retry = request.with_bearer(&token)?;
                let response = self.execute(&retry).await?;
                debug!(status = response.status().as_u16(), "Retried request completed");
                Ok(SendOutcome::Completed(response))
            }
            reason => {
                info!(?reason, "Session could not be refreshed");
                Ok(SendOutcome::SessionExpired(SessionExpired { reason }))
            }
        }
    }

    /// Like [`send`](Self::send), with an expired session turned into its
    /// synthetic `401` response
    pub async fn fetch(&self, target: &str, options: RequestOptions) -> ApiResult<Response> {
        Ok(self.send(target, options).await?.into_response())
    }

    /// Send without credentials and without refresh handling
    pub(crate) async fn send_anonymous(
        &self,
        target: &str,
        options: RequestOptions,
    ) -> ApiResult<Response> {
        let request = self.normalizer.normalize(target, options);
        self.execute(&request).await
    }

    async fn execute(&self, request: &RequestDescriptor) -> ApiResult<Response> {
        self.transport.execute(request).await.map_err(|e| {
            let context = ErrorContext::for_request(request);
            warn!(%context, error = %e, "Request failed");
            e
        })
    }

    // -------------------------------------------------------------------------
    // Convenience verbs
    // -------------------------------------------------------------------------

    /// `GET target`
    pub async fn get(&self, target: &str) -> ApiResult<Response> {
        self.fetch(target, RequestOptions::get()).await
    }

    /// `POST target` with a JSON body
    pub async fn post_json<B: Serialize>(&self, target: &str, body: &B) -> ApiResult<Response> {
        self.fetch(target, RequestOptions::post().json_from(body)?).await
    }

    /// `PUT target` with a JSON body
    pub async fn put_json<B: Serialize>(&self, target: &str, body: &B) -> ApiResult<Response> {
        self.fetch(target, RequestOptions::put().json_from(body)?).await
    }

    /// `PATCH target` with a JSON body
    pub async fn patch_json<B: Serialize>(&self, target: &str, body: &B) -> ApiResult<Response> {
        self.fetch(target, RequestOptions::patch().json_from(body)?).await
    }

    /// `DELETE target`
    pub async fn delete(&self, target: &str) -> ApiResult<Response> {
        self.fetch(target, RequestOptions::delete()).await
    }
}

impl std::fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("api_url", &self.config.api_url)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
