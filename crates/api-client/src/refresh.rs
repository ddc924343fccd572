//! Single-flight access token refresh
//!
//! When several requests discover an expired access token at the same time,
//! only one `token/refresh/` exchange is sent. The first caller parks a shared
//! future in the in-flight slot; everyone arriving while it is pending clones
//! that future and receives the same [`RefreshOutcome`]. The slot is emptied as
//! soon as the outcome is known, so a later expiry starts a fresh exchange.

use crate::credentials::{CredentialStore, CredentialsUpdate};
use crate::request::{RequestNormalizer, RequestOptions};
use crate::transport::Transport;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, info, warn};

type InFlight = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Result of one refresh attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new access token was issued and stored
    Success(String),
    /// No refresh token, or the backend rejected it
    Denied,
    /// The exchange never got a response
    NetworkFailure,
}

impl RefreshOutcome {
    /// True for [`RefreshOutcome::Success`]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Success body of `token/refresh/`
#[derive(Debug, Deserialize)]
struct TokenRefreshResponse {
    access: Option<String>,
}

/// Performs refresh exchanges, at most one at a time
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<CredentialStore>,
    transport: Arc<dyn Transport>,
    normalizer: RequestNormalizer,
    refresh_url: String,
    in_flight: Mutex<Option<InFlight>>,
    exchanges: AtomicU64,
}

impl RefreshCoordinator {
    /// Create a coordinator posting to `refresh_url`
    pub fn new(
        store: Arc<CredentialStore>,
        transport: Arc<dyn Transport>,
        normalizer: RequestNormalizer,
        refresh_url: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                transport,
                normalizer,
                refresh_url: refresh_url.into(),
                in_flight: Mutex::new(None),
                exchanges: AtomicU64::new(0),
            }),
        }
    }

    /// Refresh the access token, joining any refresh already in flight
    pub async fn refresh(&self) -> RefreshOutcome {
        let flight = {
            let mut slot = self
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            if let Some(existing) = slot.as_ref() {
                debug!("Joining refresh already in flight");
                existing.clone()
            } else {
                let Some(refresh_token) = self.inner.store.refresh_token() else {
                    debug!("No refresh token stored, refresh denied");
                    return RefreshOutcome::Denied;
                };

                let flight = Arc::clone(&self.inner).exchange(refresh_token).boxed().shared();
                *slot = Some(flight.clone());
                flight
            }
        };

        flight.await
    }

    /// Whether an exchange is currently pending
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Number of exchanges sent to the backend so far
    #[must_use]
    pub fn exchanges(&self) -> u64 {
        self.inner.exchanges.load(Ordering::SeqCst)
    }
}

impl Inner {
    async fn exchange(self: Arc<Self>, refresh_token: String) -> RefreshOutcome {
        self.exchanges.fetch_add(1, Ordering::SeqCst);

        let outcome = self.perform_exchange(&refresh_token).await;

        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        outcome
    }

    async fn perform_exchange(&self, refresh_token: &str) -> RefreshOutcome {
        let options = RequestOptions::post().json(json!({ "refresh": refresh_token }));
        let request = self.normalizer.normalize(&self.refresh_url, options);

        match self.transport.execute(&request).await {
            Ok(response) if response.is_success() => {
                match response.json::<TokenRefreshResponse>() {
                    Ok(TokenRefreshResponse {
                        access: Some(access),
                    }) if !access.is_empty() => {
                        self.store
                            .set(CredentialsUpdate::new().access_token(access.clone()));
                        info!("Access token refreshed");
                        RefreshOutcome::Success(access)
                    }
                    _ => {
                        warn!("Refresh response carried no access token, signing out");
                        self.store.clear();
                        RefreshOutcome::Denied
                    }
                }
            }
            Ok(response) => {
                info!(
                    status = response.status().as_u16(),
                    "Refresh token rejected, signing out"
                );
                self.store.clear();
                RefreshOutcome::Denied
            }
            Err(e) => {
                error!(error = %e, "Token refresh failed before reaching the backend, signing out");
                self.store.clear();
                RefreshOutcome::NetworkFailure
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::credentials::Credentials;
    use crate::error::{ApiError, ApiResult};
    use crate::request::{RequestBody, RequestDescriptor};
    use crate::response::Response;
    use async_trait::async_trait;
    use reqwest::header::HeaderMap;
    use reqwest::StatusCode;
    use std::time::Duration;

    enum Reply {
        Status(u16, &'static str),
        Fail,
    }

    struct RefreshEndpoint {
        reply: Reply,
        delay: Duration,
        seen: Mutex<Vec<RequestDescriptor>>,
    }

    impl RefreshEndpoint {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                delay: Duration::from_millis(20),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for RefreshEndpoint {
        async fn execute(&self, request: &RequestDescriptor) -> ApiResult<Response> {
            self.seen.lock().unwrap().push(request.clone());
            tokio::time::sleep(self.delay).await;
            match self.reply {
                Reply::Status(code, body) => Ok(Response::new(
                    StatusCode::from_u16(code).unwrap(),
                    HeaderMap::new(),
                    body,
                )),
                Reply::Fail => Err(ApiError::network("connection reset")),
            }
        }
    }

    fn coordinator(endpoint: Arc<RefreshEndpoint>, refresh: Option<&str>) -> (RefreshCoordinator, Arc<CredentialStore>) {
        let config = ClientConfig::default().with_api_url("https://api.example/api");
        let store = Arc::new(CredentialStore::in_memory());
        if let Some(refresh) = refresh {
            store.replace(Credentials::new("expired", refresh, None));
        }
        let coordinator = RefreshCoordinator::new(
            store.clone(),
            endpoint,
            RequestNormalizer::new(&config).unwrap(),
            config.refresh_url(),
        );
        (coordinator, store)
    }

    #[tokio::test]
    async fn test_success_stores_new_access_token() {
        let endpoint = RefreshEndpoint::new(Reply::Status(200, r#"{"access":"T2"}"#));
        let (coordinator, store) = coordinator(endpoint.clone(), Some("R1"));

        assert_eq!(coordinator.refresh().await, RefreshOutcome::Success("T2".into()));
        assert_eq!(store.access_token().as_deref(), Some("T2"));
        assert_eq!(store.refresh_token().as_deref(), Some("R1"));
        assert!(!coordinator.is_refreshing());

        let seen = endpoint.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].url(), "https://api.example/api/token/refresh/");
        assert_eq!(seen[0].method(), &reqwest::Method::POST);
        assert!(seen[0].header("authorization").is_none());
        assert_eq!(
            seen[0].body(),
            Some(&RequestBody::Text(r#"{"refresh":"R1"}"#.to_string()))
        );
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_exchange() {
        let endpoint = RefreshEndpoint::new(Reply::Status(200, r#"{"access":"T2"}"#));
        let (coordinator, _store) = coordinator(endpoint.clone(), Some("R1"));

        let outcomes = futures::future::join_all((0..8).map(|_| coordinator.refresh())).await;

        assert!(outcomes.iter().all(|o| *o == RefreshOutcome::Success("T2".into())));
        assert_eq!(coordinator.exchanges(), 1);
        assert_eq!(endpoint.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_spawned_callers_share_one_exchange() {
        let endpoint = RefreshEndpoint::new(Reply::Status(200, r#"{"access":"T2"}"#));
        let (coordinator, _store) = coordinator(endpoint.clone(), Some("R1"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let c = coordinator.clone();
                tokio::spawn(async move { c.refresh().await })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_success());
        }
        assert_eq!(coordinator.exchanges(), 1);
    }

    #[tokio::test]
    async fn test_slot_is_vacated_after_completion() {
        let endpoint = RefreshEndpoint::new(Reply::Status(200, r#"{"access":"T2"}"#));
        let (coordinator, _store) = coordinator(endpoint.clone(), Some("R1"));

        coordinator.refresh().await;
        coordinator.refresh().await;

        assert_eq!(coordinator.exchanges(), 2);
    }

    #[tokio::test]
    async fn test_missing_refresh_token_is_denied_without_network() {
        let endpoint = RefreshEndpoint::new(Reply::Status(200, r#"{"access":"T2"}"#));
        let (coordinator, _store) = coordinator(endpoint.clone(), None);

        assert_eq!(coordinator.refresh().await, RefreshOutcome::Denied);
        assert_eq!(coordinator.exchanges(), 0);
        assert!(endpoint.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejection_clears_credentials() {
        let endpoint = RefreshEndpoint::new(Reply::Status(401, r#"{"detail":"Token is invalid or expired"}"#));
        let (coordinator, store) = coordinator(endpoint, Some("R1"));

        assert_eq!(coordinator.refresh().await, RefreshOutcome::Denied);
        assert!(store.get().is_empty());
    }

    #[tokio::test]
    async fn test_success_without_token_is_denied() {
        let endpoint = RefreshEndpoint::new(Reply::Status(200, r#"{"refresh":"only"}"#));
        let (coordinator, store) = coordinator(endpoint, Some("R1"));

        assert_eq!(coordinator.refresh().await, RefreshOutcome::Denied);
        assert!(store.get().is_empty());
    }

    #[tokio::test]
    async fn test_empty_token_is_denied() {
        let endpoint = RefreshEndpoint::new(Reply::Status(200, r#"{"access":""}"#));
        let (coordinator, store) = coordinator(endpoint, Some("R1"));

        assert_eq!(coordinator.refresh().await, RefreshOutcome::Denied);
        assert!(store.get().is_empty());
    }

    #[tokio::test]
    async fn test_network_failure_clears_credentials() {
        let endpoint = RefreshEndpoint::new(Reply::Fail);
        let (coordinator, store) = coordinator(endpoint, Some("R1"));

        assert_eq!(coordinator.refresh().await, RefreshOutcome::NetworkFailure);
        assert!(store.get().is_empty());
        assert!(!coordinator.is_refreshing());
    }

    #[test]
    fn test_outcome_is_success() {
        assert!(RefreshOutcome::Success("t".into()).is_success());
        assert!(!RefreshOutcome::Denied.is_success());
        assert!(!RefreshOutcome::NetworkFailure.is_success());
    }
}
