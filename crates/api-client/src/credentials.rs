//! Session credentials and their persistence
//!
//! [`CredentialStore`] is the single owner of the access token, refresh token
//! and signed-in profile. It keeps the current record in memory and writes it
//! through to a [`KeyValueStore`] so the session survives restarts.

use crate::error::ApiResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, warn};
use zerobite_core::storage::{FileStore, KeyValueStore, MemoryStore};

/// Storage slot for the access token
pub const ACCESS_SLOT: &str = "access";

/// Storage slot for the refresh token
pub const REFRESH_SLOT: &str = "refresh";

/// Storage slot for the serialized profile
pub const PROFILE_SLOT: &str = "user";

/// Signed-in user identity as returned by the backend
///
/// Passed through untouched; the client never looks inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile(serde_json::Value);

impl Profile {
    /// Wrap a backend user payload
    #[must_use]
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Raw JSON payload
    #[must_use]
    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    /// Consume into the raw JSON payload
    #[must_use]
    pub fn into_json(self) -> serde_json::Value {
        self.0
    }
}

/// Snapshot of the session state
#[derive(Clone, Default, PartialEq)]
pub struct Credentials {
    /// Short-lived bearer token
    pub access_token: Option<String>,
    /// Long-lived token exchanged for new access tokens
    pub refresh_token: Option<String>,
    /// Profile the tokens were issued for
    pub profile: Option<Profile>,
}

impl Credentials {
    /// Credentials for a freshly signed-in user
    #[must_use]
    pub fn new(access: impl Into<String>, refresh: impl Into<String>, profile: Option<Profile>) -> Self {
        Self {
            access_token: Some(access.into()),
            refresh_token: Some(refresh.into()),
            profile,
        }
    }

    /// True when no field is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none() && self.profile.is_none()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |t: &Option<String>| t.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("profile", &self.profile)
            .finish()
    }
}

/// Partial update merged into the stored credentials
///
/// Fields left untouched keep their stored value. Each field can be set or
/// explicitly removed.
#[derive(Debug, Clone, Default)]
pub struct CredentialsUpdate {
    access_token: Option<Option<String>>,
    refresh_token: Option<Option<String>>,
    profile: Option<Option<Profile>>,
}

impl CredentialsUpdate {
    /// An update that changes nothing
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the access token
    #[must_use]
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(Some(token.into()));
        self
    }

    /// Remove the access token
    #[must_use]
    pub fn remove_access_token(mut self) -> Self {
        self.access_token = Some(None);
        self
    }

    /// Set the refresh token
    #[must_use]
    pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(Some(token.into()));
        self
    }

    /// Remove the refresh token
    #[must_use]
    pub fn remove_refresh_token(mut self) -> Self {
        self.refresh_token = Some(None);
        self
    }

    /// Set the profile
    #[must_use]
    pub fn profile(mut self, profile: Profile) -> Self {
        self.profile = Some(Some(profile));
        self
    }

    /// Remove the profile
    #[must_use]
    pub fn remove_profile(mut self) -> Self {
        self.profile = Some(None);
        self
    }

    fn merge_into(self, credentials: &mut Credentials) {
        if let Some(access) = self.access_token {
            credentials.access_token = access;
        }
        if let Some(refresh) = self.refresh_token {
            credentials.refresh_token = refresh;
        }
        if let Some(profile) = self.profile {
            credentials.profile = profile;
        }
    }
}

/// Owner of the session credentials
///
/// Share one instance per process behind an `Arc`. The record lock is held
/// only for the in-memory swap, so readers never wait on disk I/O. Writers
/// queue on `persist_lock`, which keeps persisted writes in the same order as
/// in-memory ones.
pub struct CredentialStore {
    state: RwLock<Credentials>,
    persist_lock: Mutex<()>,
    backend: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    /// Load credentials from `backend`
    ///
    /// A backend read failure starts an empty session. A profile slot that is
    /// not valid JSON loads as no profile.
    pub fn load(backend: Arc<dyn KeyValueStore>) -> Self {
        let read = |slot: &str| match backend.get(slot) {
            Ok(value) => value,
            Err(e) => {
                warn!(slot, error = %e, "Failed to read credential slot");
                None
            }
        };

        let access_token = read(ACCESS_SLOT);
        let refresh_token = read(REFRESH_SLOT);
        let profile = read(PROFILE_SLOT).and_then(|raw| match serde_json::from_str(&raw) {
            Ok(serde_json::Value::Null) => None,
            Ok(value) => Some(Profile(value)),
            Err(e) => {
                warn!(error = %e, "Stored profile is not valid JSON, ignoring it");
                None
            }
        });

        let credentials = Credentials {
            access_token,
            refresh_token,
            profile,
        };
        debug!(credentials = ?credentials, "Credentials loaded");

        Self {
            state: RwLock::new(credentials),
            persist_lock: Mutex::new(()),
            backend,
        }
    }

    /// Open a file-backed store at `path`
    pub fn open(path: impl AsRef<Path>) -> ApiResult<Self> {
        let backend = FileStore::open(path.as_ref())?;
        Ok(Self::load(Arc::new(backend)))
    }

    /// A store that lives only as long as the process
    #[must_use]
    pub fn in_memory() -> Self {
        Self::load(Arc::new(MemoryStore::new()))
    }

    /// Current snapshot
    #[must_use]
    pub fn get(&self) -> Credentials {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current access token, if any
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access_token
            .clone()
    }

    /// Current refresh token, if any
    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .refresh_token
            .clone()
    }

    /// Merge `update` into the stored credentials and persist the result
    pub fn set(&self, update: CredentialsUpdate) {
        self.write(|state| update.merge_into(state));
    }

    /// Replace all three fields at once
    pub fn replace(&self, credentials: Credentials) {
        self.write(|state| *state = credentials);
    }

    /// Remove all credentials
    pub fn clear(&self) {
        self.write(|state| *state = Credentials::default());
        debug!("Credentials cleared");
    }

    fn write(&self, change: impl FnOnce(&mut Credentials)) {
        let _ordered = self.persist_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            change(&mut *state);
            state.clone()
        };
        self.persist(&snapshot);
    }

    fn persist(&self, credentials: &Credentials) {
        let profile = match credentials.profile.as_ref().map(|p| serde_json::to_string(&p.0)) {
            Some(Ok(json)) => Some(json),
            Some(Err(e)) => {
                warn!(error = %e, "Failed to encode profile, not persisting it");
                None
            }
            None => None,
        };

        let changes = [
            (ACCESS_SLOT, credentials.access_token.as_deref()),
            (REFRESH_SLOT, credentials.refresh_token.as_deref()),
            (PROFILE_SLOT, profile.as_deref()),
        ];

        if let Err(e) = self.backend.apply(&changes) {
            warn!(error = %e, "Failed to persist credentials; keeping them in memory");
        }
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("state", &self.get())
            .finish_non_exhaustive()
    }
}
