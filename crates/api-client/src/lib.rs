//! Authenticated HTTP client for the Zerobite API
//!
//! Every backend call goes through [`AuthenticatedClient`], which resolves the
//! target against the configured API base, attaches the stored access token and
//! transparently recovers from an expired one.
//!
//! # Features
//!
//! - **Credential store**: access token, refresh token and profile persisted as one record
//! - **Request normalization**: URL resolution, JSON encoding, default content type
//! - **Single-flight refresh**: concurrent `401`s share one `token/refresh/` exchange
//! - **One retry**: a refreshed request is sent again exactly once
//! - **Typed expiry**: an unrecoverable session is a [`SendOutcome::SessionExpired`]
//!
//! # Example
//!
//! ```rust,no_run
//! use zerobite_api_client::{AuthenticatedClient, SendOutcome, RequestOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = AuthenticatedClient::new()?;
//!
//!     client.auth().login("donor1", "secret").await?;
//!
//!     match client.send("donations/", RequestOptions::get()).await? {
//!         SendOutcome::Completed(response) => println!("{}", response.text()),
//!         SendOutcome::SessionExpired(expired) => eprintln!("{}", expired.detail()),
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod credentials;
pub mod endpoints;
pub mod error;
pub mod refresh;
pub mod request;
pub mod response;
pub mod transport;

pub use client::{AuthenticatedClient, SendOutcome, SessionExpired, SESSION_EXPIRED_DETAIL};
pub use config::{ClientConfig, Environment};
pub use credentials::{CredentialStore, Credentials, CredentialsUpdate, Profile};
pub use error::{ApiError, ApiResult};
pub use refresh::{RefreshCoordinator, RefreshOutcome};
pub use request::{FormPayload, RequestBody, RequestDescriptor, RequestNormalizer, RequestOptions};
pub use response::Response;
pub use transport::{ReqwestTransport, Transport};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::client::{AuthenticatedClient, SendOutcome};
    pub use crate::config::{ClientConfig, Environment};
    pub use crate::credentials::{CredentialStore, Credentials, Profile};
    pub use crate::endpoints::AuthApi;
    pub use crate::error::{ApiError, ApiResult};
    pub use crate::request::{FormPayload, RequestOptions};
    pub use crate::response::Response;
}
