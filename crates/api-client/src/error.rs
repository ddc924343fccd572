//! Errors raised by the Zerobite client
//!
//! A `401` the client cannot recover from is not an error here: it surfaces
//! as [`crate::client::SendOutcome::SessionExpired`]. Other non-2xx statuses
//! reach the caller as ordinary [`crate::response::Response`]s, so
//! [`ApiError::Rejected`] is only produced by endpoint helpers that interpret
//! a body, such as login.

use crate::request::{RequestDescriptor, X_REQUEST_ID};
use std::fmt;
use thiserror::Error;

/// Result alias for client operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Client error
#[derive(Error, Debug)]
pub enum ApiError {
    /// reqwest could not complete the exchange
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// A custom transport could not reach the backend
    #[error("Network error: {0}")]
    Network(String),

    /// Body could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Client settings are unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// The backend refused an operation
    #[error("Rejected by server ({status}): {detail}")]
    Rejected {
        /// HTTP status
        status: u16,
        /// `detail` field of the body, or the raw body
        detail: String,
    },

    /// A 2xx body lacked a field the client relies on
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    /// Base URL or target could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Header name or value is not encodable
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Persisted session could not be opened
    #[error("Storage error: {0}")]
    Storage(#[from] zerobite_core::Error),
}

impl ApiError {
    /// [`ApiError::Config`] from a message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// [`ApiError::Network`] from a message
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// [`ApiError::Rejected`] for a status and detail
    pub fn rejected(status: u16, detail: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            detail: detail.into(),
        }
    }

    /// Whether the backend was never reached or the connection broke
    ///
    /// Body decode failures and request builder errors do not count.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Request(e) => !e.is_decode() && !e.is_builder(),
            Self::Network(_) => true,
            _ => false,
        }
    }

    /// HTTP status attached to this error, if the server answered
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Identifies a failed request in logs
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Value of the `X-Request-ID` header sent
    pub request_id: Option<String>,
    /// Absolute URL
    pub url: String,
    /// HTTP method
    pub method: String,
}

impl ErrorContext {
    /// Context for a descriptor about to be sent
    #[must_use]
    pub fn for_request(request: &RequestDescriptor) -> Self {
        Self {
            request_id: request.header(X_REQUEST_ID).map(String::from),
            url: request.url().to_string(),
            method: request.method().to_string(),
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)?;
        match &self.request_id {
            Some(id) => write!(f, " [{id}]"),
            None => Ok(()),
        }
    }
}
