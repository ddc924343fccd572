//! Request descriptors and target resolution
//!
//! [`RequestNormalizer`] turns what a caller passes in (a target string plus
//! [`RequestOptions`]) into a fully-specified [`RequestDescriptor`]: absolute
//! URL, method, headers and encoded body. It never looks at credentials;
//! bearer tokens are attached afterwards with [`RequestDescriptor::with_bearer`].

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

const APPLICATION_JSON: &str = "application/json";

/// Request correlation ID header, set on every normalized request
pub const X_REQUEST_ID: &str = "X-Request-ID";

/// One part of a multipart form
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    /// Plain text field
    Text {
        /// Field name
        name: String,
        /// Field value
        value: String,
    },
    /// File upload
    File {
        /// Field name
        name: String,
        /// File name reported to the server
        file_name: String,
        /// MIME type, if known
        mime: Option<String>,
        /// File contents
        bytes: Vec<u8>,
    },
}

/// Multipart form payload (e.g. a donation with a photo)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormPayload {
    parts: Vec<FormPart>,
}

impl FormPayload {
    /// Empty form
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Add a file field
    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime: Option<&str>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            mime: mime.map(String::from),
            bytes,
        });
        self
    }

    /// Parts in insertion order
    #[must_use]
    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }
}

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Structured value, encoded as JSON text during normalization
    Json(serde_json::Value),
    /// Sent verbatim
    Text(String),
    /// Sent verbatim
    Bytes(Vec<u8>),
    /// Multipart form; the transport sets the content type and boundary
    Form(FormPayload),
}

/// What the caller asks for, before normalization
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// HTTP method
    pub method: Method,
    /// Caller-supplied headers
    pub headers: HeaderMap,
    /// Optional payload
    pub body: Option<RequestBody>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl RequestOptions {
    /// Options for `method` with no headers or body
    #[must_use]
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// `GET`
    #[must_use]
    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    /// `POST`
    #[must_use]
    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    /// `PUT`
    #[must_use]
    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    /// `PATCH`
    #[must_use]
    pub fn patch() -> Self {
        Self::new(Method::PATCH)
    }

    /// `DELETE`
    #[must_use]
    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Add a header from strings
    pub fn try_header(self, name: &str, value: &str) -> ApiResult<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ApiError::InvalidHeader(format!("{name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ApiError::InvalidHeader(format!("{name}: {e}")))?;
        Ok(self.header(name, value))
    }

    /// Attach a JSON body
    #[must_use]
    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(value));
        self
    }

    /// Attach any serializable value as a JSON body
    ///
    /// Fails when `value` has no JSON form, such as a map with non-string keys.
    pub fn json_from<T: Serialize>(self, value: &T) -> ApiResult<Self> {
        let value = serde_json::to_value(value).map_err(|e| {
            warn!(error = %e, "Request body has no JSON encoding");
            ApiError::Json(e)
        })?;
        Ok(self.json(value))
    }

    /// Attach a string body, sent verbatim
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(text.into()));
        self
    }

    /// Attach a raw byte body
    #[must_use]
    pub fn bytes(mut self, bytes: Vec<u8>) -> Self {
        self.body = Some(RequestBody::Bytes(bytes));
        self
    }

    /// Attach a multipart form body
    #[must_use]
    pub fn form(mut self, form: FormPayload) -> Self {
        self.body = Some(RequestBody::Form(form));
        self
    }
}

/// A fully-specified request, immutable once built
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    url: String,
    method: Method,
    headers: HeaderMap,
    body: Option<RequestBody>,
}

impl RequestDescriptor {
    /// Absolute URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// HTTP method
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Final headers
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as a string, if present and valid UTF-8
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Encoded body
    #[must_use]
    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// Copy of this descriptor carrying `Authorization: Bearer <token>`
    ///
    /// Replaces any existing `Authorization` value.
    pub fn with_bearer(&self, token: &str) -> ApiResult<Self> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ApiError::InvalidHeader("access token is not a valid header value".into()))?;
        value.set_sensitive(true);

        let mut next = self.clone();
        next.headers.insert(AUTHORIZATION, value);
        Ok(next)
    }
}

/// Builds [`RequestDescriptor`]s against the configured API base
#[derive(Debug, Clone)]
pub struct RequestNormalizer {
    api_base: String,
    api_root: String,
    api_origin: String,
    app_origin: String,
}

impl RequestNormalizer {
    /// Create a normalizer for `config`
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let url = Url::parse(&config.api_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", config.api_url)))?;

        let api_origin = url.origin().ascii_serialization();
        let api_root = url.path().trim_end_matches('/').to_string();
        let app_origin = config
            .app_origin
            .as_deref()
            .map_or_else(|| api_origin.clone(), |o| o.trim_end_matches('/').to_string());

        Ok(Self {
            api_base: config.api_url.trim_end_matches('/').to_string(),
            api_root,
            api_origin,
            app_origin,
        })
    }

    /// Resolve a caller target to an absolute URL
    ///
    /// - absolute `http(s)://` URLs are returned unchanged
    /// - paths under the API root resolve against the API origin
    /// - other `/`-paths resolve against the application origin
    /// - anything else is appended to the API base with exactly one `/`
    #[must_use]
    pub fn resolve(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            return target.to_string();
        }

        if self.is_under_api_root(target) {
            return format!("{}{}", self.api_origin, target);
        }

        if target.starts_with('/') {
            return format!("{}{}", self.app_origin, target);
        }

        format!("{}/{}", self.api_base, target.trim_start_matches('/'))
    }

    fn is_under_api_root(&self, target: &str) -> bool {
        if self.api_root.is_empty() {
            return false;
        }
        match target.strip_prefix(self.api_root.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with(&['/', '?', '#'][..]),
            None => false,
        }
    }

    /// Build a descriptor for `target`
    #[must_use]
    pub fn normalize(&self, target: &str, options: RequestOptions) -> RequestDescriptor {
        let RequestOptions {
            method,
            mut headers,
            body,
        } = options;

        let body = match body {
            Some(RequestBody::Form(form)) => {
                if headers.remove(CONTENT_TYPE).is_some() {
                    debug!("Dropping caller Content-Type for multipart body");
                }
                Some(RequestBody::Form(form))
            }
            other => {
                if !is_bodyless(&method) && !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
                }
                other.map(encode_json)
            }
        };

        if !headers.contains_key(X_REQUEST_ID) {
            if let Ok(id) = HeaderValue::from_str(&Uuid::new_v4().to_string()) {
                headers.insert(X_REQUEST_ID, id);
            }
        }

        RequestDescriptor {
            url: self.resolve(target),
            method,
            headers,
            body,
        }
    }
}

fn is_bodyless(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

/// Encode a structured body as JSON text
///
/// A `serde_json::Value` always encodes, so normalization cannot fail here.
/// Typed bodies that do not map to JSON are caught earlier, when
/// [`RequestOptions::json_from`] converts them.
fn encode_json(body: RequestBody) -> RequestBody {
    match body {
        RequestBody::Json(value) => RequestBody::Text(value.to_string()),
        other => other,
    }
}
