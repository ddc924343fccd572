//! Buffered HTTP responses

use crate::error::ApiResult;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

/// A response with its body fully read
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Response {
    /// Assemble a response
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// HTTP status
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw body
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as text (invalid UTF-8 is replaced)
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// 2xx status
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// 401 status
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    /// Consume into the raw body
    #[must_use]
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Detail {
        detail: String,
    }

    #[test]
    fn test_json_body() {
        let response = Response::new(
            StatusCode::BAD_REQUEST,
            HeaderMap::new(),
            r#"{"detail":"username and password required"}"#,
        );
        let detail: Detail = response.json().unwrap();
        assert_eq!(detail.detail, "username and password required");
        assert!(!response.is_success());
        assert!(!response.is_unauthorized());
    }

    #[test]
    fn test_text_is_lossy() {
        let response = Response::new(StatusCode::OK, HeaderMap::new(), vec![b'o', b'k', 0xff]);
        assert!(response.text().starts_with("ok"));
        assert!(response.json::<Detail>().is_err());
    }
}
