//! Transport seam between the client and the HTTP stack

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::request::{FormPart, FormPayload, RequestBody, RequestDescriptor};
use crate::response::Response;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Instant;
use tracing::debug;

pub use crate::request::X_REQUEST_ID;

/// Executes a [`RequestDescriptor`]
///
/// Errors mean the request never produced a response (DNS, connect, timeout).
/// Any HTTP status, including 4xx/5xx, is a successful execution.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and buffer the response
    async fn execute(&self, request: &RequestDescriptor) -> ApiResult<Response>;
}

/// [`Transport`] backed by `reqwest`
#[derive(Clone)]
pub struct ReqwestTransport {
    inner: Client,
}

impl ReqwestTransport {
    /// Build a transport using the configured timeout and user agent
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let mut default_headers = HeaderMap::new();
        let agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| ApiError::InvalidHeader(format!("user agent: {e}")))?;
        default_headers.insert(USER_AGENT, agent);

        let inner = Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers)
            .build()
            .map_err(ApiError::Request)?;

        Ok(Self { inner })
    }

    /// Wrap an existing `reqwest` client
    #[must_use]
    pub fn from_client(inner: Client) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &RequestDescriptor) -> ApiResult<Response> {
        let mut builder = self
            .inner
            .request(request.method().clone(), request.url())
            .headers(request.headers().clone());

        let request_id = request.header(X_REQUEST_ID).unwrap_or("-");

        builder = match request.body() {
            None => builder,
            Some(RequestBody::Text(text)) => builder.body(text.clone()),
            Some(RequestBody::Bytes(bytes)) => builder.body(bytes.clone()),
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::Form(form)) => builder.multipart(to_multipart(form)?),
        };

        let start = Instant::now();
        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        debug!(
            request_id = %request_id,
            method = %request.method(),
            url = %request.url(),
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis(),
            "Request completed"
        );

        Ok(Response::new(status, headers, body.to_vec()))
    }
}

fn to_multipart(form: &FormPayload) -> ApiResult<Form> {
    let mut multipart = Form::new();
    for part in form.parts() {
        multipart = match part {
            FormPart::Text { name, value } => multipart.text(name.clone(), value.clone()),
            FormPart::File {
                name,
                file_name,
                mime,
                bytes,
            } => {
                let mut file = Part::bytes(bytes.clone()).file_name(file_name.clone());
                if let Some(mime) = mime {
                    file = file.mime_str(mime)?;
                }
                multipart.part(name.clone(), file)
            }
        };
    }
    Ok(multipart)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_creation() {
        assert!(ReqwestTransport::new(&ClientConfig::development()).is_ok());
    }

    #[test]
    fn test_bad_user_agent_rejected() {
        let config = ClientConfig::default().with_user_agent("bad\nagent");
        assert!(matches!(
            ReqwestTransport::new(&config),
            Err(ApiError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_multipart_rejects_bad_mime() {
        let form = FormPayload::new().file("image", "a.png", Some("not a mime"), vec![1]);
        assert!(to_multipart(&form).is_err());

        let form = FormPayload::new()
            .text("food_name", "Soup")
            .file("image", "a.png", Some("image/png"), vec![1]);
        assert!(to_multipart(&form).is_ok());
    }
}
