//! The HTTP transport abstraction the runner dispatches through. Kept as a
//! trait object so callers can substitute a fake transport in tests rather
//! than committing to a concrete HTTP client.

use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::debug;

use crate::error::{MeqaError, Result};
use crate::schema::model::HttpMethod;

/// A fully resolved HTTP request ready to dispatch.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// The HTTP method.
    pub method: HttpMethod,
    /// The complete URL, including query string.
    pub url: String,
    /// Header name/value pairs.
    pub headers: IndexMap<String, String>,
    /// The request body, if any. Mutually exclusive with `form`.
    pub body: Option<serde_json::Value>,
    /// Form-encoded fields, sent as `application/x-www-form-urlencoded`.
    /// Mutually exclusive with `body`.
    pub form: IndexMap<String, String>,
}

/// The raw response a transport hands back; decoding and validation are the
/// runner's job, not the transport's.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub status: u16,
    /// The raw response body bytes.
    pub body: Vec<u8>,
}

/// The black-box abstraction over "send an HTTP request, get a response".
/// `#[async_trait]` makes this dyn-safe, so runners can hold a
/// `Box<dyn HttpTransport>` without committing to a concrete client.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Dispatches `request` and returns its response, or `MeqaError::Http`
    /// on transport failure.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// The default transport, backed by [`reqwest`]. Enabled by the
/// `http-transport` feature (on by default).
#[cfg(feature = "http-transport")]
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

#[cfg(feature = "http-transport")]
impl ReqwestTransport {
    /// Creates a transport backed by a new default [`reqwest::Client`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The seven Swagger 2.0 methods always parse as valid [`http::Method`]s,
    /// so this never actually falls back; kept as a guard against a future
    /// `HttpMethod` variant `http` doesn't recognize.
    fn method(method: HttpMethod) -> http::Method {
        http::Method::from_bytes(method.as_str().as_bytes()).unwrap_or(http::Method::GET)
    }
}

#[cfg(feature = "http-transport")]
#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.client.request(Self::method(request.method), &request.url);
        for (name, value) in &request.headers {
            let header_name = http::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| MeqaError::http(format!("invalid header name {name:?}: {err}")))?;
            let header_value = http::header::HeaderValue::from_str(value)
                .map_err(|err| MeqaError::http(format!("invalid header value for {name:?}: {err}")))?;
            builder = builder.header(header_name, header_value);
        }
        if !request.form.is_empty() {
            builder = builder.form(&request.form);
        } else if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(url = %request.url, method = request.method.as_str(), "dispatching request");
        let response = builder
            .send()
            .await
            .map_err(|err| MeqaError::http(format!("request to {} failed: {err}", request.url)))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| MeqaError::http(format!("failed to read response body: {err}")))?
            .to_vec();
        debug!(status, "received response");

        Ok(HttpResponse { status, body })
    }
}
