//! HTTP transport used for the device authorization and token endpoints.
//!
//! The session never talks to `reqwest` directly; it goes through the
//! [`Transport`] trait so the polling logic can be driven by a scripted
//! transport in tests.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::ACCEPT;
use url::Url;

use crate::error::Result;

/// A form-encoded POST to an `OAuth2` endpoint.
#[derive(Clone)]
pub struct FormPost {
    /// Target endpoint.
    pub url: Url,
    /// Form fields, in the order they are sent.
    pub form: Vec<(String, String)>,
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
}

impl FormPost {
    /// Creates a POST with no fields.
    #[must_use]
    pub const fn new(url: Url) -> Self {
        Self {
            url,
            form: Vec::new(),
            headers: Vec::new(),
        }
    }

    /// Appends a form field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((name.into(), value.into()));
        self
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns the value of a form field, if present.
    #[must_use]
    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

// Form values carry secrets (client secret, device code); only names are printed.
impl fmt::Debug for FormPost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.form.iter().map(|(k, _)| k.as_str()).collect();
        let headers: Vec<&str> = self.headers.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("FormPost")
            .field("url", &self.url.as_str())
            .field("fields", &fields)
            .field("headers", &headers)
            .finish()
    }
}

/// Raw HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// A single network exchange.
///
/// Implementations must not retry on their own; retry policy belongs to the
/// session.
pub trait Transport: Send + Sync {
    /// Sends a form-encoded POST and returns the raw response.
    ///
    /// Non-2xx statuses are returned as responses, not errors.
    fn post_form(&self, request: FormPost) -> impl Future<Output = Result<HttpResponse>> + Send;

    /// Fetches a JSON document (used for discovery).
    fn get(&self, url: Url) -> impl Future<Output = Result<HttpResponse>> + Send;
}

/// Transport configuration.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Timeout for a whole request, including reading the body.
    pub request_timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
            user_agent: concat!("tvauth/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl TransportConfig {
    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: Client,
}

impl ReqwestTransport {
    /// Creates a transport with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (e.g., TLS backend failure).
    pub fn new() -> Result<Self> {
        Self::with_config(&TransportConfig::default())
    }

    /// Creates a transport with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_config(config: &TransportConfig) -> Result<Self> {
        let http_client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { http_client })
    }

    /// Wraps an existing `reqwest` client.
    #[must_use]
    pub const fn from_client(http_client: Client) -> Self {
        Self { http_client }
    }
}

impl Transport for ReqwestTransport {
    async fn post_form(&self, request: FormPost) -> Result<HttpResponse> {
        let mut builder = self
            .http_client
            .post(request.url)
            .header(ACCEPT, "application/json")
            .form(&request.form);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }

    async fn get(&self, url: Url) -> Result<HttpResponse> {
        let response = self
            .http_client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_form_post_builder() {
        let post = FormPost::new(Url::parse("https://example.com/token").unwrap())
            .field("client_id", "abc")
            .field("device_code", "secret-device-code")
            .header("Authorization", "Basic xyz");

        assert_eq!(post.form_value("client_id"), Some("abc"));
        assert_eq!(post.form_value("scope"), None);
        assert_eq!(post.headers.len(), 1);
    }

    #[test]
    fn test_form_post_debug_hides_values() {
        let post = FormPost::new(Url::parse("https://example.com/token").unwrap())
            .field("device_code", "secret-device-code");

        let debug = format!("{post:?}");
        assert!(debug.contains("device_code"));
        assert!(!debug.contains("secret-device-code"));
    }

    #[test]
    fn test_http_response_success_range() {
        assert!(HttpResponse::new(200, "{}").is_success());
        assert!(HttpResponse::new(204, Vec::new()).is_success());
        assert!(!HttpResponse::new(400, "{}").is_success());
        assert!(!HttpResponse::new(503, "").is_success());
    }

    #[test]
    fn test_transport_config_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert!(config.user_agent.starts_with("tvauth/"));

        let config = config.request_timeout(Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_reqwest_transport_builds() {
        assert!(ReqwestTransport::new().is_ok());
    }
}
