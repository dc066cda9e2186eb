//! Device authorization request.

use std::fmt;

use url::Url;

use crate::error::{Error, Result};
use crate::service::ServiceConfiguration;

/// How the client authenticates at the token and device endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientAuthMethod {
    /// Client secret sent as a form field (`client_secret_post`).
    #[default]
    Post,
    /// Client secret sent as HTTP Basic credentials (`client_secret_basic`).
    Basic,
}

/// A request to start a device authorization flow.
///
/// Built once by the caller and read-only afterwards; the session clones
/// what it needs.
#[derive(Clone)]
pub struct DeviceAuthorizationRequest {
    /// Server endpoints.
    pub configuration: ServiceConfiguration,
    /// Client ID from the provider.
    pub client_id: String,
    /// Client secret (optional for public clients).
    pub client_secret: Option<String>,
    /// Requested scopes.
    pub scopes: Vec<String>,
    /// Client authentication method when a secret is set.
    pub auth_method: ClientAuthMethod,
    /// Extra form parameters sent with the initial call.
    pub additional_parameters: Vec<(String, String)>,
}

impl DeviceAuthorizationRequest {
    /// Creates a request for a public client.
    #[must_use]
    pub fn new(configuration: ServiceConfiguration, client_id: impl Into<String>) -> Self {
        Self {
            configuration,
            client_id: client_id.into(),
            client_secret: None,
            scopes: Vec::new(),
            auth_method: ClientAuthMethod::Post,
            additional_parameters: Vec::new(),
        }
    }

    /// Sets the client secret.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Sets the requested scopes.
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the client authentication method.
    #[must_use]
    pub const fn with_auth_method(mut self, method: ClientAuthMethod) -> Self {
        self.auth_method = method;
        self
    }

    /// Adds an extra parameter to the initial call.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_parameters.push((name.into(), value.into()));
        self
    }

    /// Space-separated scope string, as sent on the wire.
    #[must_use]
    pub fn scope(&self) -> String {
        self.scopes.join(" ")
    }

    /// Returns the device authorization endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration has no device endpoint.
    pub fn device_authorization_endpoint(&self) -> Result<&Url> {
        self.configuration
            .device_authorization_endpoint
            .as_ref()
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "{} does not support the device authorization grant",
                    self.configuration.name
                ))
            })
    }

    /// Checks that the request is complete enough to start a flow.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::Configuration("client_id is empty".into()));
        }
        if self.client_secret.as_deref().is_some_and(str::is_empty) {
            return Err(Error::Configuration("client_secret is set but empty".into()));
        }
        if self.auth_method == ClientAuthMethod::Basic && self.client_secret.is_none() {
            return Err(Error::Configuration(
                "client_secret_basic requires a client secret".into(),
            ));
        }
        if self.scopes.iter().any(|s| s.is_empty() || s.contains(' ')) {
            return Err(Error::Configuration(
                "scopes must be non-empty and contain no spaces".into(),
            ));
        }
        self.device_authorization_endpoint()?;
        self.configuration.validate()
    }
}

impl fmt::Debug for DeviceAuthorizationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceAuthorizationRequest")
            .field("configuration", &self.configuration.name)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("scopes", &self.scopes)
            .field("auth_method", &self.auth_method)
            .finish_non_exhaustive()
    }
}
