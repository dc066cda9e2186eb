//! Authorization server configurations.

use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::transport::Transport;

/// Path of the OpenID Connect discovery document, relative to the issuer.
const DISCOVERY_PATH: &str = ".well-known/openid-configuration";

/// Endpoints of one authorization server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfiguration {
    /// Display name (e.g., "Google").
    pub name: String,
    /// Authorization endpoint URL.
    pub authorization_endpoint: Url,
    /// Token endpoint URL.
    pub token_endpoint: Url,
    /// Device authorization endpoint (if supported).
    pub device_authorization_endpoint: Option<Url>,
}

impl ServiceConfiguration {
    /// Creates a new service configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if URLs are invalid.
    pub fn new(
        name: impl Into<String>,
        authorization_endpoint: impl AsRef<str>,
        token_endpoint: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            authorization_endpoint: Url::parse(authorization_endpoint.as_ref())?,
            token_endpoint: Url::parse(token_endpoint.as_ref())?,
            device_authorization_endpoint: None,
        })
    }

    /// Sets the device authorization endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn with_device_authorization_endpoint(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.device_authorization_endpoint = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Google configuration, including the limited-input device endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if URL parsing fails.
    pub fn google() -> Result<Self> {
        Self::new(
            "Google",
            "https://accounts.google.com/o/oauth2/v2/auth",
            "https://oauth2.googleapis.com/token",
        )?
        .with_device_authorization_endpoint("https://oauth2.googleapis.com/device/code")
    }

    /// Microsoft identity platform configuration (`common` tenant).
    ///
    /// # Errors
    ///
    /// Returns an error if URL parsing fails.
    pub fn microsoft() -> Result<Self> {
        Self::new(
            "Microsoft",
            "https://login.microsoftonline.com/common/oauth2/v2.0/authorize",
            "https://login.microsoftonline.com/common/oauth2/v2.0/token",
        )?
        .with_device_authorization_endpoint(
            "https://login.microsoftonline.com/common/oauth2/v2.0/devicecode",
        )
    }

    /// Fetches the OpenID Connect discovery document of `issuer` and builds a
    /// configuration from it.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be fetched or lacks the
    /// authorization or token endpoint.
    pub async fn discover<T: Transport>(transport: &T, issuer: &Url) -> Result<Self> {
        let url = discovery_url(issuer);
        tracing::debug!(%url, "Fetching discovery document");

        let response = transport.get(url).await?;
        if !response.is_success() {
            return Err(Error::InvalidResponse(format!(
                "HTTP {} from discovery endpoint",
                response.status
            )));
        }

        let document: DiscoveryDocument = serde_json::from_slice(&response.body)?;
        let name = issuer.host_str().unwrap_or(issuer.as_str()).to_string();

        let mut configuration = Self::new(
            name,
            document.authorization_endpoint,
            document.token_endpoint,
        )?;
        if let Some(device) = document.device_authorization_endpoint {
            configuration = configuration.with_device_authorization_endpoint(device)?;
        }

        configuration.validate()?;
        Ok(configuration)
    }

    /// Validates that every endpoint is an http(s) URL.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        check_endpoint("authorization_endpoint", &self.authorization_endpoint)?;
        check_endpoint("token_endpoint", &self.token_endpoint)?;
        if let Some(device) = &self.device_authorization_endpoint {
            check_endpoint("device_authorization_endpoint", device)?;
        }
        Ok(())
    }
}

fn check_endpoint(field: &str, url: &Url) -> Result<()> {
    match url.scheme() {
        "https" | "http" if url.has_host() => Ok(()),
        scheme => Err(Error::Configuration(format!(
            "{field} must be an http(s) URL, got scheme '{scheme}'"
        ))),
    }
}

fn discovery_url(issuer: &Url) -> Url {
    let mut url = issuer.clone();
    let path = format!("{}/{DISCOVERY_PATH}", issuer.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_query(None);
    url
}

#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    authorization_endpoint: String,
    token_endpoint: String,
    #[serde(default)]
    device_authorization_endpoint: Option<String>,
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_google_configuration() {
        let config = ServiceConfiguration::google().unwrap();
        assert_eq!(config.name, "Google");
        assert_eq!(
            config.device_authorization_endpoint.as_ref().map(Url::as_str),
            Some("https://oauth2.googleapis.com/device/code")
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_microsoft_configuration() {
        let config = ServiceConfiguration::microsoft().unwrap();
        assert_eq!(config.name, "Microsoft");
        assert!(config.device_authorization_endpoint.is_some());
        config.validate().unwrap();
    }

    #[test]
    fn test_custom_configuration_without_device_endpoint() {
        let config = ServiceConfiguration::new(
            "Custom",
            "https://auth.example.com/authorize",
            "https://auth.example.com/token",
        )
        .unwrap();

        assert!(config.device_authorization_endpoint.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_non_http_scheme() {
        let config = ServiceConfiguration::new(
            "Custom",
            "https://auth.example.com/authorize",
            "file:///etc/token",
        )
        .unwrap();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Configuration(ref msg) if msg.contains("token_endpoint")));
    }

    #[test]
    fn test_invalid_url() {
        let result = ServiceConfiguration::new("Broken", "not a url", "https://a.example/token");
        assert!(matches!(result, Err(Error::Url(_))));
    }

    #[test]
    fn test_discovery_url() {
        let issuer = Url::parse("https://login.example.com/realms/tv/").unwrap();
        assert_eq!(
            discovery_url(&issuer).as_str(),
            "https://login.example.com/realms/tv/.well-known/openid-configuration"
        );

        let issuer = Url::parse("https://accounts.example.com").unwrap();
        assert_eq!(
            discovery_url(&issuer).as_str(),
            "https://accounts.example.com/.well-known/openid-configuration"
        );
    }
}
