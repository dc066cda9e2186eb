//! The authorization handed back to the caller when the user approves.

use crate::request::DeviceAuthorizationRequest;
use crate::service::ServiceConfiguration;
use crate::token::Token;

/// Granted tokens together with the configuration they were issued for.
///
/// Use it to authorize API calls. The session keeps no copy once the
/// handle is delivered.
#[derive(Debug, Clone)]
pub struct AuthorizationHandle {
    token: Token,
    configuration: ServiceConfiguration,
    client_id: String,
    requested_scopes: Vec<String>,
}

impl AuthorizationHandle {
    /// Wraps a granted token with the request that produced it.
    #[must_use]
    pub fn new(token: Token, request: &DeviceAuthorizationRequest) -> Self {
        Self {
            token,
            configuration: request.configuration.clone(),
            client_id: request.client_id.clone(),
            requested_scopes: request.scopes.clone(),
        }
    }

    /// The granted token.
    #[must_use]
    pub const fn token(&self) -> &Token {
        &self.token
    }

    /// The access token string.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.token.access_token
    }

    /// The refresh token, if the server issued one.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.token.refresh_token.as_deref()
    }

    /// Value for an HTTP `Authorization` header.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token.token_type, self.token.access_token)
    }

    /// Returns true if the access token is expired (with 60 second buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.token.is_expired()
    }

    /// Server the token was issued by.
    #[must_use]
    pub const fn configuration(&self) -> &ServiceConfiguration {
        &self.configuration
    }

    /// Client the token was issued to.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Granted scope, falling back to the requested scopes when the server
    /// did not echo them.
    #[must_use]
    pub fn scope(&self) -> String {
        self.token
            .scope
            .clone()
            .unwrap_or_else(|| self.requested_scopes.join(" "))
    }

    /// Splits the handle into its token and configuration.
    #[must_use]
    pub fn into_parts(self) -> (Token, ServiceConfiguration) {
        (self.token, self.configuration)
    }
}
