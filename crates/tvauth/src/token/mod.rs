//! `OAuth2` token types.

use std::fmt;

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// `OAuth2` access token with metadata.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    /// Access token string.
    pub access_token: String,
    /// Token type (usually "Bearer").
    pub token_type: String,
    /// Expiration time.
    pub expires_at: Option<DateTime<Utc>>,
    /// Refresh token, as issued. This crate never uses it.
    pub refresh_token: Option<String>,
    /// Scope granted by authorization server.
    pub scope: Option<String>,
    /// OpenID Connect ID token.
    pub id_token: Option<String>,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_at: None,
            refresh_token: None,
            scope: None,
            id_token: None,
        }
    }

    /// Creates a token from token response.
    ///
    /// # Errors
    ///
    /// Returns an error if the response carries no access token.
    pub fn from_response(response: TokenResponse) -> Result<Self> {
        if response.access_token.is_empty() {
            return Err(Error::InvalidResponse("empty access_token".into()));
        }

        let expires_at = response
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(i64::from(secs)));

        Ok(Self {
            access_token: response.access_token,
            token_type: response.token_type,
            expires_at,
            refresh_token: response.refresh_token,
            scope: response.scope,
            id_token: response.id_token,
        })
    }

    /// Checks if the token is expired (with 60 second buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|exp| Utc::now() + Duration::seconds(60) >= exp)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Token response from `OAuth2` server.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Token type.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Expires in seconds.
    pub expires_in: Option<u32>,
    /// Refresh token.
    pub refresh_token: Option<String>,
    /// Scope.
    pub scope: Option<String>,
    /// ID token.
    pub id_token: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Error response from `OAuth2` server.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub error: String,
    /// Error description.
    #[serde(default)]
    pub error_description: String,
}

impl ErrorResponse {
    /// Converts to an Error.
    #[must_use]
    pub fn into_error(self) -> Error {
        Error::oauth_error(self.error, self.error_description)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_token_creation() {
        let token = Token::new("access123", "Bearer");
        assert_eq!(token.access_token, "access123");
        assert_eq!(token.token_type, "Bearer");
        assert!(token.expires_at.is_none());
        assert!(token.refresh_token.is_none());
    }

    #[test]
    fn test_token_expiration() {
        let expired = Token {
            expires_at: Some(Utc::now() - Duration::seconds(120)),
            ..Token::new("access123", "Bearer")
        };
        assert!(expired.is_expired());

        let valid = Token {
            expires_at: Some(Utc::now() + Duration::seconds(3600)),
            ..Token::new("access123", "Bearer")
        };
        assert!(!valid.is_expired());

        let within_buffer = Token {
            expires_at: Some(Utc::now() + Duration::seconds(30)),
            ..Token::new("access123", "Bearer")
        };
        assert!(within_buffer.is_expired());
    }

    #[test]
    fn test_token_from_response() {
        let response: TokenResponse = serde_json::from_str(
            r#"{
                "access_token": "ya29.test",
                "expires_in": 3599,
                "refresh_token": "1//refresh",
                "scope": "openid email",
                "id_token": "eyJhbGciOi"
            }"#,
        )
        .unwrap();

        let token = Token::from_response(response).unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.id_token.as_deref(), Some("eyJhbGciOi"));
        assert!(token.expires_at.is_some());
        assert!(!token.is_expired());
    }

    #[test]
    fn test_empty_access_token_rejected() {
        let response = TokenResponse {
            access_token: String::new(),
            token_type: "Bearer".into(),
            expires_in: None,
            refresh_token: None,
            scope: None,
            id_token: None,
        };
        assert!(matches!(
            Token::from_response(response),
            Err(Error::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let token = Token {
            refresh_token: Some("refresh456".into()),
            ..Token::new("access123", "Bearer")
        };
        let debug = format!("{token:?}");
        assert!(!debug.contains("access123"));
        assert!(!debug.contains("refresh456"));
    }

    #[test]
    fn test_error_response() {
        let response: ErrorResponse =
            serde_json::from_str(r#"{"error": "invalid_client"}"#).unwrap();
        assert!(response.error_description.is_empty());
        assert!(matches!(
            response.into_error(),
            Error::OAuth { ref error, .. } if error == "invalid_client"
        ));
    }
}
