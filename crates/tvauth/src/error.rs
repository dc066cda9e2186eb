//! Error types for device authorization.

/// Result type alias for device authorization operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Device authorization error types.
///
/// The first six variants are the terminal outcomes a session can report
/// through its completion callback. The remaining variants describe the
/// underlying cause and usually appear wrapped inside one of them.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request was malformed; no network call was made.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The initial device authorization call failed.
    #[error("Device authorization request failed: {0}")]
    Authorization(#[source] Box<Error>),

    /// Polling gave up after too many consecutive transport failures.
    #[error("Network error after {attempts} consecutive failed polls: {source}")]
    Network {
        /// Number of consecutive failed poll attempts.
        attempts: u32,
        /// Last failure observed.
        #[source]
        source: Box<Error>,
    },

    /// The user denied the authorization request.
    #[error("User denied authorization")]
    AccessDenied,

    /// The device code expired before the user approved the request.
    #[error("Device code expired before authorization completed")]
    Expired,

    /// The token endpoint kept answering with an error code this client does not know.
    #[error("Unexpected server error: {error} - {description}")]
    UnexpectedServer {
        /// Error code (e.g., `invalid_client`).
        error: String,
        /// Human-readable description.
        description: String,
    },

    /// The session was cancelled before reaching an outcome.
    #[error("Device authorization cancelled")]
    Cancelled,

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// `OAuth2` error from server.
    #[error("OAuth2 error: {error} - {description}")]
    OAuth {
        /// Error code (e.g., `invalid_scope`).
        error: String,
        /// Human-readable description.
        description: String,
    },

    /// The server response could not be understood.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Creates an OAuth error from error code and description.
    #[must_use]
    pub fn oauth_error(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self::OAuth {
            error: error.into(),
            description: description.into(),
        }
    }

    /// Wraps a failure of the initial device authorization call.
    #[must_use]
    pub fn authorization(cause: Self) -> Self {
        Self::Authorization(Box::new(cause))
    }

    /// Returns true if the flow ended because of something the user did (or
    /// did not do in time), rather than a fault.
    #[must_use]
    pub const fn is_terminal_user_outcome(&self) -> bool {
        matches!(self, Self::AccessDenied | Self::Expired)
    }
}
