//! Device Authorization Grant wire types (RFC 8628).

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::token::Token;

/// Grant type sent when polling the token endpoint.
pub const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Device authorization response.
///
/// Show [`user_code`](Self::user_code) and
/// [`verification_uri`](Self::verification_uri) to the user.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceAuthorizationResponse {
    /// Device code for polling. Never shown to the user.
    pub device_code: String,
    /// User code to display to the user.
    pub user_code: String,
    /// Verification URI where user should go.
    #[serde(alias = "verification_url")]
    pub verification_uri: String,
    /// Complete verification URI (optional).
    pub verification_uri_complete: Option<String>,
    /// Expiration time in seconds.
    pub expires_in: u32,
    /// Polling interval in seconds.
    #[serde(default = "default_interval")]
    pub interval: u32,
}

const fn default_interval() -> u32 {
    5
}

impl DeviceAuthorizationResponse {
    /// Lifetime of the device code.
    #[must_use]
    pub fn expires_in(&self) -> Duration {
        Duration::from_secs(u64::from(self.expires_in))
    }

    /// Minimum delay between polls requested by the server.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval))
    }

    /// Checks the invariants of a freshly decoded response.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidResponse` if a required field is empty or the
    /// code has no lifetime.
    pub fn validate(&self) -> Result<()> {
        if self.device_code.is_empty() {
            return Err(Error::InvalidResponse("empty device_code".into()));
        }
        if self.user_code.is_empty() {
            return Err(Error::InvalidResponse("empty user_code".into()));
        }
        if self.verification_uri.is_empty() {
            return Err(Error::InvalidResponse("empty verification_uri".into()));
        }
        if self.expires_in == 0 {
            return Err(Error::InvalidResponse("expires_in must be positive".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for DeviceAuthorizationResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceAuthorizationResponse")
            .field("user_code", &self.user_code)
            .field("verification_uri", &self.verification_uri)
            .field("verification_uri_complete", &self.verification_uri_complete)
            .field("expires_in", &self.expires_in)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

/// Result of one poll of the token endpoint.
#[derive(Debug)]
pub enum PollOutcome {
    /// `authorization_pending`: the user has not acted yet.
    Pending,
    /// `slow_down`: keep polling, less often.
    SlowDown,
    /// The user approved; tokens were issued.
    AccessGranted(Token),
    /// `access_denied`.
    AccessDenied,
    /// `expired_token`.
    Expired,
    /// The exchange failed or returned something unusable. Retried.
    TransportFailure(Error),
}
