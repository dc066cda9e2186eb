//! # tvauth
//!
//! `OAuth2` Device Authorization Grant (RFC 8628) for TVs, consoles and other
//! limited-input devices.
//!
//! ## Features
//!
//! - **Device flow**: initial request, interval-governed polling, `slow_down`
//!   backoff, expiry detection and cooperative cancellation
//! - **Callback or future API**: [`DeviceFlow::start`] returns a [`CancelHandle`];
//!   [`DeviceFlow::authorize`] runs the same session as a future
//! - **Service configurations**: Google and Microsoft presets, or OpenID Connect discovery
//! - **Pluggable transport**: `reqwest` by default, any [`Transport`] in tests
//!
//! ## Quick Start
//!
//! ```ignore
//! use tvauth::{DeviceAuthorizationRequest, DeviceFlow, ServiceConfiguration};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let request = DeviceAuthorizationRequest::new(ServiceConfiguration::google()?, "your_client_id")
//!         .with_client_secret("your_secret")
//!         .with_scopes(["openid", "email"]);
//!
//!     let flow = DeviceFlow::new()?;
//!     let cancel = flow.start(
//!         request,
//!         |auth| {
//!             println!("Visit: {}", auth.verification_uri);
//!             println!("Enter code: {}", auth.user_code);
//!         },
//!         |result| match result {
//!             Ok(handle) => println!("Authorized: {}", handle.scope()),
//!             Err(e) => eprintln!("Authorization failed: {e}"),
//!         },
//!     );
//!
//!     // Later, if the user backs out of the sign-in screen:
//!     cancel.cancel();
//!     Ok(())
//! }
//! ```
//!
//! ### As a future
//!
//! ```ignore
//! let handle = flow
//!     .authorize(request, |auth| println!("Enter {} at {}", auth.user_code, auth.verification_uri))
//!     .await?;
//! let header = handle.authorization_header();
//! ```
//!
//! ## Polling policy
//!
//! The first poll happens one interval after the user code is issued. Each
//! `slow_down` adds [`PollPolicy::slow_down_increment`] (5 seconds by
//! default) to the interval. Failed polls are retried up to
//! [`PollPolicy::max_transport_retries`] consecutive times (3 by default). A
//! poll that would land at or after the device code's expiry is never sent.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod codec;
mod error;
pub mod flow;
mod handle;
mod request;
pub mod service;
pub mod token;
pub mod transport;

pub use error::{Error, Result};
pub use flow::{
    CancelHandle, DeviceAuthorizationResponse, DeviceFlow, PollOutcome, PollPolicy, PollScheduler,
    Schedule,
};
pub use handle::AuthorizationHandle;
pub use request::{ClientAuthMethod, DeviceAuthorizationRequest};
pub use service::ServiceConfiguration;
pub use token::Token;
pub use transport::{FormPost, HttpResponse, ReqwestTransport, Transport, TransportConfig};
