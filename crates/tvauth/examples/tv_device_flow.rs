//! Example: signing in to Google from a device without a keyboard
//!
//! This example demonstrates how to:
//! 1. Request a user code for Google's device flow
//! 2. Show the code and verification URL to the user
//! 3. Wait while the library polls for approval
//! 4. Cancel the wait with Ctrl+C
//!
//! ## Prerequisites
//!
//! 1. Create an OAuth client of type "TVs and Limited Input devices" in the
//!    Google Cloud console and note its client ID and secret.
//!
//! 2. Set environment variables:
//!    ```bash
//!    export OAUTH_CLIENT_ID="your-client-id-here"
//!    export OAUTH_CLIENT_SECRET="your-client-secret-here"
//!    ```
//!
//! ## Running
//!
//! ```bash
//! RUST_LOG=tvauth=debug cargo run --example tv_device_flow
//! ```

use std::env;

use tokio::sync::oneshot;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tvauth::{DeviceAuthorizationRequest, DeviceFlow, Error, ServiceConfiguration};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tvauth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let client_id = env::var("OAUTH_CLIENT_ID")?;
    let client_secret = env::var("OAUTH_CLIENT_SECRET")?;

    let request = DeviceAuthorizationRequest::new(ServiceConfiguration::google()?, client_id)
        .with_client_secret(client_secret)
        .with_scopes(["openid", "email", "profile"]);

    let flow = DeviceFlow::new()?;
    let (done_tx, done_rx) = oneshot::channel();

    let cancel = flow.start(
        request,
        |auth| {
            println!("\nOn your phone or computer, visit:\n");
            println!("    {}\n", auth.verification_uri);
            println!("and enter the code:\n");
            println!("    {}\n", auth.user_code);
            println!("The code expires in {} seconds.", auth.expires_in);
        },
        move |result| {
            let _ = done_tx.send(result);
        },
    );

    let result = tokio::select! {
        result = done_rx => result?,
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            println!("\nSign-in cancelled.");
            return Ok(());
        }
    };

    match result {
        Ok(handle) => {
            println!("\n✓ Signed in");
            println!("  Token type: {}", handle.token().token_type);
            println!("  Scope: {}", handle.scope());
            println!("  Has refresh token: {}", handle.refresh_token().is_some());
            println!("  Has ID token: {}", handle.token().id_token.is_some());
        }
        Err(Error::AccessDenied) => println!("\nSign-in was declined."),
        Err(Error::Expired) => println!("\nThe code expired. Run the example again."),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
