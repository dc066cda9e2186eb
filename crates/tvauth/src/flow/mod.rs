//! Device authorization flow.

mod cancel;
mod device;
mod scheduler;
mod session;
mod state;

pub use cancel::CancelHandle;
pub use device::{DEVICE_CODE_GRANT_TYPE, DeviceAuthorizationResponse, PollOutcome};
pub use scheduler::{PollPolicy, PollScheduler, Schedule};

use std::sync::Arc;

use cancel::CancelOnDrop;
use session::DeviceAuthorizationSession;

use crate::error::{Error, Result};
use crate::handle::AuthorizationHandle;
use crate::request::DeviceAuthorizationRequest;
use crate::transport::{ReqwestTransport, Transport};

/// Starts device authorization sessions against any server.
///
/// Holds the transport and polling policy; each call to [`start`](Self::start)
/// or [`authorize`](Self::authorize) runs an independent session.
#[derive(Debug)]
pub struct DeviceFlow<T = ReqwestTransport> {
    transport: Arc<T>,
    scheduler: PollScheduler,
}

impl<T> Clone for DeviceFlow<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            scheduler: self.scheduler,
        }
    }
}

impl DeviceFlow<ReqwestTransport> {
    /// Creates a flow that talks HTTP through `reqwest` with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        Ok(Self::with_transport(ReqwestTransport::new()?))
    }
}

impl<T: Transport + 'static> DeviceFlow<T> {
    /// Creates a flow over the given transport.
    #[must_use]
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            scheduler: PollScheduler::default(),
        }
    }

    /// Sets the polling policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.scheduler = PollScheduler::new(policy);
        self
    }

    /// The polling policy in effect.
    #[must_use]
    pub const fn policy(&self) -> &PollPolicy {
        self.scheduler.policy()
    }

    /// The transport sessions use.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Starts a session in the background.
    ///
    /// `on_initialized` receives the user code and verification URI once the
    /// server has registered the request; show them to the user.
    /// `on_completed` receives the outcome exactly once, unless the returned
    /// handle is cancelled first, in which case it is never called.
    ///
    /// An invalid request is reported through `on_completed` before this
    /// method returns, and `on_initialized` is not called. The session runs as
    /// a Tokio task; called outside a runtime, the flow fails the same way.
    pub fn start<I, C>(
        &self,
        request: DeviceAuthorizationRequest,
        on_initialized: I,
        on_completed: C,
    ) -> CancelHandle
    where
        I: FnOnce(DeviceAuthorizationResponse) + Send + 'static,
        C: FnOnce(Result<AuthorizationHandle>) + Send + 'static,
    {
        let cancel = CancelHandle::new();

        let runtime = match request.validate().and_then(|()| current_runtime()) {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected device authorization request");
                if cancel.try_complete() {
                    on_completed(Err(e));
                }
                return cancel;
            }
        };

        let session = DeviceAuthorizationSession::new(
            Arc::clone(&self.transport),
            self.scheduler,
            request,
            cancel.clone(),
        );
        let handle = cancel.clone();
        runtime.spawn(async move {
            let Some(result) = session.run(on_initialized).await else {
                return;
            };
            if handle.try_complete() {
                on_completed(result);
            }
        });

        cancel
    }

    /// Runs a session to completion in the current task.
    ///
    /// Dropping the returned future cancels the session.
    ///
    /// # Errors
    ///
    /// Returns the same errors `start` delivers to its completion callback.
    pub async fn authorize<I>(
        &self,
        request: DeviceAuthorizationRequest,
        on_initialized: I,
    ) -> Result<AuthorizationHandle>
    where
        I: FnOnce(DeviceAuthorizationResponse),
    {
        request.validate()?;

        let guard = CancelOnDrop(CancelHandle::new());
        let session = DeviceAuthorizationSession::new(
            Arc::clone(&self.transport),
            self.scheduler,
            request,
            guard.0.clone(),
        );
        let result = session.run(on_initialized).await;
        guard.0.try_complete();
        result.unwrap_or(Err(Error::Cancelled))
    }
}

fn current_runtime() -> Result<tokio::runtime::Handle> {
    tokio::runtime::Handle::try_current().map_err(|_| {
        Error::Configuration("device authorization must be started inside a Tokio runtime".into())
    })
}
