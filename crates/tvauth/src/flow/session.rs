//! One device authorization lifecycle.

use std::sync::Arc;

use tokio::time::Instant;

use super::cancel::CancelHandle;
use super::device::{DeviceAuthorizationResponse, PollOutcome};
use super::scheduler::PollScheduler;
use super::state::{Event, SessionState, Step};
use crate::codec;
use crate::error::{Error, Result};
use crate::handle::AuthorizationHandle;
use crate::request::DeviceAuthorizationRequest;
use crate::token::Token;
use crate::transport::Transport;

/// Drives one request from the initial call to a terminal outcome.
///
/// At most one network call is in flight at a time. Cancellation interrupts
/// the wait between polls; a call already in flight finishes and its result
/// is dropped.
#[derive(Debug)]
pub(crate) struct DeviceAuthorizationSession<T> {
    transport: Arc<T>,
    scheduler: PollScheduler,
    request: DeviceAuthorizationRequest,
    cancel: CancelHandle,
    state: SessionState,
    polls: u32,
}

impl<T: Transport> DeviceAuthorizationSession<T> {
    pub(crate) const fn new(
        transport: Arc<T>,
        scheduler: PollScheduler,
        request: DeviceAuthorizationRequest,
        cancel: CancelHandle,
    ) -> Self {
        Self {
            transport,
            scheduler,
            request,
            cancel,
            state: SessionState::NotStarted,
            polls: 0,
        }
    }

    /// Runs the session to completion.
    ///
    /// `on_initialized` is called once the user code is known. Returns `None`
    /// if the session was cancelled before an outcome was determined.
    pub(crate) async fn run<I>(mut self, on_initialized: I) -> Option<Result<AuthorizationHandle>>
    where
        I: FnOnce(DeviceAuthorizationResponse),
    {
        if self.cancel.is_cancelled() {
            return None;
        }

        let authorization = match self.initialize().await {
            Ok(authorization) => authorization,
            Err(_) if self.cancel.is_cancelled() => {
                self.advance(Event::Cancelled);
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Device authorization request failed");
                self.state = SessionState::Completed;
                return Some(Err(Error::authorization(e)));
            }
        };

        tracing::info!(
            user_code = %authorization.user_code,
            verification_uri = %authorization.verification_uri,
            expires_in = authorization.expires_in,
            interval = authorization.interval,
            "Device authorization started"
        );

        let mut step = self.advance(Event::Initialized(&authorization));
        // No callbacks once cancelled.
        if self.cancel.is_cancelled() {
            self.advance(Event::Cancelled);
            return None;
        }
        on_initialized(authorization);

        loop {
            step = match step {
                Step::Sleep(until) => {
                    debug_assert_eq!(self.state.next_poll(), Some(until));
                    tokio::select! {
                        biased;
                        () = self.cancel.cancelled() => self.advance(Event::Cancelled),
                        () = tokio::time::sleep_until(until) => self.advance(Event::Woke),
                    }
                }
                Step::Poll(device_code) => {
                    let outcome = self.poll(&device_code).await;
                    if self.cancel.is_cancelled() {
                        tracing::debug!("Discarding poll result after cancellation");
                        self.advance(Event::Cancelled)
                    } else {
                        self.advance(Event::Polled(outcome))
                    }
                }
                Step::Finish(result) => {
                    debug_assert!(self.state.is_terminal());
                    return Some(self.finish(result));
                }
                Step::Stop => return None,
            };
        }
    }

    async fn initialize(&self) -> Result<DeviceAuthorizationResponse> {
        let post = codec::encode_device_authorization(&self.request)?;
        tracing::debug!(endpoint = %post.url, "Requesting device authorization");
        let response = self.transport.post_form(post).await?;
        codec::decode_device_authorization(&response)
    }

    async fn poll(&mut self, device_code: &str) -> PollOutcome {
        self.polls += 1;
        tracing::debug!(attempt = self.polls, "Polling token endpoint");

        let post = codec::encode_token_poll(&self.request, device_code);
        let outcome = match self.transport.post_form(post).await {
            Ok(response) => codec::decode_poll_outcome(&response),
            Err(e) => PollOutcome::TransportFailure(e),
        };

        match &outcome {
            PollOutcome::Pending => tracing::trace!("Authorization pending"),
            PollOutcome::SlowDown => tracing::debug!("Server asked to slow down"),
            PollOutcome::TransportFailure(e) => {
                tracing::warn!(attempt = self.polls, error = %e, "Poll failed");
            }
            PollOutcome::AccessGranted(_) | PollOutcome::AccessDenied | PollOutcome::Expired => {}
        }
        outcome
    }

    fn advance(&mut self, event: Event<'_>) -> Step {
        let state = std::mem::take(&mut self.state);
        let (state, step) = state.next(event, &self.scheduler, Instant::now());
        self.state = state;
        step
    }

    fn finish(&self, result: Result<Token>) -> Result<AuthorizationHandle> {
        match result {
            Ok(token) => {
                tracing::info!(polls = self.polls, "Device authorization granted");
                Ok(AuthorizationHandle::new(token, &self.request))
            }
            Err(e) => {
                tracing::info!(polls = self.polls, error = %e, "Device authorization ended");
                Err(e)
            }
        }
    }
}
