//! Session state machine.
//!
//! [`SessionState::next`] is the only place state changes. It takes the
//! current state, an [`Event`] and the current time, and returns the new
//! state plus the [`Step`] the session should take. No I/O happens here.

use std::time::Duration;

use tokio::time::Instant;

use super::device::{DeviceAuthorizationResponse, PollOutcome};
use super::scheduler::{PollScheduler, Schedule};
use crate::error::{Error, Result};
use crate::token::Token;

/// Bookkeeping while the user has not acted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polling {
    pub(crate) device_code: String,
    pub(crate) next_poll: Instant,
    pub(crate) interval: Duration,
    pub(crate) deadline: Instant,
    pub(crate) consecutive_failures: u32,
}

/// Lifecycle of one device authorization session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// The initial call has not completed.
    #[default]
    NotStarted,
    /// Waiting for the user; polling the token endpoint.
    AwaitingUserAction(Polling),
    /// Cancelled by the caller. Terminal.
    Cancelled,
    /// An outcome was determined. Terminal.
    Completed,
}

/// Input to the state machine.
#[derive(Debug)]
pub enum Event<'a> {
    /// The device authorization endpoint answered.
    Initialized(&'a DeviceAuthorizationResponse),
    /// The scheduled poll time arrived.
    Woke,
    /// A poll returned.
    Polled(PollOutcome),
    /// The caller cancelled.
    Cancelled,
}

/// What the session does next.
#[derive(Debug)]
pub enum Step {
    /// Sleep until the instant, then wake.
    Sleep(Instant),
    /// Poll the token endpoint with this device code.
    Poll(String),
    /// Deliver this result.
    Finish(Result<Token>),
    /// Stop without delivering anything.
    Stop,
}

impl SessionState {
    /// Returns true for `Cancelled` and `Completed`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }

    /// When the next poll is due, while awaiting the user.
    #[must_use]
    pub const fn next_poll(&self) -> Option<Instant> {
        match self {
            Self::AwaitingUserAction(polling) => Some(polling.next_poll),
            _ => None,
        }
    }

    /// Applies `event` at time `now`.
    #[must_use]
    pub fn next(self, event: Event<'_>, scheduler: &PollScheduler, now: Instant) -> (Self, Step) {
        match (self, event) {
            (state @ (Self::Cancelled | Self::Completed), _) => (state, Step::Stop),
            (_, Event::Cancelled) => (Self::Cancelled, Step::Stop),
            (Self::NotStarted, Event::Initialized(authorization)) => {
                let deadline = now + authorization.expires_in();
                let polling = Polling {
                    device_code: authorization.device_code.clone(),
                    next_poll: now,
                    interval: scheduler.initial_interval(authorization.interval()),
                    deadline,
                    consecutive_failures: 0,
                };
                reschedule(polling, scheduler, now)
            }
            (Self::AwaitingUserAction(polling), Event::Woke) => {
                if now >= polling.deadline {
                    complete(Err(Error::Expired))
                } else {
                    let device_code = polling.device_code.clone();
                    (Self::AwaitingUserAction(polling), Step::Poll(device_code))
                }
            }
            (Self::AwaitingUserAction(polling), Event::Polled(outcome)) => {
                on_poll_outcome(polling, outcome, scheduler, now)
            }
            (state, _) => (state, Step::Stop),
        }
    }
}

fn on_poll_outcome(
    mut polling: Polling,
    outcome: PollOutcome,
    scheduler: &PollScheduler,
    now: Instant,
) -> (SessionState, Step) {
    match outcome {
        PollOutcome::Pending => {
            polling.consecutive_failures = 0;
            reschedule(polling, scheduler, now)
        }
        PollOutcome::SlowDown => {
            polling.consecutive_failures = 0;
            polling.interval = scheduler.slowed_down(polling.interval);
            reschedule(polling, scheduler, now)
        }
        PollOutcome::AccessGranted(token) => complete(Ok(token)),
        PollOutcome::AccessDenied => complete(Err(Error::AccessDenied)),
        PollOutcome::Expired => complete(Err(Error::Expired)),
        PollOutcome::TransportFailure(cause) => {
            polling.consecutive_failures += 1;
            if !scheduler.retries_exhausted(polling.consecutive_failures) {
                return reschedule(polling, scheduler, now);
            }
            let error = match cause {
                e @ Error::UnexpectedServer { .. } => e,
                e => Error::Network {
                    attempts: polling.consecutive_failures,
                    source: Box::new(e),
                },
            };
            complete(Err(error))
        }
    }
}

fn reschedule(mut polling: Polling, scheduler: &PollScheduler, now: Instant) -> (SessionState, Step) {
    match scheduler.next_poll(polling.interval, polling.deadline, now) {
        Schedule::WaitThen(next_poll) => {
            polling.next_poll = next_poll;
            (SessionState::AwaitingUserAction(polling), Step::Sleep(next_poll))
        }
        Schedule::DeadlineExceeded => complete(Err(Error::Expired)),
    }
}

fn complete(result: Result<Token>) -> (SessionState, Step) {
    (SessionState::Completed, Step::Finish(result))
}
