//! Single-flight execution controller.
//!
//! Every generation or transcription attempt gets a fresh [`AttemptToken`].
//! Exactly one token is current for the whole controller; starting a new
//! attempt cancels the previous one first. The pipelines re-check
//! [`is_current`] before each mutation so a superseded attempt can never
//! write state.
//!
//! [`is_current`]: ExecutionController::is_current

use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Default bound on one attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(60);

/// Identity of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptToken(Uuid);

impl AttemptToken {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for AttemptToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Controller-level processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerStatus {
    #[default]
    Idle,
    Generating,
    Cancelled,
    Error,
}

/// How a finished attempt ended (cancellation never reaches `finish`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed,
}

/// The attempt currently recorded by the controller.
///
/// A transcription attempt has no turn yet, and no session when it was
/// started before the first message.
#[derive(Debug, Clone)]
pub struct ExecutionAttempt {
    pub token: AttemptToken,
    pub session_id: Option<String>,
    pub turn_id: Option<String>,
    cancel: CancellationToken,
}

/// Handed to whoever started an attempt.
#[derive(Debug, Clone)]
pub struct AttemptHandle {
    token: AttemptToken,
    started: Instant,
    cancel: CancellationToken,
}

impl AttemptHandle {
    pub fn token(&self) -> AttemptToken {
        self.token
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// True once this attempt was cancelled or superseded.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Result of running a collaborator call under an attempt's guard.
#[derive(Debug)]
pub enum Guarded<T> {
    Completed(T),
    /// The attempt was cancelled or superseded; the call was dropped.
    Cancelled,
    /// The call exceeded the controller timeout and was dropped.
    TimedOut(Duration),
}

#[derive(Debug, Default)]
struct ControllerState {
    current: Option<ExecutionAttempt>,
    status: ControllerStatus,
}

impl ControllerState {
    fn cancel_current(&mut self) -> bool {
        match self.current.take() {
            Some(attempt) => {
                attempt.cancel.cancel();
                self.status = ControllerStatus::Cancelled;
                tracing::info!(token = %attempt.token, "Attempt cancelled");
                true
            }
            None => false,
        }
    }
}

/// Issues attempt tokens and enforces single-flight execution.
#[derive(Debug)]
pub struct ExecutionController {
    state: Mutex<ControllerState>,
    timeout: Duration,
}

impl Default for ExecutionController {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPT_TIMEOUT)
    }
}

impl ExecutionController {
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: Mutex::new(ControllerState::default()),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a generation attempt for one turn.
    pub fn begin_attempt(
        &self,
        session_id: impl Into<String>,
        turn_id: impl Into<String>,
    ) -> AttemptHandle {
        self.record(Some(session_id.into()), Some(turn_id.into()))
    }

    /// Starts a transcription attempt. It supersedes and is superseded by
    /// generation attempts like any other.
    pub fn begin_transcription(&self, session_id: Option<String>) -> AttemptHandle {
        self.record(session_id, None)
    }

    /// Cancels whatever attempt is recorded, then records a new one as current.
    fn record(&self, session_id: Option<String>, turn_id: Option<String>) -> AttemptHandle {
        let mut state = self.state();

        if let Some(previous) = state.current.take() {
            previous.cancel.cancel();
            tracing::info!(
                token = %previous.token,
                session_id = ?previous.session_id,
                "Superseding in-flight attempt"
            );
        }

        let attempt = ExecutionAttempt {
            token: AttemptToken::new(),
            session_id,
            turn_id,
            cancel: CancellationToken::new(),
        };
        let handle = AttemptHandle {
            token: attempt.token,
            started: Instant::now(),
            cancel: attempt.cancel.clone(),
        };

        tracing::debug!(token = %attempt.token, turn_id = ?attempt.turn_id, "Attempt started");
        state.current = Some(attempt);
        state.status = ControllerStatus::Generating;
        handle
    }

    /// Whether `token` still holds authority to mutate state.
    pub fn is_current(&self, token: AttemptToken) -> bool {
        self.state()
            .current
            .as_ref()
            .is_some_and(|attempt| attempt.token == token)
    }

    /// Aborts the current attempt, if any. Returns whether one was cancelled.
    pub fn cancel(&self) -> bool {
        self.state().cancel_current()
    }

    /// Cancels the current attempt only when it belongs to `session_id`.
    pub fn cancel_for_session(&self, session_id: &str) -> bool {
        let mut state = self.state();
        let belongs = state
            .current
            .as_ref()
            .is_some_and(|attempt| attempt.session_id.as_deref() == Some(session_id));
        belongs && state.cancel_current()
    }

    /// Releases the current slot after the terminal transition was committed.
    ///
    /// A stale token is ignored and leaves the controller untouched.
    pub fn finish(&self, token: AttemptToken, outcome: AttemptOutcome) -> bool {
        let mut state = self.state();
        if !state
            .current
            .as_ref()
            .is_some_and(|attempt| attempt.token == token)
        {
            return false;
        }
        state.current = None;
        state.status = match outcome {
            AttemptOutcome::Succeeded => ControllerStatus::Idle,
            AttemptOutcome::Failed => ControllerStatus::Error,
        };
        true
    }

    pub fn status(&self) -> ControllerStatus {
        self.state().status
    }

    pub fn current(&self) -> Option<ExecutionAttempt> {
        self.state().current.clone()
    }

    /// Runs `future` until it completes, the attempt is cancelled, or the
    /// timeout elapses. Dropping the future aborts the underlying request.
    pub async fn guard<F>(&self, handle: &AttemptHandle, future: F) -> Guarded<F::Output>
    where
        F: Future,
    {
        let timeout = self.timeout;
        tokio::select! {
            biased;
            _ = handle.cancel.cancelled() => Guarded::Cancelled,
            result = tokio::time::timeout(timeout, future) => match result {
                Ok(output) => Guarded::Completed(output),
                Err(_) => {
                    tracing::warn!(token = %handle.token, ?timeout, "Attempt timed out");
                    Guarded::TimedOut(timeout)
                }
            },
        }
    }
}
