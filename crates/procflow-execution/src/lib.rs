//! Execution control for generation attempts.
//!
//! Hands out attempt tokens, keeps at most one attempt current, and bounds
//! collaborator calls by cancellation and timeout.

pub mod controller;

pub use controller::{
    AttemptHandle, AttemptOutcome, AttemptToken, ControllerStatus, DEFAULT_ATTEMPT_TIMEOUT,
    ExecutionAttempt, ExecutionController, Guarded,
};
