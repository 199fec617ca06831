//! Typed error kinds for the scheduler core.
//!
//! `ObserveError` and `TaskError` are the narrow, layer-local error types
//! produced by condition evaluation and task execution respectively.
//! `SchedulerError` is the crate-boundary enum those fold into whenever an
//! error should bubble up to the caller rather than be swallowed as an
//! event.

use thiserror::Error;

/// Error raised by a Statement's `observe` implementation.
///
/// Everything here is swallowed by [`crate::domain::entities::condition::Condition::evaluate`]
/// and logged, collapsing the predicate to `false` — except [`ObserveError::Interrupt`],
/// which always propagates regardless of `Config::debug`.
#[derive(Debug, Error)]
pub enum ObserveError {
    #[error("observation failed: {0}")]
    Failed(String),

    #[error("task {0:?} is not registered in this session")]
    UnknownTask(String),

    #[error("interrupted")]
    Interrupt,
}

/// Error raised by a task body during execution.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task panicked or returned an uncaught error: {0}")]
    Crash(String),

    #[error("task exceeded its timeout")]
    Timeout,

    #[error("task was terminated")]
    Terminated,

    #[error("failed to spawn task body: {0}")]
    SpawnFailed(String),
}

/// Crate-boundary error enum covering configuration, condition, task, and
/// scheduler-fatal failures.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("condition evaluation error: {0}")]
    Condition(#[from] ObserveError),

    #[error("task crashed: {0}")]
    TaskCrash(String),

    #[error("task timed out")]
    TaskTimeout,

    #[error("scheduler invariant violated: {0}")]
    Fatal(String),

    #[error("interrupted")]
    Interrupt,
}

impl SchedulerError {
    /// Process exit code: 2 for a configuration error, 130 for an
    /// interrupt, 1 for anything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            SchedulerError::Config(_) => 2,
            SchedulerError::Interrupt => 130,
            _ => 1,
        }
    }
}
