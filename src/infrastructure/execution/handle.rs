//! Execution handles: how the scheduler supervises a dispatched task body
//! regardless of which of the four execution modes it runs under.

use crate::domain::entities::statement::Value;
use crate::domain::errors::TaskError;

/// What a supervision poll finds.
pub enum PollResult {
    Running,
    Done(Result<Value, TaskError>),
}

/// A handle to one in-flight task execution. The scheduler polls it once
/// per cycle and calls `terminate` when `end_cond` fires or the timeout
/// elapses.
pub trait ExecutionHandle: Send {
    /// Non-blocking check for completion.
    fn poll(&mut self) -> PollResult;

    /// Requests cancellation. Idempotent. Effect depends on the concrete
    /// mode: cooperative flag for `thread`, signal for `process`, abort for
    /// `async`.
    fn terminate(&mut self);

    /// Called once the shutdown grace period (`shut_cycle_timeout`) has
    /// elapsed for a handle that has not reported completion. For modes
    /// that cannot truly force-kill their unit of work (`thread`), this
    /// detaches the handle so the scheduler can still report a terminal
    /// event and proceed rather than block shutdown forever.
    fn force_detach(&mut self);
}
