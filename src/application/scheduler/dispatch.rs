//! Shared task-dispatch machinery: turning a [`Task`]'s `body`/`execution`
//! pair into a running execution unit, and polling it back to a terminal
//! result regardless of which mode launched it.

use tokio::runtime::Handle as TokioHandle;

use crate::domain::entities::statement::Value;
use crate::domain::entities::task::{ExecutionMode, Task, TaskBody};
use crate::domain::errors::TaskError;
use crate::infrastructure::execution::{
    handle::{ExecutionHandle, PollResult},
    main_executor, AsyncHandle, ProcessHandle, ThreadHandle,
};

/// What dispatching a task produced: a `main` task runs to completion on
/// the calling thread before `launch` returns, everything else hands back
/// a handle the caller supervises across cycles.
pub enum Launched {
    Completed(Result<Value, TaskError>),
    Running(RunningHandle),
}

/// The supervised unit of one in-flight task, abstracting over the three
/// modes that outlive a single dispatch call.
pub enum RunningHandle {
    Thread(ThreadHandle),
    Process(ProcessHandle),
    Async(AsyncHandle),
}

impl RunningHandle {
    pub fn poll(&mut self) -> PollResult {
        match self {
            RunningHandle::Thread(h) => h.poll(),
            RunningHandle::Process(h) => h.poll(),
            RunningHandle::Async(h) => h.poll(),
        }
    }

    pub fn terminate(&mut self) {
        match self {
            RunningHandle::Thread(h) => h.terminate(),
            RunningHandle::Process(h) => h.terminate(),
            RunningHandle::Async(h) => h.terminate(),
        }
    }

    pub fn force_detach(&mut self) {
        match self {
            RunningHandle::Thread(h) => h.force_detach(),
            RunningHandle::Process(h) => h.force_detach(),
            RunningHandle::Async(h) => h.force_detach(),
        }
    }
}

/// Dispatches `task` per its `execution` mode. Fails with `SpawnFailed` if
/// the mode and body don't pair up (e.g. `process` execution on a `Sync`
/// body) — a configuration mistake this crate reports rather than
/// silently coercing.
pub fn launch(task: &Task, runtime: &TokioHandle) -> Result<Launched, TaskError> {
    let params = task.parameters.clone();
    match (task.execution, task.body()) {
        (ExecutionMode::Main, TaskBody::Sync(body)) => Ok(Launched::Completed(main_executor::run_inline(body.as_ref(), &params))),
        (ExecutionMode::Thread, TaskBody::Sync(body)) => Ok(Launched::Running(RunningHandle::Thread(ThreadHandle::spawn(body.clone(), params)))),
        (ExecutionMode::Process, TaskBody::Command(cmdline)) => {
            Ok(Launched::Running(RunningHandle::Process(ProcessHandle::spawn(cmdline, &params)?)))
        }
        (ExecutionMode::Async, TaskBody::Async(body)) => Ok(Launched::Running(RunningHandle::Async(AsyncHandle::spawn(body.clone(), params, runtime)))),
        (mode, body) => Err(TaskError::SpawnFailed(format!("execution mode {mode:?} cannot run a {body:?} body"))),
    }
}

/// Blocks the calling thread until `handle` reports completion, yielding
/// between polls. Used where the scheduler must run a task to completion
/// rather than supervise it across cycles (startup and shutdown tasks).
pub fn run_to_completion(mut handle: RunningHandle) -> Result<Value, TaskError> {
    loop {
        match handle.poll() {
            PollResult::Done(result) => return result,
            PollResult::Running => std::thread::sleep(std::time::Duration::from_millis(10)),
        }
    }
}
