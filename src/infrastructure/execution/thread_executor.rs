//! `thread`-mode execution: a worker thread sharing process memory.
//!
//! Cancellation is cooperative via an `AtomicBool` the task body is
//! expected to check; forced termination at the shutdown grace period
//! can only detach the handle, not actually stop the OS thread (there is
//! no sound "kill this thread" primitive on top of the standard library).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::domain::entities::statement::Value;
use crate::domain::errors::TaskError;
use crate::infrastructure::execution::handle::{ExecutionHandle, PollResult};

/// Checked by a cooperative task body to notice a termination request.
/// Exposed to task bodies via closure capture as the `ShouldCancel` argument.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

pub struct ThreadHandle {
    join: Option<JoinHandle<Result<Value, TaskError>>>,
    cancel: CancelToken,
    detached: bool,
}

impl ThreadHandle {
    pub fn spawn(
        body: Arc<dyn Fn(&HashMap<String, Value>, crate::domain::entities::task::ShouldCancel) -> Result<Value, TaskError> + Send + Sync>,
        params: HashMap<String, Value>,
    ) -> Self {
        let cancel = CancelToken::new();
        let cancel_for_body = cancel.clone();
        let join = std::thread::spawn(move || body(&params, &|| cancel_for_body.is_cancelled()));
        Self { join: Some(join), cancel, detached: false }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }
}

impl ExecutionHandle for ThreadHandle {
    fn poll(&mut self) -> PollResult {
        if self.detached {
            return PollResult::Done(Err(TaskError::Terminated));
        }
        match &self.join {
            Some(handle) if handle.is_finished() => {
                let handle = self.join.take().unwrap();
                let result = handle.join().unwrap_or_else(|_| Err(TaskError::Crash("thread panicked".to_string())));
                PollResult::Done(result)
            }
            Some(_) => PollResult::Running,
            None => PollResult::Done(Err(TaskError::Terminated)),
        }
    }

    fn terminate(&mut self) {
        self.cancel.cancel();
    }

    fn force_detach(&mut self) {
        self.cancel.cancel();
        self.detached = true;
    }
}
