//! `async`-mode execution: a task body running as a tokio task on a
//! background runtime, cancelled promptly via `JoinHandle::abort()`.
//!
//! Completion is reported through a channel rather than by polling the
//! `JoinHandle` itself, so [`AsyncHandle::poll`] never needs an ambient
//! tokio context — the scheduler's own loop is plain synchronous code.

use std::collections::HashMap;
use std::sync::mpsc::{Receiver, TryRecvError};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::domain::entities::statement::Value;
use crate::domain::errors::TaskError;
use crate::infrastructure::execution::handle::{ExecutionHandle, PollResult};

type AsyncBody = std::sync::Arc<
    dyn Fn(HashMap<String, Value>) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Value, TaskError>> + Send>> + Send + Sync,
>;

pub struct AsyncHandle {
    join: JoinHandle<()>,
    result_rx: Receiver<Result<Value, TaskError>>,
    aborted: bool,
}

impl AsyncHandle {
    pub fn spawn(body: AsyncBody, params: HashMap<String, Value>, runtime: &Handle) -> Self {
        let (tx, rx) = std::sync::mpsc::channel();
        let join = runtime.spawn(async move {
            let result = body(params).await;
            let _ = tx.send(result);
        });
        Self { join, result_rx: rx, aborted: false }
    }
}

impl ExecutionHandle for AsyncHandle {
    fn poll(&mut self) -> PollResult {
        match self.result_rx.try_recv() {
            Ok(result) => PollResult::Done(result),
            Err(TryRecvError::Empty) => PollResult::Running,
            Err(TryRecvError::Disconnected) => PollResult::Done(Err(TaskError::Terminated)),
        }
    }

    /// Aborts the underlying tokio task. Unlike `thread`-mode, this is
    /// prompt cancellation at the next `.await` point, with no detach gap.
    fn terminate(&mut self) {
        if !self.aborted {
            self.join.abort();
            self.aborted = true;
        }
    }

    fn force_detach(&mut self) {
        self.terminate();
    }
}
