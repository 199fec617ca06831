//! Task entity: a named unit of work with start/run/end/timeout
//! conditions, an execution mode, and a lifecycle state machine.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use std::future::Future;

use super::condition::Condition;
use super::statement::Value;
use crate::domain::errors::TaskError;

/// A cooperative-cancellation check a `thread`-mode task body is expected
/// to poll periodically. Ignored by bodies that run to completion
/// quickly; long-running bodies should check it between units of work.
pub type ShouldCancel<'a> = &'a (dyn Fn() -> bool + Sync);

/// A task's callable body. Since loading it from a module path at
/// runtime is out of scope, a task runs one of an in-process sync
/// closure, an in-process async closure, or an external command line.
/// `execution` selects which variant a task must carry.
#[derive(Clone)]
pub enum TaskBody {
    Sync(Arc<dyn Fn(&HashMap<String, Value>, ShouldCancel) -> Result<Value, TaskError> + Send + Sync>),
    Async(Arc<dyn Fn(HashMap<String, Value>) -> Pin<Box<dyn Future<Output = Result<Value, TaskError>> + Send>> + Send + Sync>),
    Command(String),
}

impl std::fmt::Debug for TaskBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskBody::Sync(_) => write!(f, "TaskBody::Sync(..)"),
            TaskBody::Async(_) => write!(f, "TaskBody::Async(..)"),
            TaskBody::Command(cmd) => write!(f, "TaskBody::Command({cmd:?})"),
        }
    }
}

/// Where a task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Main,
    Thread,
    Process,
    Async,
}

/// Last recorded lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Created,
    Inactive,
    Run,
    Success,
    Fail,
    Terminate,
}

#[derive(Debug, Clone)]
pub struct Task {
    name: String,
    body: TaskBody,
    pub start_cond: Condition,
    /// Gates dispatch independently of `start_cond`: checked every cycle
    /// before `start_cond`/`force_run`, so a false `run_cond` blocks the
    /// task even when forced. Defaults to always-true.
    pub run_cond: Condition,
    pub end_cond: Condition,
    pub timeout: Option<Duration>,
    pub execution: ExecutionMode,
    pub on_startup: bool,
    pub on_shutdown: bool,
    pub disabled: bool,
    pub force_run: bool,
    pub parameters: HashMap<String, Value>,
    status: TaskStatus,
    last_run: Option<DateTime<Local>>,
    last_success: Option<DateTime<Local>>,
    last_fail: Option<DateTime<Local>>,
    last_terminate: Option<DateTime<Local>>,
}

impl Task {
    fn blank(name: impl Into<String>, body: TaskBody, execution: ExecutionMode) -> Self {
        Self {
            name: name.into(),
            body,
            start_cond: Condition::always_false(),
            run_cond: Condition::always_true(),
            end_cond: Condition::always_false(),
            timeout: None,
            execution,
            on_startup: false,
            on_shutdown: false,
            disabled: false,
            force_run: false,
            parameters: HashMap::new(),
            status: TaskStatus::Created,
            last_run: None,
            last_success: None,
            last_fail: None,
            last_terminate: None,
        }
    }

    /// An in-process synchronous task body, run under `main` or `thread`
    /// execution (defaults to `thread`).
    pub fn new_sync(name: impl Into<String>, func: Arc<dyn Fn(&HashMap<String, Value>, ShouldCancel) -> Result<Value, TaskError> + Send + Sync>) -> Self {
        Self::blank(name, TaskBody::Sync(func), ExecutionMode::Thread)
    }

    /// An in-process asynchronous task body, run under `async` execution.
    pub fn new_async(name: impl Into<String>, func: Arc<dyn Fn(HashMap<String, Value>) -> Pin<Box<dyn Future<Output = Result<Value, TaskError>> + Send>> + Send + Sync>) -> Self {
        Self::blank(name, TaskBody::Async(func), ExecutionMode::Async)
    }

    /// An external command line, run under `process` execution.
    pub fn new_command(name: impl Into<String>, cmdline: impl Into<String>) -> Self {
        Self::blank(name, TaskBody::Command(cmdline.into()), ExecutionMode::Process)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &TaskBody {
        &self.body
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn last_run(&self) -> Option<DateTime<Local>> {
        self.last_run
    }

    pub fn last_success(&self) -> Option<DateTime<Local>> {
        self.last_success
    }

    pub fn last_fail(&self) -> Option<DateTime<Local>> {
        self.last_fail
    }

    pub fn last_terminate(&self) -> Option<DateTime<Local>> {
        self.last_terminate
    }

    pub fn is_alive(&self) -> bool {
        self.status == TaskStatus::Run
    }

    pub fn with_execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_start_cond(mut self, cond: Condition) -> Self {
        self.start_cond = cond;
        self
    }

    pub fn with_run_cond(mut self, cond: Condition) -> Self {
        self.run_cond = cond;
        self
    }

    pub fn with_end_cond(mut self, cond: Condition) -> Self {
        self.end_cond = cond;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn on_startup(mut self, yes: bool) -> Self {
        self.on_startup = yes;
        self
    }

    pub fn on_shutdown(mut self, yes: bool) -> Self {
        self.on_shutdown = yes;
        self
    }

    pub fn disabled(mut self, yes: bool) -> Self {
        self.disabled = yes;
        self
    }

    pub fn force_run(mut self, yes: bool) -> Self {
        self.force_run = yes;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    /// Records a `run` transition. Called by the scheduler before the
    /// execution unit is actually dispatched, so the history log reflects
    /// the transition before the new status is observable.
    pub fn mark_run(&mut self, at: DateTime<Local>) {
        self.status = TaskStatus::Run;
        self.last_run = Some(at);
    }

    pub fn mark_success(&mut self, at: DateTime<Local>) {
        self.status = TaskStatus::Success;
        self.last_success = Some(at);
    }

    pub fn mark_fail(&mut self, at: DateTime<Local>) {
        self.status = TaskStatus::Fail;
        self.last_fail = Some(at);
    }

    pub fn mark_terminate(&mut self, at: DateTime<Local>) {
        self.status = TaskStatus::Terminate;
        self.last_terminate = Some(at);
    }

    pub fn mark_inactive(&mut self) {
        self.status = TaskStatus::Inactive;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_task_is_created_and_not_alive() {
        let task = Task::new_sync("a", Arc::new(|_: &HashMap<String, Value>, _: ShouldCancel| Ok(Value::Bool(true))));
        assert_eq!(task.status(), TaskStatus::Created);
        assert!(!task.is_alive());
    }

    #[test]
    fn mark_run_then_success_updates_status_and_timestamps() {
        let mut task = Task::new_sync("a", Arc::new(|_: &HashMap<String, Value>, _: ShouldCancel| Ok(Value::Bool(true))));
        let t1 = Local::now();
        task.mark_run(t1);
        assert!(task.is_alive());
        assert_eq!(task.last_run(), Some(t1));

        let t2 = Local::now();
        task.mark_success(t2);
        assert_eq!(task.status(), TaskStatus::Success);
        assert!(!task.is_alive());
        assert_eq!(task.last_success(), Some(t2));
    }

    #[test]
    fn command_task_defaults_to_process_execution() {
        let task = Task::new_command("backup", "tar czf out.tgz /data");
        assert_eq!(task.execution, ExecutionMode::Process);
    }
}
