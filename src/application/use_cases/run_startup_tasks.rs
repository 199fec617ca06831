//! Runs every `on_startup` task to completion, in declared order, before
//! the scheduler enters its cycle loop.

use chrono::Local;
use tokio::runtime::Handle as TokioHandle;
use tracing::info;

use crate::application::scheduler::dispatch::{launch, run_to_completion, Launched};
use crate::application::use_cases::run_cycle::record_terminal;
use crate::domain::entities::event::{Action, Event};
use crate::domain::entities::session::Session;
use crate::domain::errors::TaskError;

pub struct RunStartupTasks;

impl RunStartupTasks {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, session: &Session, runtime: &TokioHandle) {
        for name in session.task_names() {
            let should_run = session.with_task(&name, |t| t.on_startup && !t.disabled).unwrap_or(false);
            if !should_run {
                continue;
            }

            let run_at = Local::now();
            session.with_task_mut(&name, |t| t.mark_run(run_at)).ok();
            session.history().log(Event::task(name.as_str(), Action::Run, run_at));
            info!(task = %name, "running startup task");

            let launched = session.with_task(&name, |t| launch(t, runtime));
            let result = match launched {
                Ok(Ok(Launched::Completed(result))) => result,
                Ok(Ok(Launched::Running(handle))) => run_to_completion(handle),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(TaskError::SpawnFailed(e.to_string())),
            };

            record_terminal(session, &name, result, Local::now());
        }
    }
}

impl Default for RunStartupTasks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::config::Config;
    use crate::domain::entities::task::{ExecutionMode, Task};
    use crate::infrastructure::history::InMemoryEventLog;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread().worker_threads(1).enable_time().build().unwrap()
    }

    #[test]
    fn startup_task_runs_and_logs_success() {
        let session = Session::new(Config::default(), Arc::new(InMemoryEventLog::new()));
        let task = Task::new_sync("warmup", Arc::new(|_: &HashMap<String, crate::domain::entities::statement::Value>, _| Ok(crate::domain::entities::statement::Value::Bool(true))))
            .with_execution(ExecutionMode::Main)
            .on_startup(true);
        session.add_task(task).unwrap();

        let rt = runtime();
        RunStartupTasks::new().execute(&session, rt.handle());

        assert_eq!(session.history().get(Some("warmup"), Some(Action::Success), None, None).len(), 1);
        assert!(session.with_task("warmup", |t| t.status()).unwrap() == crate::domain::entities::task::TaskStatus::Success);
    }

    #[test]
    fn non_startup_tasks_are_skipped() {
        let session = Session::new(Config::default(), Arc::new(InMemoryEventLog::new()));
        let task = Task::new_sync("later", Arc::new(|_: &HashMap<String, crate::domain::entities::statement::Value>, _| Ok(crate::domain::entities::statement::Value::Bool(true))))
            .with_execution(ExecutionMode::Main);
        session.add_task(task).unwrap();

        let rt = runtime();
        RunStartupTasks::new().execute(&session, rt.handle());

        assert!(session.history().get(Some("later"), None, None, None).is_empty());
    }

    #[test]
    fn startup_task_terminated_logs_terminate_not_fail() {
        let session = Session::new(Config::default(), Arc::new(InMemoryEventLog::new()));
        let task = Task::new_sync("aborted", Arc::new(|_: &HashMap<String, crate::domain::entities::statement::Value>, _| Err(TaskError::Terminated)))
            .with_execution(ExecutionMode::Main)
            .on_startup(true);
        session.add_task(task).unwrap();

        let rt = runtime();
        RunStartupTasks::new().execute(&session, rt.handle());

        assert_eq!(session.history().get(Some("aborted"), Some(Action::Terminate), None, None).len(), 1);
        assert!(session.history().get(Some("aborted"), Some(Action::Fail), None, None).is_empty());
    }
}
