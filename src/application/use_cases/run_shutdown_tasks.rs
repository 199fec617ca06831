//! Runs every `on_shutdown` task to completion, in declared order, once
//! the scheduler's cycle loop has exited. Skipped entirely when
//! `config.instant_shutdown` is set.

use chrono::Local;
use tokio::runtime::Handle as TokioHandle;
use tracing::info;

use crate::application::scheduler::dispatch::{launch, run_to_completion, Launched};
use crate::application::use_cases::run_cycle::record_terminal;
use crate::domain::entities::event::{Action, Event};
use crate::domain::entities::session::Session;
use crate::domain::errors::TaskError;

pub struct RunShutdownTasks;

impl RunShutdownTasks {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, session: &Session, runtime: &TokioHandle) {
        if session.config().instant_shutdown {
            info!("instant_shutdown set, skipping on_shutdown tasks");
            return;
        }

        for name in session.task_names() {
            let should_run = session.with_task(&name, |t| t.on_shutdown && !t.disabled).unwrap_or(false);
            if !should_run {
                continue;
            }

            let run_at = Local::now();
            session.with_task_mut(&name, |t| t.mark_run(run_at)).ok();
            session.history().log(Event::task(name.as_str(), Action::Run, run_at));
            info!(task = %name, "running shutdown task");

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

impl Default for RunShutdownTasks {
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
    fn shutdown_task_runs_when_not_instant() {
        let session = Session::new(Config::default(), Arc::new(InMemoryEventLog::new()));
        let task = Task::new_sync("flush", Arc::new(|_: &HashMap<String, crate::domain::entities::statement::Value>, _| Ok(crate::domain::entities::statement::Value::Bool(true))))
            .with_execution(ExecutionMode::Main)
            .on_shutdown(true);
        session.add_task(task).unwrap();

        let rt = runtime();
        RunShutdownTasks::new().execute(&session, rt.handle());

        assert_eq!(session.history().get(Some("flush"), Some(Action::Success), None, None).len(), 1);
    }

    #[test]
    fn instant_shutdown_skips_all_shutdown_tasks() {
        let mut config = Config::default();
        config.instant_shutdown = true;
        let session = Session::new(config, Arc::new(InMemoryEventLog::new()));
        let task = Task::new_sync("flush", Arc::new(|_: &HashMap<String, crate::domain::entities::statement::Value>, _| Ok(crate::domain::entities::statement::Value::Bool(true))))
            .with_execution(ExecutionMode::Main)
            .on_shutdown(true);
        session.add_task(task).unwrap();

        let rt = runtime();
        RunShutdownTasks::new().execute(&session, rt.handle());

        assert!(session.history().get(Some("flush"), None, None, None).is_empty());
    }

    #[test]
    fn shutdown_task_terminated_logs_terminate_not_fail() {
        let session = Session::new(Config::default(), Arc::new(InMemoryEventLog::new()));
        let task = Task::new_sync("aborted", Arc::new(|_: &HashMap<String, crate::domain::entities::statement::Value>, _| Err(TaskError::Terminated)))
            .with_execution(ExecutionMode::Main)
            .on_shutdown(true);
        session.add_task(task).unwrap();

        let rt = runtime();
        RunShutdownTasks::new().execute(&session, rt.handle());

        assert_eq!(session.history().get(Some("aborted"), Some(Action::Terminate), None, None).len(), 1);
        assert!(session.history().get(Some("aborted"), Some(Action::Fail), None, None).is_empty());
    }
}
