//! One iteration of the scheduler's cycle loop: dispatch newly-eligible
//! tasks, supervise running ones, emit the `scheduler_cycle` event.

use std::collections::HashMap;

use chrono::{DateTime, Local};
use tokio::runtime::Handle as TokioHandle;
use tracing::{error, info};

use crate::application::scheduler::dispatch::{launch, Launched, RunningHandle};
use crate::domain::entities::event::{Action, Event};
use crate::domain::entities::session::Session;
use crate::domain::entities::statement::Value;
use crate::domain::errors::{SchedulerError, TaskError};
use crate::infrastructure::execution::handle::PollResult;

#[derive(Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    Continue,
    ShutdownRequested,
}

pub struct RunCycle;

impl RunCycle {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(
        &self,
        session: &Session,
        running: &mut HashMap<String, RunningHandle>,
        runtime: &TokioHandle,
        now: DateTime<Local>,
    ) -> Result<CycleOutcome, SchedulerError> {
        session.history().log(Event::scheduler(Action::SchedulerCycle, now));

        if session.config().shut_cond.evaluate(session, now)? {
            return Ok(CycleOutcome::ShutdownRequested);
        }

        self.dispatch_eligible(session, running, runtime, now)?;
        self.supervise_running(session, running, now)?;

        Ok(CycleOutcome::Continue)
    }

    fn dispatch_eligible(
        &self,
        session: &Session,
        running: &mut HashMap<String, RunningHandle>,
        runtime: &TokioHandle,
        now: DateTime<Local>,
    ) -> Result<(), SchedulerError> {
        for name in session.task_names() {
            if running.contains_key(&name) {
                continue;
            }

            let (disabled, force_run, start_cond, run_cond) =
                session.with_task(&name, |t| (t.disabled, t.force_run, t.start_cond.clone(), t.run_cond.clone()))?;
            if disabled {
                continue;
            }
            if !run_cond.evaluate_or_false(session, now) {
                continue;
            }

            let should_launch = if force_run {
                true
            } else {
                start_cond.evaluate_or_false(session, now)
            };
            if !should_launch {
                continue;
            }
            if force_run {
                session.with_task_mut(&name, |t| t.force_run = false).ok();
            }

            session.with_task_mut(&name, |t| t.mark_run(now)).ok();
            session.history().log(Event::task(name.as_str(), Action::Run, now));
            info!(task = %name, "dispatching task");

            match session.with_task(&name, |t| launch(t, runtime))? {
                Ok(Launched::Completed(result)) => record_terminal(session, &name, result, now),
                Ok(Launched::Running(handle)) => {
                    running.insert(name.clone(), handle);
                }
                Err(e) => record_terminal(session, &name, Err(e), now),
            }
        }
        Ok(())
    }

    fn supervise_running(&self, session: &Session, running: &mut HashMap<String, RunningHandle>, now: DateTime<Local>) -> Result<(), SchedulerError> {
        let mut finished = Vec::new();

        for (name, handle) in running.iter_mut() {
            let (end_cond, timeout, last_run) = session.with_task(name, |t| (t.end_cond.clone(), t.timeout, t.last_run()))?;

            if end_cond.evaluate_or_false(session, now) {
                handle.terminate();
            } else if let Some(last_run) = last_run {
                let effective_timeout = timeout.unwrap_or(session.config().timeout);
                let elapsed = now.signed_duration_since(last_run).to_std().unwrap_or_default();
                if elapsed >= effective_timeout {
                    handle.terminate();
                }
            }

            if let PollResult::Done(result) = handle.poll() {
                record_terminal(session, name, result, now);
                finished.push(name.clone());
            }
        }

        for name in finished {
            running.remove(&name);
        }
        Ok(())
    }
}

impl Default for RunCycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Marks the task's terminal lifecycle state and logs the matching event.
/// Shared between startup/shutdown/cycle dispatch paths.
pub fn record_terminal(session: &Session, name: &str, result: Result<Value, TaskError>, at: DateTime<Local>) {
    match result {
        Ok(value) => {
            session.with_task_mut(name, |t| t.mark_success(at)).ok();
            session.set_return(name, value);
            session.history().log(Event::task(name, Action::Success, at));
        }
        Err(TaskError::Terminated) => {
            session.with_task_mut(name, |t| t.mark_terminate(at)).ok();
            session.history().log(Event::task(name, Action::Terminate, at));
        }
        Err(TaskError::Crash(detail)) => {
            session.with_task_mut(name, |t| t.mark_fail(at)).ok();
            session.history().log(Event::task(name, Action::Crash, at).with_detail(detail.clone()));
            session.history().log(Event::task(name, Action::Fail, at).with_detail(detail.clone()));
            error!(task = %name, error = %detail, "task crashed");
        }
        Err(e) => {
            session.with_task_mut(name, |t| t.mark_fail(at)).ok();
            session.history().log(Event::task(name, Action::Fail, at).with_detail(e.to_string()));
            error!(task = %name, error = %e, "task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::config::Config;
    use crate::domain::entities::condition::Condition;
    use crate::domain::entities::task::{ExecutionMode, Task};
    use crate::infrastructure::history::InMemoryEventLog;
    use std::sync::Arc;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread().worker_threads(1).enable_time().build().unwrap()
    }

    #[test]
    fn shut_cond_true_stops_the_cycle_before_dispatch() {
        let mut config = Config::default();
        config.shut_cond = Condition::always_true();
        let session = Session::new(config, Arc::new(InMemoryEventLog::new()));
        let rt = runtime();
        let mut running = HashMap::new();
        let outcome = RunCycle::new().execute(&session, &mut running, rt.handle(), Local::now()).unwrap();
        assert_eq!(outcome, CycleOutcome::ShutdownRequested);
    }

    #[test]
    fn eligible_task_is_dispatched_and_completes_within_a_cycle() {
        let session = Session::new(Config::default(), Arc::new(InMemoryEventLog::new()));
        let task = Task::new_sync("quick", Arc::new(|_: &HashMap<String, Value>, _| Ok(Value::Bool(true))))
            .with_execution(ExecutionMode::Main)
            .with_start_cond(Condition::always_true());
        session.add_task(task).unwrap();

        let rt = runtime();
        let mut running = HashMap::new();
        let now = Local::now();
        RunCycle::new().execute(&session, &mut running, rt.handle(), now).unwrap();

        assert!(running.is_empty());
        assert_eq!(session.history().get(Some("quick"), Some(Action::Success), None, None).len(), 1);
    }

    #[test]
    fn run_cond_false_blocks_dispatch_even_with_force_run() {
        let session = Session::new(Config::default(), Arc::new(InMemoryEventLog::new()));
        let task = Task::new_sync("blackout", Arc::new(|_: &HashMap<String, Value>, _| Ok(Value::Bool(true))))
            .with_execution(ExecutionMode::Main)
            .with_start_cond(Condition::always_true())
            .with_run_cond(Condition::always_false())
            .force_run(true);
        session.add_task(task).unwrap();

        let rt = runtime();
        let mut running = HashMap::new();
        RunCycle::new().execute(&session, &mut running, rt.handle(), Local::now()).unwrap();

        assert!(session.history().get(Some("blackout"), None, None, None).is_empty());
        assert!(session.with_task("blackout", |t| t.force_run).unwrap(), "run_cond must not consume force_run while blocked");
    }

    #[test]
    fn disabled_task_is_never_dispatched() {
        let session = Session::new(Config::default(), Arc::new(InMemoryEventLog::new()));
        let task = Task::new_sync("off", Arc::new(|_: &HashMap<String, Value>, _| Ok(Value::Bool(true))))
            .with_execution(ExecutionMode::Main)
            .with_start_cond(Condition::always_true())
            .disabled(true);
        session.add_task(task).unwrap();

        let rt = runtime();
        let mut running = HashMap::new();
        RunCycle::new().execute(&session, &mut running, rt.handle(), Local::now()).unwrap();

        assert!(session.history().get(Some("off"), None, None, None).is_empty());
    }

    #[test]
    fn running_thread_task_is_supervised_across_cycles_until_end_cond() {
        let session = Session::new(Config::default(), Arc::new(InMemoryEventLog::new()));
        let task = Task::new_sync("worker", Arc::new(|_: &HashMap<String, Value>, should_cancel| {
            while !should_cancel() {
                std::thread::yield_now();
            }
            Ok(Value::Bool(false))
        }))
            .with_execution(ExecutionMode::Thread)
            .with_start_cond(Condition::always_true())
            .with_end_cond(Condition::always_true());
        session.add_task(task).unwrap();

        let rt = runtime();
        let mut running = HashMap::new();
        let t0 = Local::now();
        RunCycle::new().execute(&session, &mut running, rt.handle(), t0).unwrap();
        assert_eq!(running.len(), 1);

        let t1 = t0 + chrono::Duration::milliseconds(50);
        loop {
            RunCycle::new().execute(&session, &mut running, rt.handle(), t1).unwrap();
            if running.is_empty() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(session.history().get(Some("worker"), Some(Action::Terminate), None, None).len(), 1);
    }

    #[test]
    fn crashed_task_logs_both_crash_and_fail_events() {
        let session = Session::new(Config::default(), Arc::new(InMemoryEventLog::new()));
        let now = Local::now();
        record_terminal(&session, "unstable", Err(TaskError::Crash("panicked".into())), now);

        assert_eq!(session.history().get(Some("unstable"), Some(Action::Crash), None, None).len(), 1);
        assert_eq!(session.history().get(Some("unstable"), Some(Action::Fail), None, None).len(), 1);
    }
}
