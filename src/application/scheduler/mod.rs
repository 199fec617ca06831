//! The scheduler loop: startup tasks, the cycle loop, graceful shutdown,
//! and restart handling.

pub mod dispatch;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Local;
use tracing::info;

use crate::application::use_cases::run_cycle::{record_terminal, CycleOutcome, RunCycle};
use crate::application::use_cases::run_startup_tasks::RunStartupTasks;
use crate::application::use_cases::run_shutdown_tasks::RunShutdownTasks;
use crate::domain::entities::config::RestartMode;
use crate::domain::entities::event::{Action, Event};
use crate::domain::entities::session::{set_default, Session};
use crate::domain::errors::SchedulerError;
use crate::infrastructure::execution::handle::PollResult;
use dispatch::RunningHandle;

/// Owns the tokio runtime backing `async`-mode tasks and drives the
/// session through startup, the cycle loop, and shutdown.
pub struct Scheduler {
    session: Arc<Session>,
    runtime: tokio::runtime::Runtime,
    interrupted: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(session: Arc<Session>) -> Result<Self, SchedulerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .map_err(|e| SchedulerError::Fatal(e.to_string()))?;
        Ok(Self { session, runtime, interrupted: Arc::new(AtomicBool::new(false)) })
    }

    /// Runs until `config.restarting` says to stop. `recall`/`relaunch`/
    /// `fresh` all loop back into a fresh [`run_once`](Self::run_once) in
    /// this process; true process re-exec is a deployment concern this
    /// crate leaves to its (out-of-scope) entrypoint.
    pub fn start(&mut self) -> Result<(), SchedulerError> {
        loop {
            match self.run_once()? {
                RestartMode::Finish => return Ok(()),
                RestartMode::Relaunch | RestartMode::Recall | RestartMode::Fresh => {
                    info!("cycle loop exited, restarting under the configured restart policy");
                }
            }
        }
    }

    fn run_once(&mut self) -> Result<RestartMode, SchedulerError> {
        set_default(self.session.clone());
        self.interrupted.store(false, Ordering::Relaxed);
        self.install_interrupt_handler();

        let start_at = Local::now();
        self.session.history().log(Event::scheduler(Action::SchedulerStart, start_at));
        info!("scheduler starting");

        RunStartupTasks::new().execute(&self.session, self.runtime.handle());

        let mut running: HashMap<String, RunningHandle> = HashMap::new();
        loop {
            if self.interrupted.load(Ordering::Relaxed) {
                break;
            }
            let now = Local::now();
            match RunCycle::new().execute(&self.session, &mut running, self.runtime.handle(), now)? {
                CycleOutcome::ShutdownRequested => break,
                CycleOutcome::Continue => {}
            }
            std::thread::sleep(self.session.config().cycle_sleep);
        }

        self.drain_running(&mut running);

        let interrupted = self.interrupted.load(Ordering::Relaxed);
        if !interrupted || self.session.config().force_status_from_logs {
            RunShutdownTasks::new().execute(&self.session, self.runtime.handle());
        }

        self.session.history().log(Event::scheduler(Action::SchedulerShutdown, Local::now()));

        if interrupted {
            return Err(SchedulerError::Interrupt);
        }

        Ok(self.session.config().restarting)
    }

    /// Requests termination of every still-running task and waits up to
    /// `shut_cycle_timeout`; anything left after that is force-detached
    /// (the thread-cancellation gap applies here for `thread` tasks — see
    /// `ExecutionHandle::force_detach`).
    fn drain_running(&self, running: &mut HashMap<String, RunningHandle>) {
        for handle in running.values_mut() {
            handle.terminate();
        }

        let deadline = std::time::Instant::now() + self.session.config().shut_cycle_timeout;
        while std::time::Instant::now() < deadline && running.values_mut().any(|h| matches!(h.poll(), PollResult::Running)) {
            std::thread::sleep(std::time::Duration::from_millis(10));
        }

        for (name, handle) in running.iter_mut() {
            if matches!(handle.poll(), PollResult::Running) {
                handle.force_detach();
            }
            if let PollResult::Done(result) = handle.poll() {
                record_terminal(&self.session, name, result, Local::now());
            }
        }
        running.clear();
    }

    fn install_interrupt_handler(&self) {
        let flag = self.interrupted.clone();
        self.runtime.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                flag.store(true, Ordering::Relaxed);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::condition::Condition;
    use crate::domain::entities::config::Config;
    use crate::domain::entities::statement::Value;
    use crate::domain::entities::task::{ExecutionMode, Task};
    use crate::infrastructure::history::InMemoryEventLog;
    use std::collections::HashMap as StdHashMap;

    #[test]
    fn scheduler_runs_one_cycle_then_exits_on_shut_cond() {
        let mut config = Config::default();
        config.shut_cond = Condition::always_true();
        config.restarting = RestartMode::Finish;
        let session = Arc::new(Session::new(config, Arc::new(InMemoryEventLog::new())));

        let mut scheduler = Scheduler::new(session.clone()).unwrap();
        scheduler.start().unwrap();

        assert_eq!(session.history().get(None, Some(Action::SchedulerStart), None, None).len(), 1);
        assert_eq!(session.history().get(None, Some(Action::SchedulerCycle), None, None).len(), 1);
        assert_eq!(session.history().get(None, Some(Action::SchedulerShutdown), None, None).len(), 1);

        let all = session.history().get(None, None, None, None);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].action, Action::SchedulerStart);
        assert_eq!(all[1].action, Action::SchedulerCycle);
        assert_eq!(all[2].action, Action::SchedulerShutdown);
    }

    #[test]
    fn startup_task_runs_before_the_cycle_loop_exits() {
        let mut config = Config::default();
        config.shut_cond = Condition::always_true();
        config.restarting = RestartMode::Finish;
        let session = Arc::new(Session::new(config, Arc::new(InMemoryEventLog::new())));
        let task = Task::new_sync("prime-cache", Arc::new(|_: &StdHashMap<String, Value>, _| Ok(Value::Bool(true))))
            .with_execution(ExecutionMode::Main)
            .on_startup(true);
        session.add_task(task).unwrap();

        let mut scheduler = Scheduler::new(session.clone()).unwrap();
        scheduler.start().unwrap();

        assert_eq!(session.history().get(Some("prime-cache"), Some(Action::Success), None, None).len(), 1);
    }
}
