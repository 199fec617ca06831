//! CLI command implementations.
//!
//! `demo` builds a small session entirely in code (parsing a dict/YAML
//! front end into tasks is out of scope) and runs it to completion,
//! demonstrating the condition builders, dependency chaining, and the
//! scheduler's startup/cycle/shutdown phases end to end.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::application::scheduler::Scheduler;
use crate::domain::entities::builtins::{depend_success, scheduler_cycles, task_succeeded};
use crate::domain::entities::condition::Condition;
use crate::domain::entities::config::{Config, RestartMode};
use crate::domain::entities::session::Session;
use crate::domain::entities::statement::Value;
use crate::domain::entities::task::{ExecutionMode, Task};
use crate::infrastructure::history::InMemoryEventLog;
use crate::infrastructure::output::JsonHistoryExporter;

pub struct DemoCommand;

impl DemoCommand {
    /// Builds and runs the bundled demo session, optionally dumping its
    /// event log to `history_out` on exit.
    pub fn execute(history_out: Option<&Path>) -> Result<()> {
        let session = Arc::new(build_demo_session());

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::with_template("{spinner} {msg}").expect("static template is valid"));
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        spinner.set_message("running scheduler session...");

        info!("starting demo scheduler session");
        let mut scheduler = Scheduler::new(session.clone()).context("failed to build the scheduler's async runtime")?;
        let outcome = scheduler.start().context("scheduler exited with an error");
        spinner.finish_and_clear();
        outcome?;
        info!("demo scheduler session finished");

        if let Some(path) = history_out {
            JsonHistoryExporter::new().generate(session.history(), path).context("failed to write history JSON")?;
            info!(path = %path.display(), "wrote event history");
        }

        Self::print_summary(&session);
        Ok(())
    }

    fn print_summary(session: &Session) {
        println!("\n{}", "=".repeat(60));
        println!("TASKLOOM DEMO SESSION SUMMARY");
        println!("{}", "=".repeat(60));
        for name in session.task_names() {
            let status = session.with_task(&name, |t| t.status()).ok();
            println!("  {name:<16} -> {status:?}");
        }
        println!("{}", "=".repeat(60));
    }
}

fn build_demo_session() -> Session {
    let mut config = Config::default();
    config.cycle_sleep = std::time::Duration::from_millis(20);
    config.restarting = RestartMode::Finish;
    // Stop after three cycles; a real deployment supplies its own shut_cond.
    config.shut_cond = Condition::Statement(scheduler_cycles(None).ge(3.0));

    let session = Session::new(config, Arc::new(InMemoryEventLog::new())).with_env("demo");

    let ingest = Task::new_sync("ingest", Arc::new(|_: &HashMap<String, Value>, _| {
        info!("ingest: fetching upstream data");
        Ok(Value::Int(128))
    }))
    .with_execution(ExecutionMode::Main)
    .with_start_cond(Condition::Statement(task_succeeded("ingest", None).eq(0.0)));

    let transform = Task::new_sync("transform", Arc::new(|_: &HashMap<String, Value>, should_cancel| {
        info!("transform: normalizing records");
        for _ in 0..5 {
            if should_cancel() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        Ok(Value::Bool(true))
    }))
    .with_execution(ExecutionMode::Thread)
    .with_start_cond(depend_success("transform", "ingest") & Condition::Statement(task_succeeded("transform", None).eq(0.0)));

    let report = Task::new_sync("report", Arc::new(|_: &HashMap<String, Value>, _| {
        info!("report: writing final summary");
        Ok(Value::Bool(true))
    }))
    .with_execution(ExecutionMode::Main)
    .on_shutdown(true);

    session.add_task(ingest).expect("demo task names are unique");
    session.add_task(transform).expect("demo task names are unique");
    session.add_task(report).expect("demo task names are unique");
    session
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_session_runs_ingest_then_transform_then_shuts_down() {
        let session = Arc::new(build_demo_session());
        let mut scheduler = Scheduler::new(session.clone()).unwrap();
        scheduler.start().unwrap();

        assert!(!session.history().get(Some("ingest"), Some(crate::domain::entities::event::Action::Success), None, None).is_empty());
        assert!(!session.history().get(Some("transform"), Some(crate::domain::entities::event::Action::Success), None, None).is_empty());
        assert!(!session.history().get(Some("report"), Some(crate::domain::entities::event::Action::Success), None, None).is_empty());
    }
}
