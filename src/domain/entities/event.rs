//! Event log data model; the store itself is
//! [`crate::domain::repositories::event_log::EventLog`].

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A lifecycle action recorded against a task, or, for the three
/// scheduler-level variants, against the scheduler itself (`task_name =
/// None` on the owning [`Event`]). Scheduler-level actions let
/// `scheduler_start`/`scheduler_cycle`/`scheduler_shutdown` appear in the
/// same queryable log as task events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Run,
    Success,
    Fail,
    Terminate,
    Inaction,
    Crash,
    SchedulerStart,
    SchedulerCycle,
    SchedulerShutdown,
}

impl Action {
    pub fn is_terminal(self) -> bool {
        matches!(self, Action::Success | Action::Fail | Action::Terminate | Action::Crash)
    }
}

/// Immutable record `(task_name, action, timestamp, run_id, detail)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub task_name: Option<String>,
    pub action: Action,
    pub timestamp: DateTime<Local>,
    pub run_id: Option<Uuid>,
    pub detail: Option<String>,
}

impl Event {
    pub fn task(task_name: impl Into<String>, action: Action, timestamp: DateTime<Local>) -> Self {
        Self { task_name: Some(task_name.into()), action, timestamp, run_id: None, detail: None }
    }

    pub fn scheduler(action: Action, timestamp: DateTime<Local>) -> Self {
        Self { task_name: None, action, timestamp, run_id: None, detail: None }
    }

    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = Some(run_id);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
