//! Event log interface.
//!
//! A narrow trait owned by the domain layer, implemented by an
//! infrastructure adapter.

use chrono::{DateTime, Local};

use crate::domain::entities::event::{Action, Event};

/// Append-only, queryable history of task and scheduler lifecycle events.
///
/// Implementations must guarantee total order of appends from a single
/// logical writer; concurrent appends from multiple executors are
/// serialized.
#[cfg_attr(test, mockall::automock)]
pub trait EventLog: Send + Sync {
    fn log(&self, event: Event);

    /// Events matching the given filters, ordered by timestamp ascending.
    fn get(&self, task_name: Option<&str>, action: Option<Action>, after: Option<DateTime<Local>>, before: Option<DateTime<Local>>) -> Vec<Event>;

    /// The most recent matching event, if any.
    fn latest(&self, task_name: Option<&str>, action: Option<Action>) -> Option<Event>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::builtins::task_succeeded;
    use crate::domain::entities::config::Config;
    use crate::domain::entities::condition::Condition;
    use crate::domain::entities::session::Session;
    use std::sync::Arc;

    #[test]
    fn task_succeeded_statement_queries_the_event_log_for_success_events() {
        let mut mock = MockEventLog::new();
        mock.expect_get()
            .times(1)
            .returning(|task_name, action, _after, _before| {
                assert_eq!(task_name, Some("ingest"));
                assert_eq!(action, Some(Action::Success));
                vec![Event::task("ingest", Action::Success, chrono::Local::now())]
            });

        let session = Session::new(Config::default(), Arc::new(mock));
        let stmt = task_succeeded("ingest", None);
        let cond = Condition::Statement(stmt);
        assert!(cond.evaluate_or_false(&session, chrono::Local::now()));
    }
}
