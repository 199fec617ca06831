//! In-memory event log, the default `EventLog` implementation.
//!
//! A simple, lock-guarded in-memory store behind the domain-owned trait.
//! Appends are serialized by a single mutex, so concurrent writers from
//! multiple executors never interleave a single event's fields.

use std::sync::Mutex;

use chrono::{DateTime, Local};

use crate::domain::entities::event::{Action, Event};
use crate::domain::repositories::EventLog;

pub struct InMemoryEventLog {
    events: Mutex<Vec<Event>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self { events: Mutex::new(Vec::new()) }
    }
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog for InMemoryEventLog {
    fn log(&self, event: Event) {
        self.events.lock().expect("event log mutex poisoned").push(event);
    }

    fn get(&self, task_name: Option<&str>, action: Option<Action>, after: Option<DateTime<Local>>, before: Option<DateTime<Local>>) -> Vec<Event> {
        let events = self.events.lock().expect("event log mutex poisoned");
        let mut matching: Vec<Event> = events
            .iter()
            .filter(|e| task_name.is_none_or(|n| e.task_name.as_deref() == Some(n)))
            .filter(|e| action.is_none_or(|a| e.action == a))
            .filter(|e| after.is_none_or(|t| e.timestamp >= t))
            .filter(|e| before.is_none_or(|t| e.timestamp < t))
            .cloned()
            .collect();
        matching.sort_by_key(|e| e.timestamp);
        matching
    }

    fn latest(&self, task_name: Option<&str>, action: Option<Action>) -> Option<Event> {
        self.get(task_name, action, None, None).into_iter().max_by_key(|e| e.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_filters_by_task_and_action_and_returns_in_order() {
        let log = InMemoryEventLog::new();
        let t0 = Local::now();
        log.log(Event::task("A", Action::Run, t0));
        log.log(Event::task("A", Action::Success, t0 + chrono::Duration::seconds(1)));
        log.log(Event::task("B", Action::Run, t0));

        let a_events = log.get(Some("A"), None, None, None);
        assert_eq!(a_events.len(), 2);
        assert_eq!(a_events[0].action, Action::Run);
        assert_eq!(a_events[1].action, Action::Success);

        let successes = log.get(None, Some(Action::Success), None, None);
        assert_eq!(successes.len(), 1);
    }

    #[test]
    fn latest_returns_most_recent_matching_event() {
        let log = InMemoryEventLog::new();
        let t0 = Local::now();
        log.log(Event::task("A", Action::Run, t0));
        log.log(Event::task("A", Action::Run, t0 + chrono::Duration::seconds(5)));
        let latest = log.latest(Some("A"), Some(Action::Run)).unwrap();
        assert_eq!(latest.timestamp, t0 + chrono::Duration::seconds(5));
    }

    #[test]
    fn scheduler_level_events_have_no_task_name() {
        let log = InMemoryEventLog::new();
        log.log(Event::scheduler(Action::SchedulerStart, Local::now()));
        let events = log.get(None, Some(Action::SchedulerStart), None, None);
        assert_eq!(events.len(), 1);
        assert!(events[0].task_name.is_none());
    }
}
