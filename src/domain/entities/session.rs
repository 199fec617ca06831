//! Session: the process-wide registry by which components locate each
//! other.
//!
//! There is no class-level static back-reference; [`set_default`]/
//! [`default_session`] install and fetch a thread-local `Arc<Session>`
//! explicitly, and every type that would otherwise carry a `session`
//! field instead borrows a `&Session` at the point of use.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;

use super::config::{Config, TaskPreExist};
use super::statement::Value;
use super::task::Task;
use crate::domain::errors::SchedulerError;
use crate::domain::repositories::EventLog;

thread_local! {
    static DEFAULT_SESSION: RefCell<Option<Arc<Session>>> = const { RefCell::new(None) };
}

/// Installs `session` as the default for the current thread.
pub fn set_default(session: Arc<Session>) {
    DEFAULT_SESSION.with(|cell| *cell.borrow_mut() = Some(session));
}

/// The session installed by [`set_default`] on this thread, if any.
pub fn default_session() -> Option<Arc<Session>> {
    DEFAULT_SESSION.with(|cell| cell.borrow().clone())
}

/// Process-wide context holding parameters, tasks, return values,
/// configuration, and the history store.
pub struct Session {
    parameters: RwLock<HashMap<String, Value>>,
    returns: RwLock<HashMap<String, Value>>,
    tasks: RwLock<IndexMap<String, Task>>,
    config: Config,
    history: Arc<dyn EventLog>,
    env: Option<String>,
}

impl Session {
    pub fn new(config: Config, history: Arc<dyn EventLog>) -> Self {
        Self {
            parameters: RwLock::new(HashMap::new()),
            returns: RwLock::new(HashMap::new()),
            tasks: RwLock::new(IndexMap::new()),
            config,
            history,
            env: None,
        }
    }

    pub fn with_env(mut self, env: impl Into<String>) -> Self {
        self.env = Some(env.into());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn history(&self) -> &dyn EventLog {
        self.history.as_ref()
    }

    pub fn env(&self) -> Option<&str> {
        self.env.as_deref()
    }

    pub fn set_parameter(&self, key: impl Into<String>, value: Value) {
        self.parameters.write().expect("parameters lock poisoned").insert(key.into(), value);
    }

    pub fn parameter(&self, key: &str) -> Option<Value> {
        self.parameters.read().expect("parameters lock poisoned").get(key).cloned()
    }

    pub fn parameters_snapshot(&self) -> HashMap<String, Value> {
        self.parameters.read().expect("parameters lock poisoned").clone()
    }

    pub fn set_return(&self, task_name: impl Into<String>, value: Value) {
        self.returns.write().expect("returns lock poisoned").insert(task_name.into(), value);
    }

    pub fn get_return(&self, task_name: &str) -> Option<Value> {
        self.returns.read().expect("returns lock poisoned").get(task_name).cloned()
    }

    /// Adds a task, applying `config.task_pre_exist` on a name collision.
    pub fn add_task(&self, task: Task) -> Result<(), SchedulerError> {
        let mut tasks = self.tasks.write().expect("tasks lock poisoned");
        if tasks.contains_key(task.name()) {
            match self.config.task_pre_exist {
                TaskPreExist::Raise => {
                    return Err(SchedulerError::Config(format!("task {:?} already exists", task.name())));
                }
                TaskPreExist::Ignore => return Ok(()),
                TaskPreExist::Replace => {}
            }
        }
        tasks.insert(task.name().to_string(), task);
        Ok(())
    }

    /// Looks up a task by name. Returns `Err` if missing.
    pub fn with_task<R>(&self, name: &str, f: impl FnOnce(&Task) -> R) -> Result<R, SchedulerError> {
        let tasks = self.tasks.read().expect("tasks lock poisoned");
        tasks.get(name).map(f).ok_or_else(|| SchedulerError::Config(format!("no such task: {name:?}")))
    }

    pub fn with_task_mut<R>(&self, name: &str, f: impl FnOnce(&mut Task) -> R) -> Result<R, SchedulerError> {
        let mut tasks = self.tasks.write().expect("tasks lock poisoned");
        tasks.get_mut(name).map(f).ok_or_else(|| SchedulerError::Config(format!("no such task: {name:?}")))
    }

    /// Task names in insertion order.
    pub fn task_names(&self) -> Vec<String> {
        self.tasks.read().expect("tasks lock poisoned").keys().cloned().collect()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.read().expect("tasks lock poisoned").len()
    }
}
