//! Built-in statement catalog.
//!
//! Each function below returns a ready-to-use [`Condition::Statement`]
//! built from an explicit [`StatementTemplate`], rather than synthesizing
//! one dynamically from an arbitrary closure.

use std::collections::HashMap;

use chrono::{DateTime, Local};

use super::condition::Condition;
use super::event::Action;
use super::session::Session;
use super::statement::{Observation, Statement, StatementParams, StatementTemplate, Value, KEY_DEPEND_TASK, KEY_END, KEY_START, KEY_TASK};
use super::time_period::TimePeriod;
use crate::domain::errors::ObserveError;

fn text_kwarg(kwargs: &StatementParams, key: &str) -> Result<String, ObserveError> {
    match kwargs.get(key) {
        Some(Value::Text(s)) => Ok(s.clone()),
        _ => Err(ObserveError::Failed(format!("missing or non-text kwarg {key:?}"))),
    }
}

fn window(kwargs: &StatementParams) -> (Option<DateTime<Local>>, Option<DateTime<Local>>) {
    let start = match kwargs.get(KEY_START) { Some(Value::Instant(t)) => Some(*t), _ => None };
    let end = match kwargs.get(KEY_END) { Some(Value::Instant(t)) => Some(*t), _ => None };
    (start, end)
}

pub fn always_true() -> Condition {
    Condition::always_true()
}

pub fn always_false() -> Condition {
    Condition::always_false()
}

/// `ParamExists(**expected)`: true iff every expected key exists in
/// `session.parameters` with the expected value.
pub fn param_exists(expected: HashMap<String, Value>) -> Condition {
    let template = StatementTemplate::new(
        "ParamExists",
        |_args: &[Value], kwargs: &StatementParams, session: &Session, _now: DateTime<Local>| {
            let params = session.parameters_snapshot();
            let ok = kwargs.iter().all(|(k, v)| params.get(k) == Some(v));
            Ok(Observation::Bool(ok))
        },
        false,
        false,
    );
    Condition::Statement(template.instantiate(vec![], expected, None))
}

/// `IsEnv(env)`: true iff `session.env == env`.
pub fn is_env(env: impl Into<String>) -> Condition {
    let template = StatementTemplate::new(
        "IsEnv",
        |_args: &[Value], kwargs: &StatementParams, session: &Session, _now: DateTime<Local>| {
            let expected = text_kwarg(kwargs, "env")?;
            Ok(Observation::Bool(session.env() == Some(expected.as_str())))
        },
        false,
        false,
    );
    let mut kwargs = StatementParams::new();
    kwargs.insert("env".to_string(), Value::Text(env.into()));
    Condition::Statement(template.instantiate(vec![], kwargs, None))
}

fn task_action_count(template_name: &'static str, action: Action) -> StatementTemplate {
    StatementTemplate::new(
        template_name,
        move |_args: &[Value], kwargs: &StatementParams, session: &Session, _now: DateTime<Local>| {
            let task = text_kwarg(kwargs, KEY_TASK)?;
            let (start, end) = window(kwargs);
            let events = session.history().get(Some(&task), Some(action), start, end);
            Ok(Observation::Count(events.len()))
        },
        true,
        true,
    )
}

fn historical_task_statement(template: StatementTemplate, task: impl Into<String>, period: Option<TimePeriod>) -> Statement {
    let mut kwargs = StatementParams::new();
    kwargs.insert(KEY_TASK.to_string(), Value::Text(task.into()));
    template.instantiate(vec![], kwargs, period)
}

pub fn task_started(task: impl Into<String>, period: Option<TimePeriod>) -> Statement {
    historical_task_statement(task_action_count("TaskStarted", Action::Run), task, period)
}

pub fn task_succeeded(task: impl Into<String>, period: Option<TimePeriod>) -> Statement {
    historical_task_statement(task_action_count("TaskSucceeded", Action::Success), task, period)
}

pub fn task_failed(task: impl Into<String>, period: Option<TimePeriod>) -> Statement {
    historical_task_statement(task_action_count("TaskFailed", Action::Fail), task, period)
}

pub fn task_terminated(task: impl Into<String>, period: Option<TimePeriod>) -> Statement {
    historical_task_statement(task_action_count("TaskTerminated", Action::Terminate), task, period)
}

/// `TaskFinished`: counts `success|fail|terminate` events (crashes are
/// logged as `fail`, per the lifecycle note "crash treated as fail").
pub fn task_finished(task: impl Into<String>, period: Option<TimePeriod>) -> Statement {
    let template = StatementTemplate::new(
        "TaskFinished",
        |_args: &[Value], kwargs: &StatementParams, session: &Session, _now: DateTime<Local>| {
            let task = text_kwarg(kwargs, KEY_TASK)?;
            let (start, end) = window(kwargs);
            let events = session.history().get(Some(&task), None, start, end);
            let count = events.iter().filter(|e| e.action.is_terminal() && e.action != Action::Crash).count();
            Ok(Observation::Count(count))
        },
        true,
        true,
    );
    historical_task_statement(template, task, period)
}

/// `TaskRunning(task)`: true iff the task has an open `run` with no
/// matching terminal event since.
pub fn task_running(task: impl Into<String>) -> Condition {
    let template = StatementTemplate::new(
        "TaskRunning",
        |_args: &[Value], kwargs: &StatementParams, session: &Session, _now: DateTime<Local>| {
            let task = text_kwarg(kwargs, KEY_TASK)?;
            let Some(last_run) = session.history().latest(Some(&task), Some(Action::Run)) else {
                return Ok(Observation::Bool(false));
            };
            let since = session.history().get(Some(&task), None, Some(last_run.timestamp), None);
            let has_terminal_after = since.iter().any(|e| e.action.is_terminal() && e.timestamp > last_run.timestamp);
            Ok(Observation::Bool(!has_terminal_after))
        },
        false,
        false,
    );
    let mut kwargs = StatementParams::new();
    kwargs.insert(KEY_TASK.to_string(), Value::Text(task.into()));
    Condition::Statement(template.instantiate(vec![], kwargs, None))
}

fn depend_statement(name: &'static str, matching: fn(Action) -> bool) -> StatementTemplate {
    StatementTemplate::new(
        name,
        move |_args: &[Value], kwargs: &StatementParams, session: &Session, _now: DateTime<Local>| {
            let task = text_kwarg(kwargs, KEY_TASK)?;
            let depend_task = text_kwarg(kwargs, KEY_DEPEND_TASK)?;

            let last_run_before = session
                .with_task(&task, |t| t.last_run())
                .unwrap_or(None);

            let events = session.history().get(Some(&depend_task), None, None, None);
            let matched = events
                .iter()
                .filter(|e| matching(e.action))
                .max_by_key(|e| e.timestamp);

            let ok = match (matched, last_run_before) {
                (Some(e), Some(last_run)) => e.timestamp > last_run,
                (Some(_), None) => true,
                (None, _) => false,
            };
            Ok(Observation::Bool(ok))
        },
        false,
        false,
    )
}

/// `DependSuccess(task, depend_task)`: true iff `depend_task` succeeded
/// strictly after `task`'s last run.
pub fn depend_success(task: impl Into<String>, depend_task: impl Into<String>) -> Condition {
    let template = depend_statement("DependSuccess", |a| a == Action::Success);
    depend_condition(template, task, depend_task)
}

pub fn depend_failure(task: impl Into<String>, depend_task: impl Into<String>) -> Condition {
    let template = depend_statement("DependFailure", |a| a == Action::Fail);
    depend_condition(template, task, depend_task)
}

pub fn depend_finish(task: impl Into<String>, depend_task: impl Into<String>) -> Condition {
    let template = depend_statement("DependFinish", |a| a.is_terminal() && a != Action::Crash);
    depend_condition(template, task, depend_task)
}

fn depend_condition(template: StatementTemplate, task: impl Into<String>, depend_task: impl Into<String>) -> Condition {
    let mut kwargs = StatementParams::new();
    kwargs.insert(KEY_TASK.to_string(), Value::Text(task.into()));
    kwargs.insert(KEY_DEPEND_TASK.to_string(), Value::Text(depend_task.into()));
    Condition::Statement(template.instantiate(vec![], kwargs, None))
}

fn scheduler_action_count(name: &'static str, action: Action) -> StatementTemplate {
    StatementTemplate::new(
        name,
        move |_args: &[Value], kwargs: &StatementParams, session: &Session, _now: DateTime<Local>| {
            let (start, end) = window(kwargs);
            let events = session.history().get(None, Some(action), start, end);
            Ok(Observation::Count(events.len()))
        },
        true,
        true,
    )
}

pub fn scheduler_started(period: Option<TimePeriod>) -> Statement {
    scheduler_action_count("SchedulerStarted", Action::SchedulerStart).instantiate(vec![], StatementParams::new(), period)
}

pub fn scheduler_cycles(period: Option<TimePeriod>) -> Statement {
    scheduler_action_count("SchedulerCycles", Action::SchedulerCycle).instantiate(vec![], StatementParams::new(), period)
}

fn time_window_statement(name: &'static str) -> StatementTemplate {
    StatementTemplate::new(
        name,
        |_args: &[Value], kwargs: &StatementParams, _session: &Session, now: DateTime<Local>| {
            let (start, end) = window(kwargs);
            let inside = matches!((start, end), (Some(s), Some(e)) if now >= s && now < e);
            Ok(Observation::Bool(inside))
        },
        true,
        false,
    )
}

pub fn time_of_day(period: TimePeriod) -> Condition {
    Condition::Statement(time_window_statement("TimeOfDay").instantiate(vec![], StatementParams::new(), Some(period)))
}

pub fn time_of_week(period: TimePeriod) -> Condition {
    Condition::Statement(time_window_statement("TimeOfWeek").instantiate(vec![], StatementParams::new(), Some(period)))
}

pub fn time_of_month(period: TimePeriod) -> Condition {
    Condition::Statement(time_window_statement("TimeOfMonth").instantiate(vec![], StatementParams::new(), Some(period)))
}

pub fn time_of_year(period: TimePeriod) -> Condition {
    Condition::Statement(time_window_statement("TimeOfYear").instantiate(vec![], StatementParams::new(), Some(period)))
}
