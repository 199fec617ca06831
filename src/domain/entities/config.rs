//! Scheduler configuration: the options governing a session's duration
//! handling, restart policy, and shutdown behavior.

use std::time::Duration;

use super::condition::Condition;
use crate::domain::errors::SchedulerError;

/// `task_pre_exist` policy when a task with a colliding name is added to
/// a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskPreExist {
    #[default]
    Raise,
    Ignore,
    Replace,
}

/// `restarting` policy selecting what the scheduler does once its cycle
/// loop exits. `Relaunch`/`Fresh` are documented in DESIGN.md as running
/// identically to `Recall` in-process; true re-exec is left to the
/// process entrypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartMode {
    #[default]
    Relaunch,
    Recall,
    Fresh,
    Finish,
}

/// Any of the three duration input forms accepted by duration-valued
/// config options: a plain number of seconds, a human string like
/// `"0.1 seconds"`, or an already-constructed `Duration`.
#[derive(Debug, Clone)]
pub enum DurationSpec {
    Seconds(f64),
    Human(String),
    Literal(Duration),
}

impl From<f64> for DurationSpec { fn from(v: f64) -> Self { DurationSpec::Seconds(v) } }
impl From<Duration> for DurationSpec { fn from(v: Duration) -> Self { DurationSpec::Literal(v) } }
impl From<&str> for DurationSpec { fn from(v: &str) -> Self { DurationSpec::Human(v.to_string()) } }

/// Parses any of the three duration spellings into a `Duration`
/// (`0.1`, `"0.1 seconds"`, and a literal duration all produce the same
/// 0.1s value).
pub fn parse_duration(spec: DurationSpec) -> Result<Duration, SchedulerError> {
    match spec {
        DurationSpec::Literal(d) => Ok(d),
        DurationSpec::Seconds(secs) => {
            if secs < 0.0 || !secs.is_finite() {
                return Err(SchedulerError::Config(format!("invalid duration: {secs} seconds")));
            }
            Ok(Duration::from_secs_f64(secs))
        }
        DurationSpec::Human(text) => parse_human_duration(&text),
    }
}

fn parse_human_duration(text: &str) -> Result<Duration, SchedulerError> {
    let text = text.trim();
    let split_at = text.find(|c: char| !c.is_ascii_digit() && c != '.' && c != '-').unwrap_or(text.len());
    let (number_part, unit_part) = text.split_at(split_at);
    let number: f64 = number_part
        .trim()
        .parse()
        .map_err(|_| SchedulerError::Config(format!("invalid duration: {text:?}")))?;
    let unit = unit_part.trim().to_ascii_lowercase();
    let seconds = match unit.as_str() {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => number,
        "m" | "min" | "mins" | "minute" | "minutes" => number * 60.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => number * 3600.0,
        "d" | "day" | "days" => number * 86400.0,
        "ms" | "millisecond" | "milliseconds" => number / 1000.0,
        other => return Err(SchedulerError::Config(format!("unrecognized duration unit: {other:?}"))),
    };
    if seconds < 0.0 {
        return Err(SchedulerError::Config(format!("invalid duration: {text:?}")));
    }
    Ok(Duration::from_secs_f64(seconds))
}

/// Recognized scheduler options and their defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub silence_task_prerun: bool,
    pub silence_task_logging: bool,
    pub silence_cond_check: bool,
    pub task_pre_exist: TaskPreExist,
    pub timeout: Duration,
    pub shut_cond: Condition,
    pub cycle_sleep: Duration,
    pub debug: bool,
    pub restarting: RestartMode,
    pub instant_shutdown: bool,
    /// Grace period the scheduler waits for running tasks to finish after
    /// `shut_cond` fires, before force-detaching stragglers.
    pub shut_cycle_timeout: Duration,
    pub force_status_from_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            silence_task_prerun: false,
            silence_task_logging: false,
            silence_cond_check: false,
            task_pre_exist: TaskPreExist::Raise,
            timeout: Duration::from_secs(30 * 60),
            shut_cond: Condition::always_false(),
            cycle_sleep: Duration::from_millis(100),
            debug: false,
            restarting: RestartMode::Relaunch,
            instant_shutdown: false,
            shut_cycle_timeout: Duration::from_secs(5),
            force_status_from_logs: false,
        }
    }
}
