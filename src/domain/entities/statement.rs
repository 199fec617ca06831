//! Statement framework.
//!
//! A Statement pairs an `observe` function with positional args, keyword
//! args, and (for historical statements) a period. There is no
//! `from_func`-style dynamic subclass:
//! [`StatementTemplate`] is an explicit builder, and `_to_bool` is the free
//! function [`reduce_to_bool`] selected by the template's `historical` /
//! `comparable` flags rather than an inherited method.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local};

use super::time_period::TimePeriod;
use crate::domain::errors::ObserveError;
use crate::domain::entities::session::Session;

/// A value flowing through statement kwargs, session parameters, and
/// observations. Deliberately small: this engine does not need a generic
/// dynamic type system, only enough variants to express what conditions
/// compare against.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Instant(DateTime<Local>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Instant(t) => write!(f, "{t}"),
        }
    }
}

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Float(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::Text(v.to_string()) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::Text(v) } }

/// Keyword arguments attached to a Statement, including the reserved
/// `_start_`/`_end_`/comparison keys the engine injects.
pub type StatementParams = HashMap<String, Value>;

pub const KEY_START: &str = "_start_";
pub const KEY_END: &str = "_end_";
pub const KEY_TASK: &str = "task";
pub const KEY_DEPEND_TASK: &str = "depend_task";

/// A relational operator a Comparable statement can attach to its kwargs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl ComparisonOp {
    fn kwarg_key(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "_eq_",
            ComparisonOp::Ne => "_ne_",
            ComparisonOp::Lt => "_lt_",
            ComparisonOp::Gt => "_gt_",
            ComparisonOp::Le => "_le_",
            ComparisonOp::Ge => "_ge_",
        }
    }

    fn holds(self, observed: f64, threshold: f64) -> bool {
        match self {
            ComparisonOp::Eq => observed == threshold,
            ComparisonOp::Ne => observed != threshold,
            ComparisonOp::Lt => observed < threshold,
            ComparisonOp::Gt => observed > threshold,
            ComparisonOp::Le => observed <= threshold,
            ComparisonOp::Ge => observed >= threshold,
        }
    }
}

/// What an `observe` call produced, before `_to_bool` reduction.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Bool(bool),
    Count(usize),
    Number(f64),
}

/// The contract every built-in and user-supplied statement implements.
///
/// `ctx` gives access to the owning session (for parameters and history)
/// and the wall-clock instant pinned for the current evaluation cycle.
pub trait Observe: Send + Sync {
    fn observe(&self, args: &[Value], kwargs: &StatementParams, session: &Session, now: DateTime<Local>) -> Result<Observation, ObserveError>;
}

impl<F> Observe for F
where
    F: Fn(&[Value], &StatementParams, &Session, DateTime<Local>) -> Result<Observation, ObserveError> + Send + Sync,
{
    fn observe(&self, args: &[Value], kwargs: &StatementParams, session: &Session, now: DateTime<Local>) -> Result<Observation, ObserveError> {
        self(args, kwargs, session, now)
    }
}

/// The explicit builder replacing runtime class synthesis (`from_func`).
///
/// `historical = true` means `_start_`/`_end_` are derived from `period`
/// and merged into kwargs before every `observe` call. `comparable = true`
/// means `.eq()/.ne()/.lt()/.gt()/.le()/.ge()` produce bound statements
/// whose `_to_bool` checks the attached operators conjunctively instead of
/// defaulting to `observation > 0`.
#[derive(Clone)]
pub struct StatementTemplate {
    pub name: &'static str,
    observe: Arc<dyn Observe>,
    pub historical: bool,
    pub comparable: bool,
    /// `use_globals`: merge `session.parameters` into kwargs at evaluation
    /// time, task-local kwargs winning on collision.
    pub use_globals: bool,
}

impl fmt::Debug for StatementTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementTemplate")
            .field("name", &self.name)
            .field("historical", &self.historical)
            .field("comparable", &self.comparable)
            .finish()
    }
}

impl StatementTemplate {
    pub fn new(name: &'static str, observe: impl Observe + 'static, historical: bool, comparable: bool) -> Self {
        Self { name, observe: Arc::new(observe), historical, comparable, use_globals: false }
    }

    pub fn use_globals(mut self, yes: bool) -> Self {
        self.use_globals = yes;
        self
    }

    pub fn instantiate(&self, args: Vec<Value>, kwargs: StatementParams, period: Option<TimePeriod>) -> Statement {
        Statement {
            template: self.clone(),
            args,
            kwargs,
            period,
        }
    }
}

/// A parameterised condition leaf: a bound `StatementTemplate` plus its
/// args/kwargs/period.
///
/// Equality compares `(template name, args, kwargs, period)` structurally
/// and ignores any session binding.
#[derive(Debug, Clone)]
pub struct Statement {
    template: StatementTemplate,
    args: Vec<Value>,
    kwargs: StatementParams,
    period: Option<TimePeriod>,
}

impl PartialEq for Statement {
    fn eq(&self, other: &Self) -> bool {
        self.template.name == other.template.name
            && self.args == other.args
            && self.kwargs == other.kwargs
            && self.period == other.period
    }
}

impl Statement {
    pub fn name(&self) -> &'static str {
        self.template.name
    }

    /// Shallow-copies this statement with one extra kwarg set, without
    /// mutating the shared template — how `task=…` gets attached to a
    /// statement drawn from a reusable template.
    pub fn set_param(&self, key: &str, value: Value) -> Statement {
        let mut copy = self.clone();
        copy.kwargs.insert(key.to_string(), value);
        copy
    }

    fn with_comparison(&self, op: ComparisonOp, threshold: f64) -> Statement {
        self.set_param(op.kwarg_key(), Value::Float(threshold))
    }

    pub fn eq(&self, threshold: f64) -> Statement { self.with_comparison(ComparisonOp::Eq, threshold) }
    pub fn ne(&self, threshold: f64) -> Statement { self.with_comparison(ComparisonOp::Ne, threshold) }
    pub fn lt(&self, threshold: f64) -> Statement { self.with_comparison(ComparisonOp::Lt, threshold) }
    pub fn gt(&self, threshold: f64) -> Statement { self.with_comparison(ComparisonOp::Gt, threshold) }
    pub fn le(&self, threshold: f64) -> Statement { self.with_comparison(ComparisonOp::Le, threshold) }
    pub fn ge(&self, threshold: f64) -> Statement { self.with_comparison(ComparisonOp::Ge, threshold) }

    /// Evaluates `observe`, merging in `_start_`/`_end_` (if historical)
    /// and session globals (if `use_globals`), then applies `_to_bool`.
    pub fn evaluate(&self, session: &Session, now: DateTime<Local>) -> Result<bool, ObserveError> {
        let mut merged = self.kwargs.clone();

        if self.template.use_globals {
            for (k, v) in session.parameters_snapshot() {
                merged.entry(k).or_insert(v);
            }
        }

        if let Some(period) = &self.period {
            let interval = period.rollback(now);
            merged.insert(KEY_START.to_string(), Value::Instant(interval.start));
            merged.insert(KEY_END.to_string(), Value::Instant(interval.end));
        }

        let observation = self.template.observe.observe(&self.args, &merged, session, now)?;
        Ok(reduce_to_bool(&observation, self.template.comparable, &merged))
    }
}

/// `_to_bool`: the free function selected by a statement's flags, replacing
/// an inherited method (design note on runtime class synthesis).
///
/// `Observation::Bool` passes through directly. Otherwise the observation is
/// reduced to a scalar (`Count` as its length, `Number` as itself) and, if
/// the statement is comparable, checked against every attached operator
/// conjunctively; with no attached operators it reduces to `observation > 0`.
pub fn reduce_to_bool(observation: &Observation, comparable: bool, kwargs: &StatementParams) -> bool {
    if let Observation::Bool(b) = observation {
        return *b;
    }

    let scalar = match observation {
        Observation::Bool(_) => unreachable!(),
        Observation::Count(n) => *n as f64,
        Observation::Number(x) => *x,
    };

    if !comparable {
        return scalar > 0.0;
    }

    let ops: &[(ComparisonOp, &str)] = &[
        (ComparisonOp::Eq, "_eq_"),
        (ComparisonOp::Ne, "_ne_"),
        (ComparisonOp::Lt, "_lt_"),
        (ComparisonOp::Gt, "_gt_"),
        (ComparisonOp::Le, "_le_"),
        (ComparisonOp::Ge, "_ge_"),
    ];

    let mut attached = false;
    for (op, key) in ops {
        if let Some(Value::Float(threshold)) = kwargs.get(*key) {
            attached = true;
            if !op.holds(scalar, *threshold) {
                return false;
            }
        }
    }

    if attached { true } else { scalar > 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::config::Config;
    use std::sync::Arc as StdArc;

    fn test_session() -> Session {
        Session::new(Config::default(), StdArc::new(crate::infrastructure::history::in_memory_event_log::InMemoryEventLog::new()))
    }

    fn number_template(value: f64) -> StatementTemplate {
        StatementTemplate::new("TestNumber", move |_: &[Value], _: &StatementParams, _: &Session, _: DateTime<Local>| {
            Ok(Observation::Number(value))
        }, false, true)
    }

    #[test]
    fn comparable_statement_checks_all_attached_operators() {
        let template = number_template(5.0);
        let stmt = template.instantiate(vec![], StatementParams::new(), None);
        let at_least_three = stmt.ge(3.0);
        let session = test_session();
        let now = Local::now();
        assert!(at_least_three.evaluate(&session, now).unwrap());

        let too_small = stmt.ge(3.0).le(4.0);
        assert!(!too_small.evaluate(&session, now).unwrap());
    }

    #[test]
    fn no_operators_defaults_to_greater_than_zero() {
        let template = number_template(0.0);
        let stmt = template.instantiate(vec![], StatementParams::new(), None);
        let session = test_session();
        assert!(!stmt.evaluate(&session, Local::now()).unwrap());
    }

    #[test]
    fn bool_observation_passes_through_regardless_of_comparable_flag() {
        let template = StatementTemplate::new("TestBool", |_: &[Value], _: &StatementParams, _: &Session, _: DateTime<Local>| {
            Ok(Observation::Bool(true))
        }, false, true);
        let stmt = template.instantiate(vec![], StatementParams::new(), None);
        let session = test_session();
        assert!(stmt.evaluate(&session, Local::now()).unwrap());
    }

    #[test]
    fn set_param_does_not_mutate_the_original() {
        let template = number_template(1.0);
        let base = template.instantiate(vec![], StatementParams::new(), None);
        let bound = base.set_param(KEY_TASK, Value::Text("A".into()));
        assert!(!base.kwargs.contains_key(KEY_TASK));
        assert!(bound.kwargs.contains_key(KEY_TASK));
    }

    #[test]
    fn equality_ignores_session_and_compares_structure() {
        let template = number_template(1.0);
        let a = template.instantiate(vec![Value::from("x")], StatementParams::new(), None);
        let b = template.instantiate(vec![Value::from("x")], StatementParams::new(), None);
        assert_eq!(a, b);
        let c = template.instantiate(vec![Value::from("y")], StatementParams::new(), None);
        assert_ne!(a, c);
    }
}
