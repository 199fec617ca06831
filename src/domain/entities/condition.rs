//! Condition algebra.
//!
//! A boolean tree over predicates: `Constant`, `And`, `Or`, `Not`, or a
//! `Statement` leaf. The tree is immutable after construction; binding a
//! per-task argument (e.g. `task=…`) produces a new tree via
//! [`Condition::bind_task`] rather than mutating fields in place, keeping
//! condition trees safe to share and reuse across tasks.

use chrono::{DateTime, Local};
use tracing::{debug, error};

use super::session::Session;
use super::statement::Statement;
use crate::domain::errors::ObserveError;

/// A node in the condition algebra.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Constant(bool),
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    Statement(Statement),
}

impl Condition {
    pub fn always_true() -> Self {
        Condition::Constant(true)
    }

    pub fn always_false() -> Self {
        Condition::Constant(false)
    }

    /// n-ary AND builder.
    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Condition::And(conditions.into_iter().collect())
    }

    /// n-ary OR builder.
    pub fn any(conditions: impl IntoIterator<Item = Condition>) -> Self {
        Condition::Or(conditions.into_iter().collect())
    }

    /// Evaluates the tree with a uniform failure policy applied at every
    /// Statement leaf: an evaluation error collapses that leaf to `false`
    /// and is logged, unless `config.debug` is set (in which case it
    /// propagates), or it is an always-propagating `Interrupt`.
    pub fn evaluate(&self, session: &Session, now: DateTime<Local>) -> Result<bool, ObserveError> {
        match self {
            Condition::Constant(b) => Ok(*b),
            Condition::Not(inner) => Ok(!inner.evaluate(session, now)?),
            Condition::And(children) => {
                for child in children {
                    if !child.evaluate(session, now)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Or(children) => {
                for child in children {
                    if child.evaluate(session, now)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::Statement(stmt) => match stmt.evaluate(session, now) {
                Ok(b) => {
                    debug!(statement = stmt.name(), result = b, "condition evaluated");
                    Ok(b)
                }
                Err(ObserveError::Interrupt) => Err(ObserveError::Interrupt),
                Err(e) => {
                    if session.config().debug {
                        Err(e)
                    } else {
                        if !session.config().silence_cond_check {
                            error!(statement = stmt.name(), error = %e, "condition evaluation failed, treating as false");
                        }
                        Ok(false)
                    }
                }
            },
        }
    }

    /// Convenience for call sites that have already decided to apply the
    /// failure policy (the scheduler dispatch loop): errors that are not
    /// `Interrupt` collapse to `false`.
    pub fn evaluate_or_false(&self, session: &Session, now: DateTime<Local>) -> bool {
        self.evaluate(session, now).unwrap_or(false)
    }

    /// Returns a new tree with `task = name` bound onto every Statement
    /// leaf that does not already carry a `task` parameter.
    pub fn bind_task(&self, name: &str) -> Condition {
        match self {
            Condition::Constant(b) => Condition::Constant(*b),
            Condition::Not(inner) => Condition::Not(Box::new(inner.bind_task(name))),
            Condition::And(children) => Condition::And(children.iter().map(|c| c.bind_task(name)).collect()),
            Condition::Or(children) => Condition::Or(children.iter().map(|c| c.bind_task(name)).collect()),
            Condition::Statement(stmt) => Condition::Statement(stmt.set_param(super::statement::KEY_TASK, super::statement::Value::Text(name.to_string()))),
        }
    }
}

impl std::ops::BitAnd for Condition {
    type Output = Condition;

    /// Flattens nested `And` nodes instead of nesting `And(And(a,b),c)`.
    fn bitand(self, rhs: Condition) -> Condition {
        match (self, rhs) {
            (Condition::And(mut a), Condition::And(b)) => {
                a.extend(b);
                Condition::And(a)
            }
            (Condition::And(mut a), other) => {
                a.push(other);
                Condition::And(a)
            }
            (other, Condition::And(mut b)) => {
                let mut v = vec![other];
                v.append(&mut b);
                Condition::And(v)
            }
            (a, b) => Condition::And(vec![a, b]),
        }
    }
}

impl std::ops::BitOr for Condition {
    type Output = Condition;

    fn bitor(self, rhs: Condition) -> Condition {
        match (self, rhs) {
            (Condition::Or(mut a), Condition::Or(b)) => {
                a.extend(b);
                Condition::Or(a)
            }
            (Condition::Or(mut a), other) => {
                a.push(other);
                Condition::Or(a)
            }
            (other, Condition::Or(mut b)) => {
                let mut v = vec![other];
                v.append(&mut b);
                Condition::Or(v)
            }
            (a, b) => Condition::Or(vec![a, b]),
        }
    }
}

impl std::ops::Not for Condition {
    type Output = Condition;

    fn not(self) -> Condition {
        Condition::Not(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::config::Config;
    use std::sync::Arc;

    fn test_session() -> Session {
        Session::new(Config::default(), Arc::new(crate::infrastructure::history::in_memory_event_log::InMemoryEventLog::new()))
    }

    #[test]
    fn and_flattens_nested_nodes() {
        let c = Condition::always_true() & Condition::always_true() & Condition::always_false();
        assert_eq!(c, Condition::And(vec![Condition::always_true(), Condition::always_true(), Condition::always_false()]));
    }

    #[test]
    fn double_negation_is_identity_under_evaluation() {
        let session = test_session();
        let now = Local::now();
        let c = Condition::always_true();
        let double_negated = !(!c.clone());
        assert_eq!(c.evaluate_or_false(&session, now), double_negated.evaluate_or_false(&session, now));
    }

    #[test]
    fn and_true_is_identity() {
        let session = test_session();
        let now = Local::now();
        let c = Condition::always_false();
        let combined = c.clone() & Condition::always_true();
        assert_eq!(c.evaluate_or_false(&session, now), combined.evaluate_or_false(&session, now));
    }

    #[test]
    fn or_false_is_identity() {
        let session = test_session();
        let now = Local::now();
        let c = Condition::always_true();
        let combined = c.clone() | Condition::always_false();
        assert_eq!(c.evaluate_or_false(&session, now), combined.evaluate_or_false(&session, now));
    }

    #[test]
    fn or_short_circuits_left_to_right() {
        let session = test_session();
        let now = Local::now();
        let c = Condition::any([Condition::always_true(), Condition::always_false()]);
        assert!(c.evaluate_or_false(&session, now));
    }
}
