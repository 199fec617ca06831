//! Sequence expansion: the one piece of dict/config-layer logic this crate
//! keeps, because it is pure domain behavior independent of how tasks were
//! named (dict, YAML, or hand-written Rust).

use super::condition::Condition;

/// Chains `task_names` into a dependency sequence: the first task keeps
/// `declared_start_cond` unchanged; every later task additionally requires
/// its predecessor to have succeeded, via the same `depend_success`
/// convention the built-in catalog uses (`KEY_DEPEND_TASK`).
pub struct Sequence;

impl Sequence {
    pub fn expand(declared_start_cond: Condition, task_names: &[String]) -> Vec<(String, Condition)> {
        let mut expanded = Vec::with_capacity(task_names.len());
        let mut previous: Option<&String> = None;

        for name in task_names {
            let start_cond = match previous {
                None => declared_start_cond.clone(),
                Some(prev) => declared_start_cond.clone() & crate::domain::entities::builtins::depend_success(name, prev),
            };
            expanded.push((name.clone(), start_cond));
            previous = Some(name);
        }

        expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_task_keeps_declared_start_cond_unchanged() {
        let expanded = Sequence::expand(Condition::always_true(), &["a".to_string(), "b".to_string()]);
        assert_eq!(expanded[0].1, Condition::always_true());
    }

    #[test]
    fn later_tasks_additionally_depend_on_their_predecessor() {
        let names = vec!["extract".to_string(), "transform".to_string(), "load".to_string()];
        let expanded = Sequence::expand(Condition::always_true(), &names);
        assert_eq!(expanded.len(), 3);
        match &expanded[1].1 {
            Condition::And(children) => assert_eq!(children.len(), 2),
            other => panic!("expected an And node, got {other:?}"),
        }
        match &expanded[2].1 {
            Condition::And(children) => assert_eq!(children.len(), 2),
            other => panic!("expected an And node, got {other:?}"),
        }
    }

    #[test]
    fn expanding_an_empty_list_produces_nothing() {
        let expanded = Sequence::expand(Condition::always_false(), &[]);
        assert!(expanded.is_empty());
    }
}
