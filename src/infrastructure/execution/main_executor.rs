//! `main`-mode execution: the task body runs inline on the scheduler loop.
//!
//! There is no handle to poll here — dispatching a `main` task blocks cycle
//! progression until the body returns, so the scheduler calls
//! [`run_inline`] directly instead of going through [`super::handle::ExecutionHandle`].

use std::collections::HashMap;

use crate::domain::entities::statement::Value;
use crate::domain::entities::task::ShouldCancel;
use crate::domain::errors::TaskError;

const NEVER_CANCEL: ShouldCancel = &|| false;

/// Runs a sync task body to completion on the calling thread. `main` tasks
/// never observe cancellation since they never yield control back to the
/// scheduler while running.
pub fn run_inline(
    body: &(dyn Fn(&HashMap<String, Value>, ShouldCancel) -> Result<Value, TaskError> + Send + Sync),
    params: &HashMap<String, Value>,
) -> Result<Value, TaskError> {
    body(params, NEVER_CANCEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_body_runs_to_completion_and_returns_its_value() {
        let body = |_: &HashMap<String, Value>, _: ShouldCancel| Ok(Value::Int(42));
        let result = run_inline(&body, &HashMap::new());
        assert!(matches!(result, Ok(Value::Int(42))));
    }

    #[test]
    fn inline_body_never_observes_cancellation() {
        let body = |_: &HashMap<String, Value>, should_cancel: ShouldCancel| {
            Ok(Value::Bool(should_cancel()))
        };
        let result = run_inline(&body, &HashMap::new());
        assert!(matches!(result, Ok(Value::Bool(false))));
    }
}
