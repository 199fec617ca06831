//! Execution backends, one per [`crate::domain::entities::task::ExecutionMode`].

pub mod async_executor;
pub mod handle;
pub mod main_executor;
pub mod process_executor;
pub mod thread_executor;

pub use async_executor::AsyncHandle;
pub use handle::{ExecutionHandle, PollResult};
pub use process_executor::ProcessHandle;
pub use thread_executor::ThreadHandle;
