//! `process`-mode execution: a child process running the task's command
//! line, its own memory, killed outright on forced termination.

use std::collections::HashMap;
use std::process::{Child, Command};

use crate::domain::entities::statement::Value;
use crate::domain::errors::TaskError;
use crate::infrastructure::execution::handle::{ExecutionHandle, PollResult};

/// Spawns `cmdline` through the platform shell so the task author can use
/// pipes, redirection, and the rest of shell syntax, matching how a
/// `process`-mode task body is described.
pub struct ProcessHandle {
    child: Option<Child>,
    terminated: bool,
}

impl ProcessHandle {
    pub fn spawn(cmdline: &str, params: &HashMap<String, Value>) -> Result<Self, TaskError> {
        let mut command = shell_command(cmdline);
        for (key, value) in params {
            command.env(env_key(key), value.to_string());
        }
        let child = command.spawn().map_err(|e| TaskError::SpawnFailed(e.to_string()))?;
        Ok(Self { child: Some(child), terminated: false })
    }
}

#[cfg(unix)]
fn shell_command(cmdline: &str) -> Command {
    let mut command = Command::new("/bin/sh");
    command.arg("-c").arg(cmdline);
    command
}

#[cfg(not(unix))]
fn shell_command(cmdline: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(cmdline);
    command
}

fn env_key(key: &str) -> String {
    format!("TASKLOOM_{}", key.to_uppercase())
}

impl ExecutionHandle for ProcessHandle {
    fn poll(&mut self) -> PollResult {
        if self.terminated {
            return PollResult::Done(Err(TaskError::Terminated));
        }
        let Some(child) = self.child.as_mut() else {
            return PollResult::Done(Err(TaskError::Terminated));
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                self.child = None;
                if status.success() {
                    PollResult::Done(Ok(Value::Bool(true)))
                } else {
                    PollResult::Done(Err(TaskError::Crash(format!("process exited with {status}"))))
                }
            }
            Ok(None) => PollResult::Running,
            Err(e) => {
                self.child = None;
                PollResult::Done(Err(TaskError::Crash(e.to_string())))
            }
        }
    }

    /// Sends the child `SIGKILL` (Unix) or terminates it outright
    /// (`std::process::Child::kill` on other platforms). Unlike
    /// `thread`-mode, this is true forced termination with no cooperative
    /// gap: the child either dies now or has already exited.
    fn terminate(&mut self) {
        self.terminated = true;
        if let Some(child) = self.child.as_mut() {
            let _ = child.kill();
        }
    }

    fn force_detach(&mut self) {
        self.terminate();
    }
}
