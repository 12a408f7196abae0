// src/exec/process.rs

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tracing::debug;

use crate::errors::TaskError;
use crate::exec::Executor;

/// How often the waiting thread checks the child for exit. The wait happens
/// inside the executor, never in the scheduler loop.
const WAIT_INTERVAL: Duration = Duration::from_millis(10);

/// Runs a shell command (`sh -c <command>`) as a child process.
///
/// The child handle lives behind the executor's own lock so `kill` can
/// signal the process while `execute` is waiting on it; once the process has
/// been reaped, `kill` reports that there was nothing left to stop. The
/// child inherits the parent's stdout/stderr unless redirected to files
/// with [`stdout_to`](Self::stdout_to) / [`stderr_to`](Self::stderr_to).
pub struct ProcessExecutor {
    command: String,
    stdout: Option<PathBuf>,
    stderr: Option<PathBuf>,
    state: Mutex<ProcState>,
}

#[derive(Default)]
struct ProcState {
    child: Option<Child>,
    killed: bool,
    finished: bool,
}

impl ProcessExecutor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            stdout: None,
            stderr: None,
            state: Mutex::new(ProcState::default()),
        }
    }

    /// Write the child's stdout to a file (created/truncated at execution).
    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }

    /// Write the child's stderr to a file (created/truncated at execution).
    pub fn stderr_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stderr = Some(path.into());
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    fn lock(&self) -> MutexGuard<'_, ProcState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Executor for ProcessExecutor {
    fn describe(&self) -> String {
        self.command.clone()
    }

    fn execute(&self) -> Result<(), TaskError> {
        let stdout = self.stdout.as_deref().map(redirect).transpose();
        let stderr = self.stderr.as_deref().map(redirect).transpose();
        {
            let mut st = self.lock();
            if st.killed {
                st.finished = true;
                return Err(TaskError::Message("killed before start".to_string()));
            }
            // every early return must mark the work finished, or a late
            // kill would claim to have stopped something
            let (stdout, stderr) = match (stdout, stderr) {
                (Ok(out), Ok(err)) => (out, err),
                (Err(e), _) | (_, Err(e)) => {
                    st.finished = true;
                    return Err(e);
                }
            };
            let mut command = Command::new("sh");
            command.arg("-c").arg(&self.command).stdin(Stdio::null());
            if let Some(file) = stdout {
                command.stdout(file);
            }
            if let Some(file) = stderr {
                command.stderr(file);
            }
            let child = match command.spawn() {
                Ok(child) => child,
                Err(e) => {
                    st.finished = true;
                    return Err(TaskError::Message(format!("failed to spawn: {e}")));
                }
            };
            debug!(command = %self.command, pid = child.id(), "process spawned");
            st.child = Some(child);
        }

        let status = loop {
            {
                let mut st = self.lock();
                let Some(child) = st.child.as_mut() else {
                    st.finished = true;
                    return Err(TaskError::Message("child handle lost".to_string()));
                };
                match child.try_wait() {
                    Ok(Some(status)) => {
                        st.child = None;
                        st.finished = true;
                        break status;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        st.child = None;
                        st.finished = true;
                        return Err(TaskError::Message(format!("wait failed: {e}")));
                    }
                }
            }
            std::thread::sleep(WAIT_INTERVAL);
        };

        status_to_result(status)
    }

    fn kill(&self) -> bool {
        let mut st = self.lock();
        if st.finished {
            return false;
        }
        st.killed = true;
        if let Some(child) = st.child.as_mut() {
            debug!(command = %self.command, pid = child.id(), "killing process");
            let _ = child.kill();
        }
        true
    }
}

fn redirect(path: &Path) -> Result<Stdio, TaskError> {
    File::create(path)
        .map(Stdio::from)
        .map_err(|e| TaskError::Message(format!("failed to open {}: {e}", path.display())))
}

fn status_to_result(status: ExitStatus) -> Result<(), TaskError> {
    if status.success() {
        Ok(())
    } else {
        match status.code() {
            Some(code) => Err(TaskError::ExitCode(code)),
            // no exit code means the child was terminated by a signal
            None => Err(TaskError::Signaled),
        }
    }
}
