// src/exec/function.rs

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::TaskError;
use crate::exec::Executor;

type TaskFn = Box<dyn FnOnce() -> Result<(), TaskError> + Send>;

/// Runs a user-supplied closure in-process.
///
/// A closure that is already running cannot be interrupted; `kill` therefore
/// reports success for any not-yet-finished task and lets the closure drain,
/// with the task reported as killed regardless of what the closure returns.
pub struct FunctionExecutor {
    label: String,
    func: Mutex<Option<TaskFn>>,
    finished: AtomicBool,
}

impl FunctionExecutor {
    pub fn new<F>(func: F) -> Self
    where
        F: FnOnce() -> Result<(), TaskError> + Send + 'static,
    {
        Self::labeled("function", func)
    }

    /// Like [`new`](Self::new) but with a custom description.
    pub fn labeled<F>(label: impl Into<String>, func: F) -> Self
    where
        F: FnOnce() -> Result<(), TaskError> + Send + 'static,
    {
        Self {
            label: label.into(),
            func: Mutex::new(Some(Box::new(func))),
            finished: AtomicBool::new(false),
        }
    }
}

impl Executor for FunctionExecutor {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn execute(&self) -> Result<(), TaskError> {
        let func = self
            .func
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let result = match func {
            Some(func) => func(),
            None => Ok(()),
        };
        self.finished.store(true, Ordering::SeqCst);
        result
    }

    fn kill(&self) -> bool {
        !self.finished.load(Ordering::SeqCst)
    }
}
