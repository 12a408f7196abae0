// src/observer/mod.rs

//! Hooks for watching a run as it happens.

mod console;

pub use console::{ConsoleObserver, Verbosity};

use crate::errors::TaskError;
use crate::task::Task;

/// Receives lifecycle notifications from the scheduler.
///
/// Every method has a no-op default, so implementors override only what they
/// care about. Callbacks arrive on scheduler-owned threads while the
/// scheduler lock is held: keep them quick, and use interior mutability for
/// any state (the receiver is `&self`).
pub trait Observer: Send + Sync {
    /// The run is about to begin dispatching.
    fn run_starting(&self) {}

    /// Every task has reached a terminal state (or was filtered).
    fn run_complete(&self) {}

    /// A task was registered with the manager.
    fn task_added(&self, task: &Task) {
        let _ = task;
    }

    /// A task's executor is about to run.
    fn task_started(&self, task: &Task) {
        let _ = task;
    }

    /// A task's conditions decided its work was already satisfied.
    fn task_bypassed(&self, task: &Task) {
        let _ = task;
    }

    fn task_completed(&self, task: &Task) {
        let _ = task;
    }

    fn task_failed(&self, task: &Task, error: &TaskError) {
        let _ = (task, error);
    }

    /// A running task was stopped by the failure sweep or a termination
    /// request.
    fn task_killed(&self, task: &Task) {
        let _ = task;
    }
}
