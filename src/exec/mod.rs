// src/exec/mod.rs

//! Pluggable execution backends.
//!
//! The scheduler talks to a task's work through the [`Executor`] trait only,
//! so tests can substitute controllable fakes and callers can plug in
//! anything from an in-process closure to an external job submission.

mod function;
mod nop;
mod process;

pub use function::FunctionExecutor;
pub use nop::NopExecutor;
pub use process::ProcessExecutor;

use crate::errors::TaskError;

/// How a task's work is performed.
///
/// `execute` runs on the task's own thread, outside the scheduler lock, and
/// may block arbitrarily. `kill` may be called from another thread (the
/// failure sweep or the signal path) at any point relative to `execute`;
/// implementations guard that race with their own internal state so that
/// "finished" and "being killed" are never both acted upon.
pub trait Executor: Send + Sync {
    /// A human-readable description of the work (not the task name).
    fn describe(&self) -> String;

    /// Perform the work. Called at most once.
    fn execute(&self) -> Result<(), TaskError>;

    /// Best-effort cancellation. Returns true iff the work was genuinely
    /// stopped or prevented from starting; after a true return the executor
    /// must not begin any new unit of work.
    fn kill(&self) -> bool;
}
