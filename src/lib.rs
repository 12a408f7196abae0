// src/lib.rs

//! `dagrun` executes a dependency graph of tasks under resource
//! constraints.
//!
//! Tasks form a DAG (cycles are rejected at edge insertion). A single
//! dispatch loop hands ready tasks to their own threads, highest priority
//! first and FIFO within a priority level, admitting each one only when
//! every declared resource can be claimed in full. Tasks can be bypassed by
//! up-to-date checks, and a configurable failure mode decides how much of
//! the remaining graph survives a failure.
//!
//! ```no_run
//! use dagrun::{TaskManager, TaskManagerOptions, TaskSpec};
//!
//! # fn main() -> dagrun::Result<()> {
//! let mut manager = TaskManager::new(TaskManagerOptions::default())?;
//! let build = manager.add_task(TaskSpec::process("build", "make"))?;
//! let test = manager.add_task(TaskSpec::process("test", "make test"))?;
//! manager.add_dependency(test, build)?;
//! let ok = manager.run_tasks()?;
//! # let _ = ok;
//! # Ok(())
//! # }
//! ```

mod condition;
mod errors;
mod exec;
mod failure_mode;
mod graph;
mod logging;
mod manager;
mod observer;
mod resource;
mod task;

pub use condition::{
    Condition, FileHashCondition, FileHashDatabase, FileModificationCondition, FnCondition,
};
pub use errors::{Error, Result, TaskError};
pub use exec::{Executor, FunctionExecutor, NopExecutor, ProcessExecutor};
pub use failure_mode::FailureMode;
pub use logging::init_logging;
pub use manager::{TaskManager, TaskManagerOptions};
pub use observer::{ConsoleObserver, Observer, Verbosity};
pub use resource::{CounterResource, Resource, ResourceManager};
pub use task::{Task, TaskId, TaskOutcome, TaskSpec};
