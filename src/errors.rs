// src/errors.rs

//! Crate-wide error types.
//!
//! Two distinct families live here:
//!
//! - [`Error`]: configuration and graph-structure errors. These are always
//!   fatal and are raised synchronously at the offending call
//!   (`add_task`, `add_dependency`, `TaskManager::new`, ...). They are never
//!   routed through the failure-mode machinery.
//! - [`TaskError`]: the captured payload of a failed task execution. These
//!   are fully contained by the scheduler: they reach the caller only through
//!   observer callbacks and the final boolean result of `run_tasks`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Inserting this edge would make the dependency graph cyclic.
    #[error("cyclic dependency: '{task}' cannot depend on '{dependency}'")]
    CyclicDependency { task: String, dependency: String },

    #[error("task '{task}' already depends on '{dependency}'")]
    DuplicateDependency { task: String, dependency: String },

    #[error("priority_levels must be greater than zero")]
    InvalidPriorityLevels,

    #[error(
        "task '{task}' has priority {priority} but the manager only has \
         {levels} priority levels"
    )]
    PriorityOutOfRange {
        task: String,
        priority: usize,
        levels: usize,
    },

    #[error("invalid failure mode '{0}'")]
    InvalidFailureMode(String),

    /// A task's resolved request exceeds a resource's total capacity. This is
    /// a configuration error, not a blocking condition.
    #[error(
        "task '{task}' uses {uses} units of resource '{resource}' but there \
         is only {total} units total"
    )]
    ResourceExceedsTotal {
        task: String,
        resource: String,
        uses: f64,
        total: f64,
    },

    #[error("task manager is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// What a task execution reported when it failed.
///
/// Kills are deliberately *not* a `TaskError` variant: a killed task has no
/// error payload and is reported through `Observer::task_killed` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("exited with code {0}")]
    ExitCode(i32),

    #[error("terminated by signal")]
    Signaled,

    #[error("{0}")]
    Message(String),
}
