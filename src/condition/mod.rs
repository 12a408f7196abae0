// src/condition/mod.rs

//! Pluggable predicates deciding whether a task's work is already satisfied.
//!
//! A task with conditions attached is *bypassed* (not executed, but still
//! unblocking its dependents) unless at least one condition reports that the
//! work is needed.

mod file_hash;
mod file_modification;
mod function;

pub use file_hash::{FileHashCondition, FileHashDatabase};
pub use file_modification::FileModificationCondition;
pub use function::FnCondition;

/// Decides whether a task needs to run.
///
/// `check` returns true when the work is needed (do not bypass). It is
/// called at most once per task per run, under the scheduler lock, so it
/// should not block significantly.
pub trait Condition: Send {
    fn check(&self) -> bool;
}
