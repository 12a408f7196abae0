// src/resource/mod.rs

//! Named, quantified capacities consumed by tasks while they run.

mod counter;
mod manager;

pub use counter::CounterResource;
pub use manager::ResourceManager;

use crate::errors::Result;
use crate::task::Task;

/// A named capacity with a per-task default.
///
/// All mutation happens under the scheduler lock, so implementations need no
/// internal synchronization; they do need to be `Send` to travel with the
/// shared scheduler state.
pub trait Resource: Send {
    fn name(&self) -> &str;

    /// Quantity charged to tasks that don't declare this resource.
    fn default_uses(&self) -> f64;

    /// Non-mutating admission check. A request exceeding the resource's
    /// total capacity is a configuration error and fails loudly; a request
    /// exceeding what is *currently* available just returns `Ok(false)`.
    fn can_use(&self, task: &Task) -> Result<bool>;

    /// Re-validate and, if there is enough available, claim the task's
    /// quantity. Returns whether the claim succeeded.
    fn acquire(&mut self, task: &Task) -> Result<bool>;

    /// Give back the task's quantity.
    fn release(&mut self, task: &Task);
}
