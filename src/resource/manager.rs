// src/resource/manager.rs

use tracing::debug;

use crate::errors::Result;
use crate::resource::Resource;
use crate::task::Task;

/// An ordered collection of resources with all-or-nothing admission.
///
/// Membership is fixed once the run starts. `start` is check-then-commit:
/// the caller (the scheduler) holds its lock across the whole call, so no
/// other task can interleave between the check and the commit.
#[derive(Default)]
pub struct ResourceManager {
    resources: Vec<Box<dyn Resource>>,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`add`](Self::add).
    pub fn with(mut self, resource: impl Resource + 'static) -> Self {
        self.add(resource);
        self
    }

    pub fn add(&mut self, resource: impl Resource + 'static) {
        self.resources.push(Box::new(resource));
    }

    /// Non-mutating check of every resource.
    pub fn can_start(&self, task: &Task) -> Result<bool> {
        for resource in &self.resources {
            if !resource.can_use(task)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Two-phase admission: check every resource, then commit every
    /// resource, or touch nothing at all.
    pub fn start(&mut self, task: &Task) -> Result<bool> {
        if !self.can_start(task)? {
            debug!(task = %task.name(), "insufficient resources; task must wait");
            return Ok(false);
        }
        for resource in &mut self.resources {
            let claimed = resource.acquire(task)?;
            // can_start passed and the scheduler lock is held, so the
            // commit cannot be refused
            debug_assert!(claimed);
        }
        Ok(true)
    }

    /// Give back everything the task held.
    pub fn done(&mut self, task: &Task) {
        for resource in &mut self.resources {
            resource.release(task);
        }
    }

    /// Surface over-total requests at task-registration time rather than at
    /// dispatch. Resolves defaults the same way admission does.
    pub(crate) fn validate(&self, task: &Task) -> Result<()> {
        for resource in &self.resources {
            resource.can_use(task)?;
        }
        Ok(())
    }
}
