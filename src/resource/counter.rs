// src/resource/counter.rs

use tracing::trace;

use crate::errors::{Error, Result};
use crate::resource::Resource;
use crate::task::Task;

/// A counter-style resource: `total` units exist, tasks claim some while
/// running and give them back when they finish.
///
/// Quantities are `f64` so fractional units work (e.g. 0.5 CPUs). Repeated
/// claim/release cycles accumulate rounding error, so comparisons and the
/// zero/total saturation points use a small relative tolerance derived from
/// the total.
pub struct CounterResource {
    name: String,
    default: f64,
    total: f64,
    amount: f64,
    tolerance: f64,
}

impl CounterResource {
    pub fn new(name: impl Into<String>, default: f64, total: f64) -> Self {
        Self {
            name: name.into(),
            default,
            total,
            amount: total,
            tolerance: total / 1e6,
        }
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn available(&self) -> f64 {
        self.amount
    }

    pub fn used(&self) -> f64 {
        self.total - self.amount
    }

    /// Resolve how much this task is asking for: its declared amount, or the
    /// resource default if unspecified.
    fn requested(&self, task: &Task) -> f64 {
        task.resource(&self.name).unwrap_or(self.default)
    }

    fn check_request(&self, task: &Task) -> Result<f64> {
        let uses = self.requested(task);
        if uses - self.total > self.tolerance {
            return Err(Error::ResourceExceedsTotal {
                task: task.name().to_string(),
                resource: self.name.clone(),
                uses,
                total: self.total,
            });
        }
        Ok(uses)
    }
}

impl Resource for CounterResource {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_uses(&self) -> f64 {
        self.default
    }

    fn can_use(&self, task: &Task) -> Result<bool> {
        let uses = self.check_request(task)?;
        Ok(self.amount - uses > -self.tolerance)
    }

    fn acquire(&mut self, task: &Task) -> Result<bool> {
        let uses = self.check_request(task)?;
        if self.amount - uses <= -self.tolerance {
            return Ok(false);
        }
        self.amount -= uses;
        // saturate at zero within tolerance
        if self.amount < 0.0 {
            debug_assert!(self.amount.abs() < self.tolerance);
            self.amount = 0.0;
        }
        trace!(
            resource = %self.name,
            task = %task.name(),
            uses,
            available = self.amount,
            "resource acquired"
        );
        Ok(true)
    }

    fn release(&mut self, task: &Task) {
        let uses = self.requested(task);
        self.amount += uses;
        // saturate at total within tolerance
        if self.amount > self.total {
            debug_assert!((self.amount - self.total).abs() < self.tolerance);
            self.amount = self.total;
        }
        trace!(
            resource = %self.name,
            task = %task.name(),
            uses,
            available = self.amount,
            "resource released"
        );
    }
}
