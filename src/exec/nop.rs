// src/exec/nop.rs

use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::TaskError;
use crate::exec::Executor;

/// An executor that does nothing; useful as a join/fan-out point in a graph.
#[derive(Default)]
pub struct NopExecutor {
    done: AtomicBool,
}

impl NopExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Executor for NopExecutor {
    fn describe(&self) -> String {
        "nop".to_string()
    }

    fn execute(&self) -> Result<(), TaskError> {
        self.done.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn kill(&self) -> bool {
        // nothing to stop once the (instantaneous) work has happened
        !self.done.load(Ordering::SeqCst)
    }
}
