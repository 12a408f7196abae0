// src/condition/file_modification.rs

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::condition::Condition;

/// Make-style up-to-date check over input and output file lists.
///
/// The task runs if any output is missing, any input is missing, or any
/// input is at least as new as the oldest output.
#[derive(Default)]
pub struct FileModificationCondition {
    inputs: Vec<PathBuf>,
    outputs: Vec<PathBuf>,
}

impl FileModificationCondition {
    pub fn new<I, O, P, Q>(inputs: I, outputs: O) -> Self
    where
        I: IntoIterator<Item = P>,
        O: IntoIterator<Item = Q>,
        P: Into<PathBuf>,
        Q: Into<PathBuf>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            outputs: outputs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn add_input(&mut self, path: impl Into<PathBuf>) {
        self.inputs.push(path.into());
    }

    pub fn add_output(&mut self, path: impl Into<PathBuf>) {
        self.outputs.push(path.into());
    }
}

fn mtime(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

impl Condition for FileModificationCondition {
    fn check(&self) -> bool {
        // oldest output modification time; missing output means run
        let mut oldest: Option<SystemTime> = None;
        for output in &self.outputs {
            let Some(time) = mtime(output) else {
                debug!(output = %output.display(), "output missing; task must run");
                return true;
            };
            if oldest.is_none_or(|t| time < t) {
                oldest = Some(time);
            }
        }

        for input in &self.inputs {
            let Some(time) = mtime(input) else {
                debug!(input = %input.display(), "input missing; task must run");
                return true;
            };
            if oldest.is_some_and(|t| time >= t) {
                debug!(input = %input.display(), "input newer than outputs; task must run");
                return true;
            }
        }

        false
    }
}
