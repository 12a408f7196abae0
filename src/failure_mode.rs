// src/failure_mode.rs

use std::fmt;
use std::str::FromStr;

use crate::errors::Error;

/// Policy selecting how the scheduler reacts to the first task failure or
/// kill during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Immediately kill all currently running tasks and filter everything
    /// that has not started yet.
    #[default]
    AggressiveFail = 1,
    /// Let running tasks finish naturally, but filter everything that has
    /// not started yet.
    PassiveFail = 2,
    /// Filter only the tasks that (transitively) depend on the failed task;
    /// everything else continues.
    ActiveContinue = 3,
    /// Pretend the failure didn't happen; scheduling proceeds as if the task
    /// had succeeded.
    BlindContinue = 4,
}

impl FailureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureMode::AggressiveFail => "aggressive_fail",
            FailureMode::PassiveFail => "passive_fail",
            FailureMode::ActiveContinue => "active_continue",
            FailureMode::BlindContinue => "blind_continue",
        }
    }
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aggressive_fail" => Ok(FailureMode::AggressiveFail),
            "passive_fail" => Ok(FailureMode::PassiveFail),
            "active_continue" => Ok(FailureMode::ActiveContinue),
            "blind_continue" => Ok(FailureMode::BlindContinue),
            _ => Err(Error::InvalidFailureMode(s.to_string())),
        }
    }
}

impl TryFrom<u32> for FailureMode {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(FailureMode::AggressiveFail),
            2 => Ok(FailureMode::PassiveFail),
            3 => Ok(FailureMode::ActiveContinue),
            4 => Ok(FailureMode::BlindContinue),
            _ => Err(Error::InvalidFailureMode(value.to_string())),
        }
    }
}
