// src/task.rs

//! Task nodes and the builder used to register them.

use std::collections::HashMap;
use std::sync::Arc;

use crate::condition::Condition;
use crate::errors::TaskError;
use crate::exec::{Executor, FunctionExecutor, NopExecutor, ProcessExecutor};

/// Opaque handle to a task inside a [`TaskManager`](crate::TaskManager).
///
/// The manager is the sole owner of all task nodes; everything else refers to
/// a task through its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub(crate) usize);

/// Terminal state recorded for a task once it leaves the scheduler.
///
/// Filtered tasks never receive an outcome; they are dropped on sight when
/// their readiness signal arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Bypassed,
    Failed(TaskError),
    Killed,
}

/// One node of the dependency graph.
///
/// Constructed from a [`TaskSpec`] by the manager and mutated only under the
/// scheduler lock.
pub struct Task {
    pub(crate) name: String,
    pub(crate) priority: usize,
    pub(crate) resources: HashMap<String, f64>,
    /// Remaining unfinished dependencies. Entries are removed as ancestors
    /// reach a terminal state; empty means ready.
    pub(crate) dependencies: Vec<TaskId>,
    pub(crate) dependents: Vec<TaskId>,
    pub(crate) conditions: Vec<Box<dyn Condition>>,
    /// Cached bypass decision, evaluated once per run.
    pub(crate) bypass: Option<bool>,
    pub(crate) killed: bool,
    pub(crate) outcome: Option<TaskOutcome>,
    pub(crate) executor: Arc<dyn Executor>,
}

impl Task {
    pub(crate) fn from_spec(spec: TaskSpec) -> Self {
        Self {
            name: spec.name,
            priority: spec.priority,
            resources: spec.resources,
            dependencies: Vec::new(),
            dependents: Vec::new(),
            conditions: spec.conditions,
            bypass: None,
            killed: false,
            outcome: None,
            executor: spec.executor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> usize {
        self.priority
    }

    /// The quantity of the named resource this task declared, if any.
    pub fn resource(&self, name: &str) -> Option<f64> {
        self.resources.get(name).copied()
    }

    /// A human-readable description of the work, delegated to the executor.
    pub fn describe(&self) -> String {
        self.executor.describe()
    }

    pub fn is_killed(&self) -> bool {
        self.killed
    }

    pub fn outcome(&self) -> Option<&TaskOutcome> {
        self.outcome.as_ref()
    }

    /// True iff every dependency has reached a terminal state.
    pub(crate) fn ready(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Decide whether this task's execution should be skipped.
    ///
    /// With no conditions attached a task always runs. Otherwise the default
    /// is to bypass, flipped as soon as one condition reports that the work
    /// is needed; later conditions are not consulted. The decision is cached
    /// so conditions are checked at most once per run.
    pub(crate) fn evaluate_bypass(&mut self) -> bool {
        if let Some(bypass) = self.bypass {
            return bypass;
        }
        let bypass = if self.conditions.is_empty() {
            false
        } else {
            !self.conditions.iter().any(|c| c.check())
        };
        self.bypass = Some(bypass);
        bypass
    }

    pub(crate) fn is_bypassed(&self) -> bool {
        self.bypass == Some(true)
    }
}

/// Builder describing a task to be registered with a manager.
pub struct TaskSpec {
    pub(crate) name: String,
    pub(crate) priority: usize,
    pub(crate) resources: HashMap<String, f64>,
    pub(crate) conditions: Vec<Box<dyn Condition>>,
    pub(crate) executor: Arc<dyn Executor>,
}

impl TaskSpec {
    /// A task backed by an arbitrary executor.
    pub fn with_executor(name: impl Into<String>, executor: Arc<dyn Executor>) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            resources: HashMap::new(),
            conditions: Vec::new(),
            executor,
        }
    }

    /// A task that runs a shell command.
    pub fn process(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self::with_executor(name, Arc::new(ProcessExecutor::new(command)))
    }

    /// A task that runs an in-process closure.
    pub fn function<F>(name: impl Into<String>, func: F) -> Self
    where
        F: FnOnce() -> Result<(), TaskError> + Send + 'static,
    {
        Self::with_executor(name, Arc::new(FunctionExecutor::new(func)))
    }

    /// A task that does nothing; useful as a join point in the graph.
    pub fn nop(name: impl Into<String>) -> Self {
        Self::with_executor(name, Arc::new(NopExecutor::new()))
    }

    /// Scheduling priority; higher is served first. Defaults to 0 and must
    /// be strictly less than the manager's `priority_levels`.
    pub fn priority(mut self, priority: usize) -> Self {
        self.priority = priority;
        self
    }

    /// Declare how much of a named resource this task consumes while
    /// running. Resources not declared here fall back to the resource's
    /// per-task default.
    pub fn resource(mut self, name: impl Into<String>, uses: f64) -> Self {
        self.resources.insert(name.into(), uses);
        self
    }

    /// Attach a bypass condition. Conditions are evaluated in attachment
    /// order.
    pub fn condition(mut self, condition: impl Condition + 'static) -> Self {
        self.conditions.push(Box::new(condition));
        self
    }
}
