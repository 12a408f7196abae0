// src/manager/mod.rs

//! The task manager: registration, the dispatch loop, and run control.
//!
//! Scheduling follows a monitor discipline. One mutex guards the whole
//! [`Engine`]; the dispatch loop and every worker thread take that lock to
//! move tasks between pools, and a condition variable wakes the loop when a
//! worker finishes or a readiness signal arrives. There is no polling: the
//! loop sleeps until state actually changes.

mod engine;
mod signal;

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;

use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::errors::{Error, Result, TaskError};
use crate::failure_mode::FailureMode;
use crate::observer::Observer;
use crate::resource::ResourceManager;
use crate::task::{Task, TaskId, TaskOutcome, TaskSpec};

use engine::Engine;
use signal::SignalListener;

/// The engine plus the condition variable that wakes the dispatch loop.
pub(crate) struct Monitor {
    state: Mutex<Engine>,
    pub(crate) cond: Condvar,
}

impl Monitor {
    pub(crate) fn lock(&self) -> MutexGuard<'_, Engine> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, Engine>) -> MutexGuard<'a, Engine> {
        self.cond.wait(guard).unwrap_or_else(|e| e.into_inner())
    }
}

/// Configuration for a [`TaskManager`].
pub struct TaskManagerOptions {
    /// Resources constraining concurrent execution. `None` means unlimited.
    pub resource_manager: Option<ResourceManager>,
    pub observers: Vec<Arc<dyn Observer>>,
    /// What happens to the rest of the graph when a task fails.
    pub failure_mode: FailureMode,
    /// Number of distinct priority values tasks may use (`0..levels`).
    /// Must be at least 1.
    pub priority_levels: usize,
}

impl Default for TaskManagerOptions {
    fn default() -> Self {
        Self {
            resource_manager: None,
            observers: Vec::new(),
            failure_mode: FailureMode::default(),
            priority_levels: 16,
        }
    }
}

/// Executes a dependency graph of tasks under resource constraints.
///
/// Register tasks with [`add_task`](Self::add_task), connect them with
/// [`add_dependency`](Self::add_dependency), then call
/// [`run_tasks`](Self::run_tasks). Each dispatched task executes on its own
/// thread; the manager thread runs the dispatch loop.
pub struct TaskManager {
    monitor: Arc<Monitor>,
}

impl TaskManager {
    pub fn new(options: TaskManagerOptions) -> Result<Self> {
        if options.priority_levels == 0 {
            return Err(Error::InvalidPriorityLevels);
        }
        Ok(Self {
            monitor: Arc::new(Monitor {
                state: Mutex::new(Engine::new(
                    options.resource_manager,
                    options.observers,
                    options.failure_mode,
                    options.priority_levels,
                )),
                cond: Condvar::new(),
            }),
        })
    }

    /// Register a task. Fails fast on a priority outside the manager's
    /// levels or a resource request no resource could ever satisfy.
    pub fn add_task(&mut self, spec: TaskSpec) -> Result<TaskId> {
        let mut engine = self.monitor.lock();
        if engine.running_flag {
            return Err(Error::AlreadyRunning);
        }
        if spec.priority >= engine.priority_levels() {
            return Err(Error::PriorityOutOfRange {
                task: spec.name,
                priority: spec.priority,
                levels: engine.priority_levels(),
            });
        }
        let task = Task::from_spec(spec);
        if let Some(rm) = engine.resources.as_ref() {
            rm.validate(&task)?;
        }
        let id = engine.graph.add_task(task);
        engine.waiting.push(id);
        engine.notify(id, |obs, task| obs.task_added(task));
        debug!(task = %engine.graph.task(id).name(), "task added");
        Ok(id)
    }

    /// Declare that `task` must not start until `dependency` has reached a
    /// terminal state.
    pub fn add_dependency(&mut self, task: TaskId, dependency: TaskId) -> Result<()> {
        let mut engine = self.monitor.lock();
        if engine.running_flag {
            return Err(Error::AlreadyRunning);
        }
        engine.graph.add_dependency(task, dependency)
    }

    pub fn add_observer(&mut self, observer: Arc<dyn Observer>) {
        self.monitor.lock().observers.push(observer);
    }

    /// Look a task up by name. With duplicate names the first registered
    /// wins.
    pub fn find_task(&self, name: &str) -> Option<TaskId> {
        self.monitor.lock().graph.find(name)
    }

    /// The task's terminal state, or `None` if it has not finished (or was
    /// filtered out by a failure cascade).
    pub fn outcome(&self, id: TaskId) -> Option<TaskOutcome> {
        self.monitor.lock().graph.task(id).outcome().cloned()
    }

    pub fn task_count(&self) -> usize {
        self.monitor.lock().graph.len()
    }

    /// Shuffle the registration order of waiting tasks. Dependencies still
    /// hold; this only perturbs the order in which equal-standing tasks
    /// reach their ready queues.
    pub fn randomize(&mut self) {
        let mut engine = self.monitor.lock();
        if engine.running_flag {
            return;
        }
        engine.waiting.shuffle(&mut rand::rng());
    }

    /// Run every task to a terminal state.
    ///
    /// Returns `Ok(true)` iff no task failed or was killed. Configuration
    /// errors surface as `Err`; task failures do not, they are reported
    /// through observers and the boolean.
    pub fn run_tasks(&mut self) -> Result<bool> {
        {
            let mut engine = self.monitor.lock();
            if engine.running_flag {
                return Err(Error::AlreadyRunning);
            }
            engine.reset_for_run();
            info!(tasks = engine.graph.len(), "run starting");
            engine.probe_ready();
            for observer in engine.observers.clone() {
                observer.run_starting();
            }
        }

        let signals = SignalListener::install(Arc::clone(&self.monitor))?;

        loop {
            let mut engine = self.monitor.lock();
            if engine.idle() {
                break;
            }
            let Some(next) = engine.next_ready() else {
                drop(self.monitor.wait(engine));
                continue;
            };

            let bypass = engine.evaluate_bypass(next);
            if !bypass {
                match engine.try_admit(next) {
                    Ok(true) => {}
                    Ok(false) => {
                        // insufficient resources; sleep until something
                        // finishes
                        drop(self.monitor.wait(engine));
                        continue;
                    }
                    // requests are validated at add_task, so only a custom
                    // resource erring at dispatch time lands here; leave
                    // the manager usable
                    Err(e) => {
                        engine.running_flag = false;
                        return Err(e);
                    }
                }
            }

            if bypass {
                engine.finish_bypassed(next);
                continue;
            }

            engine.start_running(next);
            let executor = Arc::clone(&engine.graph.task(next).executor);
            let name = engine.graph.task(next).name().to_string();
            drop(engine);

            let monitor = Arc::clone(&self.monitor);
            let spawned = thread::Builder::new().name(name).spawn(move || {
                let result = executor.execute();
                let mut engine = monitor.lock();
                engine.complete(next, result);
                monitor.cond.notify_all();
            });
            if let Err(e) = spawned {
                let mut engine = self.monitor.lock();
                engine.complete(
                    next,
                    Err(TaskError::Message(format!("failed to spawn task thread: {e}"))),
                );
            }
        }

        drop(signals);

        let mut engine = self.monitor.lock();
        engine.running_flag = false;
        let ok = !engine.failed;
        info!(ok, "run complete");
        for observer in engine.observers.clone() {
            observer.run_complete();
        }
        drop(engine);
        Ok(ok)
    }
}
