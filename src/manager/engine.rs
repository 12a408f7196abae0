// src/manager/engine.rs

//! The scheduler state machine.
//!
//! Every task lives in exactly one pool: WAITING (unfinished dependencies),
//! READY (one FIFO queue per priority level), RUNNING, or FILTERED. The
//! whole state machine is guarded by one mutex owned by the
//! [`Monitor`](super::Monitor); every method here assumes that lock is held.
//! Worker threads never touch this state directly, they hand their result to
//! [`complete`](Engine::complete) and wake the dispatch loop.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::errors::{Result, TaskError};
use crate::failure_mode::FailureMode;
use crate::graph::TaskGraph;
use crate::observer::Observer;
use crate::resource::ResourceManager;
use crate::task::{Task, TaskId, TaskOutcome};

/// Why a task did not complete successfully.
enum Fault {
    Failed(TaskError),
    Killed,
}

pub(crate) struct Engine {
    pub(crate) graph: TaskGraph,
    pub(crate) waiting: Vec<TaskId>,
    /// FIFO queue per priority level; higher index is served first.
    ready: Vec<VecDeque<TaskId>>,
    running: Vec<TaskId>,
    /// Tasks condemned by a failure cascade. Consumed on sight: when a
    /// filtered task's last dependency finishes, the readiness signal drops
    /// it from this pool instead of enqueueing it.
    filtered: Vec<TaskId>,
    pub(crate) resources: Option<ResourceManager>,
    pub(crate) observers: Vec<Arc<dyn Observer>>,
    failure_mode: FailureMode,
    pub(crate) running_flag: bool,
    pub(crate) failed: bool,
    /// A kill sweep happens at most once per run.
    kill_issued: bool,
}

impl Engine {
    pub(crate) fn new(
        resources: Option<ResourceManager>,
        observers: Vec<Arc<dyn Observer>>,
        failure_mode: FailureMode,
        priority_levels: usize,
    ) -> Self {
        Self {
            graph: TaskGraph::new(),
            waiting: Vec::new(),
            ready: (0..priority_levels).map(|_| VecDeque::new()).collect(),
            running: Vec::new(),
            filtered: Vec::new(),
            resources,
            observers,
            failure_mode,
            running_flag: false,
            failed: false,
            kill_issued: false,
        }
    }

    pub(crate) fn priority_levels(&self) -> usize {
        self.ready.len()
    }

    /// Arm the engine for a fresh run.
    pub(crate) fn reset_for_run(&mut self) {
        self.running_flag = true;
        self.failed = false;
        self.kill_issued = false;
    }

    /// Move every dependency-free waiting task into its ready queue. Called
    /// once at the start of a run to seed the root tasks.
    pub(crate) fn probe_ready(&mut self) {
        let roots: Vec<TaskId> = self
            .waiting
            .iter()
            .copied()
            .filter(|&id| self.graph.task(id).ready())
            .collect();
        debug!(roots = roots.len(), "seeding root tasks");
        for id in roots {
            self.task_ready(id);
        }
    }

    /// A task's last dependency just finished. Filtered tasks are consumed
    /// here; everything else moves from WAITING to its READY queue.
    fn task_ready(&mut self, id: TaskId) {
        if let Some(pos) = self.filtered.iter().position(|&t| t == id) {
            self.filtered.swap_remove(pos);
            trace!(task = %self.graph.task(id).name(), "filtered task dropped");
            return;
        }
        let pos = self
            .waiting
            .iter()
            .position(|&t| t == id)
            .unwrap_or_else(|| unreachable!("ready signal for a task not waiting"));
        self.waiting.swap_remove(pos);
        let priority = self.graph.task(id).priority();
        self.ready[priority].push_back(id);
        trace!(task = %self.graph.task(id).name(), priority, "task ready");
    }

    /// Head of the highest non-empty priority queue.
    pub(crate) fn next_ready(&self) -> Option<TaskId> {
        self.ready
            .iter()
            .rev()
            .find_map(|queue| queue.front().copied())
    }

    /// All pools that feed the dispatch loop are drained. FILTERED tasks may
    /// remain; they have nothing left to wait for.
    pub(crate) fn idle(&self) -> bool {
        self.waiting.is_empty()
            && self.running.is_empty()
            && self.ready.iter().all(VecDeque::is_empty)
    }

    pub(crate) fn evaluate_bypass(&mut self, id: TaskId) -> bool {
        self.graph.task_mut(id).evaluate_bypass()
    }

    /// Ask the resource manager to admit the task. All-or-nothing; on a
    /// refusal nothing is claimed and the task stays at the head of its
    /// queue.
    pub(crate) fn try_admit(&mut self, id: TaskId) -> Result<bool> {
        let Engine { graph, resources, .. } = self;
        match resources {
            Some(rm) => rm.start(graph.task(id)),
            None => Ok(true),
        }
    }

    /// Move the task from READY to RUNNING and announce the start.
    pub(crate) fn start_running(&mut self, id: TaskId) {
        self.remove_ready(id);
        self.running.push(id);
        info!(task = %self.graph.task(id).name(), "task started");
        self.notify(id, |obs, task| obs.task_started(task));
    }

    /// The task's conditions report its work is already satisfied: record
    /// the outcome and release its dependents without executing anything.
    /// Bypassed tasks never claim resources, so none are returned.
    pub(crate) fn finish_bypassed(&mut self, id: TaskId) {
        self.remove_ready(id);
        info!(task = %self.graph.task(id).name(), "task bypassed");
        self.graph.task_mut(id).outcome = Some(TaskOutcome::Bypassed);
        self.notify(id, |obs, task| obs.task_bypassed(task));
        self.notify_dependents(id);
    }

    fn remove_ready(&mut self, id: TaskId) {
        let priority = self.graph.task(id).priority();
        let pos = self.ready[priority]
            .iter()
            .position(|&t| t == id)
            .unwrap_or_else(|| unreachable!("task not in its ready queue"));
        let _ = self.ready[priority].remove(pos);
    }

    /// A worker thread finished executing. The kill flag wins over whatever
    /// the executor returned: a task killed mid-flight reports as KILLED
    /// even if its executor happened to observe a plain failure.
    pub(crate) fn complete(&mut self, id: TaskId, result: std::result::Result<(), TaskError>) {
        if self.graph.task(id).is_killed() {
            self.fault(id, Fault::Killed);
            return;
        }
        match result {
            Ok(()) => {
                info!(task = %self.graph.task(id).name(), "task completed");
                self.graph.task_mut(id).outcome = Some(TaskOutcome::Completed);
                self.notify(id, |obs, task| obs.task_completed(task));
                self.task_done(id);
            }
            Err(error) => self.fault(id, Fault::Failed(error)),
        }
    }

    /// Apply the failure mode, tell the observers, and retire the task.
    fn fault(&mut self, id: TaskId, fault: Fault) {
        self.failed = true;
        warn!(
            task = %self.graph.task(id).name(),
            mode = %self.failure_mode,
            "task did not complete"
        );

        match self.failure_mode {
            FailureMode::AggressiveFail => {
                // a killed task must not re-trigger the sweep that killed it
                if matches!(fault, Fault::Failed(_)) {
                    self.kill_running_except(Some(id));
                }
                self.filter_pending();
            }
            FailureMode::PassiveFail => self.filter_pending(),
            FailureMode::ActiveContinue => self.filter_dependents(id),
            FailureMode::BlindContinue => {}
        }

        match fault {
            Fault::Failed(error) => {
                self.graph.task_mut(id).outcome = Some(TaskOutcome::Failed(error.clone()));
                self.notify(id, |obs, task| obs.task_failed(task, &error));
            }
            Fault::Killed => {
                self.graph.task_mut(id).outcome = Some(TaskOutcome::Killed);
                self.notify(id, |obs, task| obs.task_killed(task));
            }
        }
        self.task_done(id);
    }

    /// Remove the task from RUNNING, return its resources, and signal its
    /// dependents. Dependents are signalled for every terminal state, so
    /// dependency bookkeeping keeps moving even through failures.
    fn task_done(&mut self, id: TaskId) {
        let pos = self
            .running
            .iter()
            .position(|&t| t == id)
            .unwrap_or_else(|| unreachable!("finished task not in running pool"));
        self.running.swap_remove(pos);
        if !self.graph.task(id).is_bypassed() {
            let Engine { graph, resources, .. } = self;
            if let Some(rm) = resources {
                rm.done(graph.task(id));
            }
        }
        self.notify_dependents(id);
    }

    fn notify_dependents(&mut self, id: TaskId) {
        let dependents = self.graph.task(id).dependents.clone();
        for dep in dependents {
            let node = self.graph.task_mut(dep);
            node.dependencies.retain(|&d| d != id);
            if node.ready() {
                self.task_ready(dep);
            }
        }
    }

    /// Kill every running task except `spare`. Idempotent across the run:
    /// the second caller (for instance a signal arriving during an
    /// aggressive sweep) finds nothing to do.
    fn kill_running_except(&mut self, spare: Option<TaskId>) {
        if self.kill_issued {
            return;
        }
        self.kill_issued = true;
        let victims: Vec<TaskId> = self
            .running
            .iter()
            .copied()
            .filter(|&t| Some(t) != spare)
            .collect();
        for victim in victims {
            let executor = Arc::clone(&self.graph.task(victim).executor);
            if executor.kill() {
                debug!(task = %self.graph.task(victim).name(), "task killed");
                self.graph.task_mut(victim).killed = true;
            }
        }
    }

    /// Condemn everything that has not started: WAITING and all READY
    /// queues drain into FILTERED.
    fn filter_pending(&mut self) {
        let filtered = self.waiting.len() + self.ready.iter().map(VecDeque::len).sum::<usize>();
        if filtered > 0 {
            debug!(count = filtered, "filtering all pending tasks");
        }
        self.filtered.append(&mut self.waiting);
        for queue in &mut self.ready {
            self.filtered.extend(queue.drain(..));
        }
    }

    /// Condemn the transitive dependents of a failed task, leaving
    /// independent work untouched. Dependents of a still-waiting task are
    /// themselves waiting, so only the WAITING pool is searched.
    fn filter_dependents(&mut self, id: TaskId) {
        let mut visit: Vec<TaskId> = self.graph.task(id).dependents.clone();
        let mut visited: HashSet<TaskId> = HashSet::new();
        while let Some(curr) = visit.pop() {
            if !visited.insert(curr) {
                continue;
            }
            debug_assert!(!self.running.contains(&curr));
            debug_assert!(self.ready.iter().all(|q| !q.contains(&curr)));
            visit.extend(self.graph.task(curr).dependents.iter().copied());
            if let Some(pos) = self.waiting.iter().position(|&t| t == curr) {
                self.waiting.swap_remove(pos);
                debug!(task = %self.graph.task(curr).name(), "dependent filtered");
                self.filtered.push(curr);
            }
        }
    }

    /// External termination request: stop everything running and condemn
    /// everything pending, regardless of failure mode.
    pub(crate) fn terminate(&mut self) {
        warn!("terminating all tasks");
        self.failed = true;
        self.kill_running_except(None);
        self.filter_pending();
    }

    /// Run one observer callback for a task. Split borrow so the callback
    /// sees the task while the observer list is iterated.
    pub(crate) fn notify(&mut self, id: TaskId, f: impl Fn(&dyn Observer, &Task)) {
        let Engine { graph, observers, .. } = self;
        let task = graph.task(id);
        for observer in observers.iter() {
            f(observer.as_ref(), task);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskSpec;

    fn engine(mode: FailureMode) -> Engine {
        Engine::new(None, Vec::new(), mode, 4)
    }

    fn add(engine: &mut Engine, name: &str, priority: usize) -> TaskId {
        let id = engine
            .graph
            .add_task(Task::from_spec(TaskSpec::nop(name).priority(priority)));
        engine.waiting.push(id);
        id
    }

    #[test]
    fn probe_seeds_only_roots() {
        let mut eng = engine(FailureMode::AggressiveFail);
        let a = add(&mut eng, "a", 0);
        let b = add(&mut eng, "b", 0);
        eng.graph.add_dependency(b, a).unwrap();
        eng.probe_ready();
        assert_eq!(eng.next_ready(), Some(a));
        assert_eq!(eng.waiting, vec![b]);
    }

    #[test]
    fn higher_priority_is_served_first() {
        let mut eng = engine(FailureMode::AggressiveFail);
        let low = add(&mut eng, "low", 0);
        let high = add(&mut eng, "high", 3);
        eng.probe_ready();
        assert_eq!(eng.next_ready(), Some(high));
        eng.start_running(high);
        assert_eq!(eng.next_ready(), Some(low));
        eng.complete(high, Ok(()));
        assert!(!eng.idle());
        eng.start_running(low);
        eng.complete(low, Ok(()));
        assert!(eng.idle());
    }

    #[test]
    fn completion_releases_dependents() {
        let mut eng = engine(FailureMode::AggressiveFail);
        let a = add(&mut eng, "a", 0);
        let b = add(&mut eng, "b", 0);
        eng.graph.add_dependency(b, a).unwrap();
        eng.probe_ready();
        eng.start_running(a);
        assert_eq!(eng.next_ready(), None);
        eng.complete(a, Ok(()));
        assert_eq!(eng.next_ready(), Some(b));
        assert_eq!(eng.graph.task(a).outcome(), Some(&TaskOutcome::Completed));
    }

    #[test]
    fn passive_fail_filters_pending_but_spares_running() {
        let mut eng = engine(FailureMode::PassiveFail);
        let bad = add(&mut eng, "bad", 0);
        let other = add(&mut eng, "other", 0);
        let late = add(&mut eng, "late", 0);
        eng.graph.add_dependency(late, other).unwrap();
        eng.probe_ready();
        eng.start_running(bad);
        eng.start_running(other);
        eng.complete(bad, Err(TaskError::ExitCode(1)));
        assert!(eng.failed);
        // `other` keeps running; `late` was condemned and is consumed when
        // its dependency finishes
        assert!(!eng.graph.task(other).is_killed());
        eng.complete(other, Ok(()));
        assert!(eng.idle());
        assert!(eng.graph.task(late).outcome().is_none());
    }

    #[test]
    fn active_continue_filters_only_the_dependent_closure() {
        let mut eng = engine(FailureMode::ActiveContinue);
        let bad = add(&mut eng, "bad", 0);
        let child = add(&mut eng, "child", 0);
        let grandchild = add(&mut eng, "grandchild", 0);
        let separate = add(&mut eng, "separate", 0);
        eng.graph.add_dependency(child, bad).unwrap();
        eng.graph.add_dependency(grandchild, child).unwrap();
        eng.probe_ready();
        eng.start_running(bad);
        eng.complete(bad, Err(TaskError::ExitCode(1)));
        // the independent task is untouched and still dispatchable
        assert_eq!(eng.next_ready(), Some(separate));
        eng.start_running(separate);
        eng.complete(separate, Ok(()));
        assert!(eng.idle());
        assert_eq!(eng.graph.task(separate).outcome(), Some(&TaskOutcome::Completed));
        assert!(eng.graph.task(child).outcome().is_none());
        assert!(eng.graph.task(grandchild).outcome().is_none());
    }

    #[test]
    fn active_continue_filters_a_diamond_exactly_once() {
        let mut eng = engine(FailureMode::ActiveContinue);
        let bad = add(&mut eng, "bad", 0);
        let left = add(&mut eng, "left", 0);
        let right = add(&mut eng, "right", 0);
        let join = add(&mut eng, "join", 0);
        eng.graph.add_dependency(left, bad).unwrap();
        eng.graph.add_dependency(right, bad).unwrap();
        eng.graph.add_dependency(join, left).unwrap();
        eng.graph.add_dependency(join, right).unwrap();
        eng.probe_ready();
        eng.start_running(bad);
        eng.complete(bad, Err(TaskError::ExitCode(1)));
        // the join point is reachable through both children but must be
        // condemned only once
        assert_eq!(eng.filtered.len(), 3);
        assert!(eng.idle());
        for id in [left, right, join] {
            assert!(eng.graph.task(id).outcome().is_none());
        }
    }

    #[test]
    fn blind_continue_filters_nothing() {
        let mut eng = engine(FailureMode::BlindContinue);
        let bad = add(&mut eng, "bad", 0);
        let next = add(&mut eng, "next", 0);
        eng.graph.add_dependency(next, bad).unwrap();
        eng.probe_ready();
        eng.start_running(bad);
        eng.complete(bad, Err(TaskError::ExitCode(1)));
        // the dependent still becomes ready despite the failure
        assert_eq!(eng.next_ready(), Some(next));
        assert!(eng.failed);
    }

    #[test]
    fn killed_flag_wins_over_the_execution_result() {
        let mut eng = engine(FailureMode::BlindContinue);
        let victim = add(&mut eng, "victim", 0);
        eng.probe_ready();
        eng.start_running(victim);
        eng.graph.task_mut(victim).killed = true;
        eng.complete(victim, Ok(()));
        assert_eq!(eng.graph.task(victim).outcome(), Some(&TaskOutcome::Killed));
    }

    #[test]
    fn terminate_stops_and_condemns_everything() {
        let mut eng = engine(FailureMode::BlindContinue);
        let running = add(&mut eng, "running", 0);
        let pending = add(&mut eng, "pending", 0);
        let blocked = add(&mut eng, "blocked", 0);
        eng.graph.add_dependency(blocked, running).unwrap();
        eng.probe_ready();
        eng.start_running(running);
        eng.terminate();
        assert!(eng.failed);
        assert!(eng.graph.task(running).is_killed());
        assert!(eng.graph.task(pending).outcome().is_none());
        eng.complete(running, Err(TaskError::Signaled));
        assert!(eng.idle());
        assert_eq!(eng.graph.task(running).outcome(), Some(&TaskOutcome::Killed));
    }
}
