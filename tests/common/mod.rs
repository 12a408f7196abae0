// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use dagrun::{Executor, Observer, Task, TaskError};

/// Records every lifecycle event as a tagged string, in the order the
/// scheduler emitted them: `@` added, `+` started, `-` completed, `*`
/// bypassed, `!` failed, `$` killed.
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<String>>,
}

impl EventLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, tag: char, name: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("{tag}{name}"));
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn occurred(&self, event: &str) -> bool {
        self.events.lock().unwrap().iter().any(|e| e == event)
    }

    pub fn count(&self, event: &str) -> usize {
        self.events.lock().unwrap().iter().filter(|e| *e == event).count()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events.lock().unwrap().iter().position(|e| e == event)
    }

    /// True iff both events occurred and `first` came before `second`.
    pub fn before(&self, first: &str, second: &str) -> bool {
        match (self.position(first), self.position(second)) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        }
    }
}

impl Observer for EventLog {
    fn task_added(&self, task: &Task) {
        self.push('@', task.name());
    }
    fn task_started(&self, task: &Task) {
        self.push('+', task.name());
    }
    fn task_bypassed(&self, task: &Task) {
        self.push('*', task.name());
    }
    fn task_completed(&self, task: &Task) {
        self.push('-', task.name());
    }
    fn task_failed(&self, task: &Task, _error: &TaskError) {
        self.push('!', task.name());
    }
    fn task_killed(&self, task: &Task) {
        self.push('$', task.name());
    }
}

/// Blocks until killed or until a timeout expires, whichever comes first.
/// A kill wakes it immediately, so kill-path tests stay fast.
pub struct Sleeper {
    limit: Duration,
    state: Mutex<SleepState>,
    cond: Condvar,
}

#[derive(Default)]
struct SleepState {
    killed: bool,
    finished: bool,
}

impl Sleeper {
    pub fn new(limit: Duration) -> Self {
        Self {
            limit,
            state: Mutex::new(SleepState::default()),
            cond: Condvar::new(),
        }
    }
}

impl Executor for Sleeper {
    fn describe(&self) -> String {
        format!("sleep up to {:?}", self.limit)
    }

    fn execute(&self) -> Result<(), TaskError> {
        let mut st = self.state.lock().unwrap();
        let deadline = std::time::Instant::now() + self.limit;
        while !st.killed {
            let now = std::time::Instant::now();
            if now >= deadline {
                break;
            }
            let (guard, _) = self.cond.wait_timeout(st, deadline - now).unwrap();
            st = guard;
        }
        let killed = st.killed;
        st.finished = true;
        drop(st);
        if killed {
            Err(TaskError::Message("stopped".to_string()))
        } else {
            Ok(())
        }
    }

    fn kill(&self) -> bool {
        let mut st = self.state.lock().unwrap();
        if st.finished {
            return false;
        }
        st.killed = true;
        self.cond.notify_all();
        true
    }
}

/// Tracks how many executors are inside `execute` at once.
#[derive(Default)]
pub struct Gauge {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl Gauge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

/// Holds a [`Gauge`] high for a fixed time, then succeeds.
pub struct GaugedExecutor {
    gauge: Arc<Gauge>,
    hold: Duration,
    done: AtomicBool,
}

impl GaugedExecutor {
    pub fn new(gauge: Arc<Gauge>, hold: Duration) -> Self {
        Self {
            gauge,
            hold,
            done: AtomicBool::new(false),
        }
    }
}

impl Executor for GaugedExecutor {
    fn describe(&self) -> String {
        "gauged hold".to_string()
    }

    fn execute(&self) -> Result<(), TaskError> {
        let now = self.gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.gauge.max.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.hold);
        self.gauge.current.fetch_sub(1, Ordering::SeqCst);
        self.done.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn kill(&self) -> bool {
        !self.done.load(Ordering::SeqCst)
    }
}
