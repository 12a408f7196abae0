// src/manager/signal.rs

//! SIGINT/SIGTERM handling for a running task set.
//!
//! A single Ctrl-C prints a notice; a second one within three seconds, or a
//! SIGTERM, terminates the run: every running task is killed and everything
//! pending is condemned, after which the dispatch loop drains normally.
//! Handlers are registered only while a run is in flight and unregistered
//! when the listener is dropped.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use tracing::{debug, warn};

use crate::errors::Result;
use crate::manager::Monitor;

/// Double-press detection for SIGINT.
///
/// Pure state so the timing logic is testable without raising signals.
pub(crate) struct InterruptGuard {
    window: Duration,
    last: Option<Instant>,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum InterruptAction {
    /// First press (or a press outside the window): warn only.
    Notice,
    /// Second press within the window: terminate the run.
    Escalate,
}

impl InterruptGuard {
    pub(crate) fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    pub(crate) fn register(&mut self, now: Instant) -> InterruptAction {
        let action = match self.last {
            Some(prev) if now.duration_since(prev) <= self.window => InterruptAction::Escalate,
            _ => InterruptAction::Notice,
        };
        self.last = Some(now);
        action
    }
}

/// Owns the signal-iterator thread for the duration of one run.
pub(crate) struct SignalListener {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl SignalListener {
    pub(crate) fn install(monitor: Arc<Monitor>) -> Result<Self> {
        let mut signals = Signals::new([SIGINT, SIGTERM])?;
        let handle = signals.handle();
        let owner = std::process::id();

        let thread = thread::Builder::new()
            .name("dagrun-signals".to_string())
            .spawn(move || {
                let mut guard = InterruptGuard::new(Duration::from_secs(3));
                let mut escalated = false;
                for signal in signals.forever() {
                    // a forked child inherits this thread's registration;
                    // it must not try to drive the parent's scheduler
                    if std::process::id() != owner {
                        std::process::exit(255);
                    }
                    let escalate = match signal {
                        SIGINT => match guard.register(Instant::now()) {
                            InterruptAction::Notice => {
                                warn!("interrupt received; press Ctrl-C again within 3 seconds to terminate");
                                eprintln!(
                                    "\nInterrupt. Press Ctrl-C again within 3 seconds to terminate all tasks."
                                );
                                false
                            }
                            InterruptAction::Escalate => true,
                        },
                        SIGTERM => true,
                        _ => false,
                    };
                    if escalate && !escalated {
                        escalated = true;
                        let monitor = Arc::clone(&monitor);
                        // terminate on its own thread so signal delivery
                        // stays responsive while executors wind down
                        let _ = thread::Builder::new()
                            .name("dagrun-terminate".to_string())
                            .spawn(move || {
                                let mut engine = monitor.lock();
                                engine.terminate();
                                monitor.cond.notify_all();
                            });
                    }
                }
            })?;

        debug!("signal listener installed");
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }
}

impl Drop for SignalListener {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        debug!("signal listener removed");
    }
}
