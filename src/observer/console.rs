// src/observer/console.rs

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use owo_colors::{OwoColorize, Stream};

use crate::errors::TaskError;
use crate::observer::Observer;
use crate::task::Task;

/// How much a [`ConsoleObserver`] prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Nothing at all.
    None,
    /// Only failures and kills.
    Failure,
    /// Starts plus failures and kills.
    Start,
    /// Completions, bypasses, failures, and kills.
    Complete,
    /// Everything, including a progress line after each finished task.
    All,
}

/// Prints task lifecycle events to stdout, colored when stdout is a
/// terminal.
///
/// Failures always include the task description; other events include it
/// only when `with_descriptions` is set. After each finished task an
/// estimated time to completion is derived from the observed finish rate.
pub struct ConsoleObserver {
    verbosity: Verbosity,
    descriptions: bool,
    summary: bool,
    timing: bool,
    state: Mutex<Counters>,
}

#[derive(Default)]
struct Counters {
    total: usize,
    finished: usize,
    successful: usize,
    bypassed: usize,
    failed: usize,
    killed: usize,
    started_at: HashMap<String, Instant>,
    run_start: Option<Instant>,
}

impl Default for ConsoleObserver {
    fn default() -> Self {
        Self::new(Verbosity::All)
    }
}

impl ConsoleObserver {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            descriptions: false,
            summary: true,
            timing: true,
            state: Mutex::new(Counters::default()),
        }
    }

    /// Include each task's description in start/finish lines. Failures show
    /// the description regardless.
    pub fn with_descriptions(mut self, yes: bool) -> Self {
        self.descriptions = yes;
        self
    }

    /// Print a summary block when the run completes.
    pub fn with_summary(mut self, yes: bool) -> Self {
        self.summary = yes;
        self
    }

    /// Measure per-task elapsed time and estimate time to completion.
    pub fn with_timing(mut self, yes: bool) -> Self {
        self.timing = yes;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn elapsed(&self, st: &mut Counters, task: &Task) -> Option<Duration> {
        if !self.timing {
            return None;
        }
        st.started_at.remove(task.name()).map(|t| t.elapsed())
    }

    fn progress(&self, st: &Counters) {
        if self.verbosity < Verbosity::All || st.total == 0 {
            return;
        }
        let mut text = format!(
            "[Progress: {:3.2}% {}/{}",
            st.finished as f64 / st.total as f64 * 100.0,
            st.finished,
            st.total
        );
        if self.timing
            && let Some(start) = st.run_start
        {
            let run_time = start.elapsed().as_secs_f64();
            if run_time > 0.0 && st.finished > 0 {
                let rate = st.finished as f64 / run_time;
                let remaining = (st.total - st.finished) as f64 / rate;
                text += &format!(" {}", time_string(Duration::from_secs_f64(remaining)));
            }
        }
        text += "]";
        println!("{}", text.if_supports_color(Stream::Stdout, |t| t.magenta()));
    }
}

impl Observer for ConsoleObserver {
    fn run_starting(&self) {
        self.lock().run_start = Some(Instant::now());
    }

    fn run_complete(&self) {
        if !self.summary || self.verbosity < Verbosity::Complete {
            return;
        }
        let st = self.lock();
        println!("\nTask Summary:");
        println!("  Total      : {}", st.total);
        println!(
            "  Successful : {}",
            st.successful.if_supports_color(Stream::Stdout, |t| t.green())
        );
        println!(
            "  Bypassed   : {}",
            st.bypassed.if_supports_color(Stream::Stdout, |t| t.yellow())
        );
        println!(
            "  Failed     : {}",
            st.failed.if_supports_color(Stream::Stdout, |t| t.red())
        );
        println!(
            "  Killed     : {}",
            st.killed.if_supports_color(Stream::Stdout, |t| t.red())
        );
    }

    fn task_added(&self, _task: &Task) {
        self.lock().total += 1;
    }

    fn task_started(&self, task: &Task) {
        let mut st = self.lock();
        if self.timing {
            st.started_at.insert(task.name().to_string(), Instant::now());
        }
        if self.verbosity == Verbosity::Start || self.verbosity == Verbosity::All {
            let mut text = format!("[Started: {}]", task.name());
            if self.descriptions {
                text += &format!(" {}", task.describe());
            }
            println!("{text}");
        }
    }

    fn task_bypassed(&self, task: &Task) {
        let mut st = self.lock();
        st.finished += 1;
        st.bypassed += 1;
        if self.verbosity >= Verbosity::Complete {
            let mut text = format!("[Bypassed: {}]", task.name());
            if self.descriptions {
                text += &format!(" {}", task.describe());
            }
            println!("{}", text.if_supports_color(Stream::Stdout, |t| t.yellow()));
        }
        self.progress(&st);
    }

    fn task_completed(&self, task: &Task) {
        let mut st = self.lock();
        let elapsed = self.elapsed(&mut st, task);
        st.finished += 1;
        st.successful += 1;
        if self.verbosity >= Verbosity::Complete {
            let mut text = format!("[Completed: {}", task.name());
            if let Some(elapsed) = elapsed {
                text += &format!(" {}", time_string(elapsed));
            }
            text += "]";
            if self.descriptions {
                text += &format!("\n  {}", task.describe());
            }
            println!("{}", text.if_supports_color(Stream::Stdout, |t| t.green()));
        }
        self.progress(&st);
    }

    fn task_failed(&self, task: &Task, error: &TaskError) {
        let mut st = self.lock();
        let elapsed = self.elapsed(&mut st, task);
        st.finished += 1;
        st.failed += 1;
        if self.verbosity > Verbosity::None {
            let mut text = format!("[Failed: {}", task.name());
            if let Some(elapsed) = elapsed {
                text += &format!(" {}", time_string(elapsed));
            }
            text += "]";
            text += &format!("\n  Description: {}", task.describe());
            text += &match error {
                TaskError::ExitCode(code) => format!("\n  Return: {code}"),
                other => format!("\n  Message: {other}"),
            };
            println!("{}", text.if_supports_color(Stream::Stdout, |t| t.red()));
        }
        self.progress(&st);
    }

    fn task_killed(&self, task: &Task) {
        let mut st = self.lock();
        let elapsed = self.elapsed(&mut st, task);
        st.finished += 1;
        st.killed += 1;
        if self.verbosity > Verbosity::None {
            let mut text = format!("[Killed: {}", task.name());
            if let Some(elapsed) = elapsed {
                text += &format!(" {}", time_string(elapsed));
            }
            text += "]";
            println!("{}", text.if_supports_color(Stream::Stdout, |t| t.red()));
        }
        self.progress(&st);
    }
}

fn time_string(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    let (days, rem) = (total / 86_400, total % 86_400);
    let (hours, rem) = (rem / 3_600, rem % 3_600);
    let (minutes, seconds) = (rem / 60, rem % 60);
    if days > 0 {
        format!("{days}d:{hours}h:{minutes}m:{seconds}s")
    } else if hours > 0 {
        format!("{hours}h:{minutes}m:{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m:{seconds}s")
    } else {
        format!("{seconds}s")
    }
}
