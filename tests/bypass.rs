// tests/bypass.rs

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::EventLog;
use dagrun::{FnCondition, TaskManager, TaskManagerOptions, TaskOutcome, TaskSpec};

fn manager_with(log: &Arc<EventLog>) -> TaskManager {
    TaskManager::new(TaskManagerOptions {
        observers: vec![Arc::clone(log) as _],
        ..TaskManagerOptions::default()
    })
    .unwrap()
}

#[test]
fn all_conditions_false_means_bypass() {
    let log = EventLog::new();
    let mut manager = manager_with(&log);
    let skipped = manager
        .add_task(TaskSpec::nop("skipped").condition(FnCondition::new(|| false)))
        .unwrap();
    let after = manager.add_task(TaskSpec::nop("after")).unwrap();
    manager.add_dependency(after, skipped).unwrap();

    assert!(manager.run_tasks().unwrap());
    assert_eq!(manager.outcome(skipped), Some(TaskOutcome::Bypassed));
    // a bypass still unblocks the dependents
    assert_eq!(manager.outcome(after), Some(TaskOutcome::Completed));
    assert!(log.occurred("*skipped"));
    assert!(!log.occurred("+skipped"));
    assert!(log.before("*skipped", "+after"));
}

#[test]
fn any_true_condition_means_run() {
    let log = EventLog::new();
    let mut manager = manager_with(&log);
    let needed = manager
        .add_task(
            TaskSpec::nop("needed")
                .condition(FnCondition::new(|| false))
                .condition(FnCondition::new(|| true)),
        )
        .unwrap();

    assert!(manager.run_tasks().unwrap());
    assert_eq!(manager.outcome(needed), Some(TaskOutcome::Completed));
    assert!(log.occurred("+needed"));
    assert!(!log.occurred("*needed"));
}

#[test]
fn no_conditions_means_run() {
    let log = EventLog::new();
    let mut manager = manager_with(&log);
    manager.add_task(TaskSpec::nop("plain")).unwrap();
    assert!(manager.run_tasks().unwrap());
    assert!(log.occurred("+plain"));
}

#[test]
fn evaluation_short_circuits_on_the_first_true() {
    let calls = Arc::new([AtomicUsize::new(0), AtomicUsize::new(0), AtomicUsize::new(0)]);
    let counted = |index: usize, answer: bool| {
        let calls = Arc::clone(&calls);
        FnCondition::new(move || {
            calls[index].fetch_add(1, Ordering::SeqCst);
            answer
        })
    };

    let mut manager = TaskManager::new(TaskManagerOptions::default()).unwrap();
    manager
        .add_task(
            TaskSpec::nop("t")
                .condition(counted(0, false))
                .condition(counted(1, true))
                .condition(counted(2, false)),
        )
        .unwrap();
    assert!(manager.run_tasks().unwrap());

    assert_eq!(calls[0].load(Ordering::SeqCst), 1);
    assert_eq!(calls[1].load(Ordering::SeqCst), 1);
    // the decision was made before the third condition
    assert_eq!(calls[2].load(Ordering::SeqCst), 0);
}

#[test]
fn conditions_are_checked_at_most_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut manager = TaskManager::new(TaskManagerOptions::default()).unwrap();
    let calls_in = Arc::clone(&calls);
    let gate = manager
        .add_task(TaskSpec::nop("gate").condition(FnCondition::new(move || {
            calls_in.fetch_add(1, Ordering::SeqCst);
            true
        })))
        .unwrap();
    // several dependents, each of whose readiness re-inspects the graph
    for i in 0..3 {
        let dep = manager.add_task(TaskSpec::nop(format!("d{i}"))).unwrap();
        manager.add_dependency(dep, gate).unwrap();
    }

    assert!(manager.run_tasks().unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
