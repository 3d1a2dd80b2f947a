//! Cross-module scenario tests driving the dispatcher, the scheduler
//! and the timer path together.

pub mod support;

use support::Fixture;

use crate::memory::MemoryMap;
use crate::process::{ProcessId, ProcessState};
use crate::syscall::{encode, ApiError, Dispatch, ProcessOperation, SELF_PID};
use crate::time::TimerInfo;

fn completed(dispatch: Dispatch) -> u64 {
    match dispatch {
        Dispatch::Completed(word) => word,
        Dispatch::Suspended => panic!("operation unexpectedly suspended"),
    }
}

#[test]
fn spawned_child_reports_its_parent() {
    let mut fx = Fixture::new();
    let a = fx.spawn();
    assert_eq!(fx.procs.schedule(0), Some(a));

    let child = ProcessId::new(completed(fx.dispatch(0, ProcessOperation::Spawn, 0xe200, 0)));
    assert_eq!(fx.procs.get(child).unwrap().parent(), Some(a));

    // The child itself observes the same parentage.
    fx.dispatch(SELF_PID, ProcessOperation::Schedule, 0, 0);
    assert_eq!(fx.procs.current(0), Some(child));
    assert_eq!(
        completed(fx.dispatch(SELF_PID, ProcessOperation::GetParent, 0, 0)),
        a.as_u64()
    );
    assert_eq!(
        completed(fx.dispatch(SELF_PID, ProcessOperation::GetPid, 0, 0)),
        child.as_u64()
    );
}

#[test]
fn wait_pid_observes_exit_status_through_a_timer_sleep() {
    let mut fx = Fixture::new();
    let a = fx
        .procs
        .create(0xe100, &MemoryMap::user_default(), None, false)
        .unwrap();
    assert_eq!(fx.procs.schedule(0), Some(a));

    // A spawns B.
    let b = ProcessId::new(completed(fx.dispatch(0, ProcessOperation::Spawn, 0xe200, 0)));

    // A yields; B runs.
    fx.dispatch(SELF_PID, ProcessOperation::Schedule, 0, 0);
    assert_eq!(fx.procs.current(0), Some(b));

    // B sleeps until 10 ticks from now.
    let deadline = TimerInfo {
        ticks: fx.timer.now().ticks + 10,
        frequency: fx.timer.now().frequency,
    };
    let dispatch = fx.dispatch(
        SELF_PID,
        ProcessOperation::WaitTimer,
        &deadline as *const TimerInfo as u64,
        0,
    );
    assert_eq!(dispatch, Dispatch::Suspended);
    assert_eq!(fx.procs.get(b).unwrap().state, ProcessState::Sleeping);
    assert_eq!(fx.procs.current(0), Some(a));

    // A blocks on B.
    let dispatch = fx.dispatch(b.as_u64(), ProcessOperation::WaitPid, 0, 0);
    assert_eq!(dispatch, Dispatch::Suspended);
    assert_eq!(fx.procs.get(a).unwrap().state, ProcessState::Waiting);
    assert_eq!(fx.procs.current(0), Some(fx.idle));

    // Ten ticks later the timer path releases B.
    fx.timer.advance(10);
    assert_eq!(fx.procs.wake_sleepers(fx.timer.now()), 1);
    assert_eq!(fx.procs.schedule(0), Some(b));
    // B resumed from WaitTimer observing Success.
    assert_eq!(fx.procs.get(b).unwrap().context.return_value(), 0);

    // B exits with status 42; A resumes from WaitPid observing it.
    let dispatch = fx.dispatch(SELF_PID, ProcessOperation::KillPid, 42, 0);
    assert_eq!(dispatch, Dispatch::Suspended);
    assert!(fx.procs.get(b).is_none());
    assert_eq!(fx.procs.current(0), Some(a));
    assert_eq!(fx.procs.get(a).unwrap().state, ProcessState::Running);
    assert_eq!(fx.procs.get(a).unwrap().context.return_value(), 42);
}

#[test]
fn resume_before_enter_sleep_keeps_the_target_runnable() {
    let mut fx = Fixture::new();
    let a = fx.spawn();
    let b = fx.spawn();
    assert_eq!(fx.procs.schedule(0), Some(a));

    // A resumes B before B ever sleeps.
    assert_eq!(completed(fx.dispatch(b.as_u64(), ProcessOperation::Resume, 0, 0)), 0);

    // B's checked sleep must consume the wakeup and keep running.
    fx.dispatch(SELF_PID, ProcessOperation::Schedule, 0, 0);
    assert_eq!(fx.procs.current(0), Some(b));
    let dispatch = fx.dispatch(SELF_PID, ProcessOperation::EnterSleep, 0, 0);
    assert_eq!(dispatch, Dispatch::Completed(0));
    assert_eq!(fx.procs.get(b).unwrap().state, ProcessState::Running);
    assert_eq!(fx.procs.current(0), Some(b));
}

#[test]
fn enter_sleep_without_pending_wakeup_blocks() {
    let mut fx = Fixture::new();
    let a = fx.spawn();
    assert_eq!(fx.procs.schedule(0), Some(a));

    let dispatch = fx.dispatch(SELF_PID, ProcessOperation::EnterSleep, 0, 0);
    assert_eq!(dispatch, Dispatch::Suspended);
    assert_eq!(fx.procs.get(a).unwrap().state, ProcessState::Sleeping);
    assert_eq!(fx.procs.current(0), Some(fx.idle));

    // Only an explicit resume ends a deadline-less sleep.
    fx.timer.advance(1_000_000);
    assert_eq!(fx.procs.wake_sleepers(fx.timer.now()), 0);
    fx.procs.resume(a).unwrap();
    assert_eq!(fx.procs.get(a).unwrap().state, ProcessState::Ready);
}

#[test]
fn watched_irq_wakes_the_sleeping_watcher_in_order() {
    let mut fx = Fixture::new();
    let a = fx.spawn();
    assert_eq!(fx.procs.schedule(0), Some(a));

    assert_eq!(completed(fx.dispatch(SELF_PID, ProcessOperation::WatchIrq, 9, 0)), 0);
    let dispatch = fx.dispatch(SELF_PID, ProcessOperation::EnterSleep, 0, 0);
    assert_eq!(dispatch, Dispatch::Suspended);

    // Two interrupts before the watcher runs again: both queued, in order.
    assert!(fx.procs.raise_irq(9));
    assert!(fx.procs.raise_irq(9));
    assert_eq!(fx.procs.get(a).unwrap().state, ProcessState::Ready);

    let p = fx.procs.get_mut(a).unwrap();
    assert_eq!(p.take_event().unwrap().number, 9);
    assert_eq!(p.take_event().unwrap().number, 9);
    assert_eq!(p.take_event(), None);
}

#[test]
fn irq_mask_operations_are_idempotent() {
    let mut fx = Fixture::new();
    let a = fx.spawn();
    assert_eq!(fx.procs.schedule(0), Some(a));

    for _ in 0..3 {
        assert_eq!(completed(fx.dispatch(SELF_PID, ProcessOperation::EnableIrq, 4, 0)), 0);
        assert!(fx.intc.is_enabled(4));
    }
    for _ in 0..3 {
        assert_eq!(completed(fx.dispatch(SELF_PID, ProcessOperation::DisableIrq, 4, 0)), 0);
        assert!(!fx.intc.is_enabled(4));
    }
}

#[test]
fn unresolved_target_fails_before_any_side_effect() {
    let mut fx = Fixture::new();
    let a = fx.spawn();
    assert_eq!(fx.procs.schedule(0), Some(a));

    let not_found = encode(Err(ApiError::NotFound));

    // EnableIrq with a stale target PID: the controller is untouched.
    let word = completed(fx.dispatch(4242, ProcessOperation::EnableIrq, 3, 0));
    assert_eq!(word, not_found);
    assert!(!fx.intc.is_enabled(3));

    // The caller observes the error in its saved return register.
    assert_eq!(fx.procs.get(a).unwrap().context.return_value(), not_found);
}
