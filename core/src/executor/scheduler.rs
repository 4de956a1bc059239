//! Deferred-task queue and timers
//!
//! Everything that must not run on the current call chain goes through the
//! scheduler: resume deliveries, timer firings and stratum checks. Timers run
//! on a millisecond clock that the driver advances, either instantly
//! (virtual time) or by sleeping on tokio.

use super::handles::{ResumeHandle, StratumHandle};
use super::types::Val;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

/// Work item picked up by the driver
#[derive(Debug, Clone)]
pub enum Task {
    /// Deliver a fired resume to its suspend frame
    Resume(ResumeHandle),
    /// Timer expiry: call `handle` with `payload`
    Fire {
        handle: ResumeHandle,
        payload: Vec<Val>,
    },
    /// Report a stratum's failure if nobody collected it
    CheckStratum(StratumHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

#[derive(Default)]
struct SchedulerState {
    ready: VecDeque<Task>,
    /// Keyed by (due, sequence) so equal deadlines fire in creation order
    timers: BTreeMap<(u64, u64), Task>,
    timer_keys: HashMap<TimerId, (u64, u64)>,
    now: u64,
    next_seq: u64,
}

#[derive(Clone, Default)]
pub struct Scheduler(Rc<RefCell<SchedulerState>>);

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.borrow();
        f.debug_struct("Scheduler")
            .field("now", &state.now)
            .field("ready", &state.ready.len())
            .field("timers", &state.timers.len())
            .finish()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a task to run after the current call chain unwinds.
    pub fn defer(&self, task: Task) {
        self.0.borrow_mut().ready.push_back(task);
    }

    pub fn pop_ready(&self) -> Option<Task> {
        self.0.borrow_mut().ready.pop_front()
    }

    pub fn has_ready(&self) -> bool {
        !self.0.borrow().ready.is_empty()
    }

    /// Schedule `task` to become ready `delay_ms` from now.
    pub fn set_timer(&self, delay_ms: u64, task: Task) -> TimerId {
        let mut state = self.0.borrow_mut();
        state.next_seq += 1;
        let seq = state.next_seq;
        let key = (state.now.saturating_add(delay_ms), seq);
        state.timers.insert(key, task);
        let id = TimerId(seq);
        state.timer_keys.insert(id, key);
        id
    }

    /// Cancel a pending timer. Returns false if it already fired.
    pub fn clear_timer(&self, id: TimerId) -> bool {
        let mut state = self.0.borrow_mut();
        match state.timer_keys.remove(&id) {
            Some(key) => state.timers.remove(&key).is_some(),
            None => false,
        }
    }

    pub fn now(&self) -> u64 {
        self.0.borrow().now
    }

    /// Deadline of the earliest pending timer
    pub fn next_due(&self) -> Option<u64> {
        self.0.borrow().timers.keys().next().map(|(due, _)| *due)
    }

    pub fn pending_timers(&self) -> usize {
        self.0.borrow().timers.len()
    }

    /// Move the clock to `t` and make every timer due by then ready.
    pub fn advance_to(&self, t: u64) {
        let mut state = self.0.borrow_mut();
        if t > state.now {
            state.now = t;
        }
        let now = state.now;
        loop {
            let key = match state.timers.keys().next() {
                Some(&key) if key.0 <= now => key,
                _ => break,
            };
            if let Some(task) = state.timers.remove(&key) {
                state.timer_keys.remove(&TimerId(key.1));
                state.ready.push_back(task);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::arena::Arena;
    use crate::executor::handles::ResumeState;

    fn handle(scheduler: &Scheduler) -> ResumeHandle {
        let mut arena = Arena::new();
        ResumeHandle::new(arena.insert(()), scheduler.clone())
    }

    #[test]
    fn test_timers_fire_in_deadline_order() {
        let s = Scheduler::new();
        let h = handle(&s);
        s.set_timer(50, Task::Fire { handle: h.clone(), payload: vec![Val::Num(2.0)] });
        s.set_timer(10, Task::Fire { handle: h.clone(), payload: vec![Val::Num(1.0)] });

        assert_eq!(s.next_due(), Some(10));
        s.advance_to(10);
        match s.pop_ready() {
            Some(Task::Fire { payload, .. }) => assert_eq!(payload, vec![Val::Num(1.0)]),
            other => unreachable!("Expected timer task, got {:?}", other),
        }
        assert!(s.pop_ready().is_none());
        assert_eq!(s.now(), 10);
        assert_eq!(s.next_due(), Some(50));
    }

    #[test]
    fn test_clear_timer() {
        let s = Scheduler::new();
        let h = handle(&s);
        let id = s.set_timer(5, Task::Resume(h));
        assert!(s.clear_timer(id));
        assert!(!s.clear_timer(id));
        assert_eq!(s.next_due(), None);
        s.advance_to(100);
        assert!(!s.has_ready());
    }

    #[test]
    fn test_resume_is_one_shot() {
        let s = Scheduler::new();
        let h = handle(&s);
        assert!(h.resume(vec![Val::Num(1.0)]));
        assert!(!h.resume(vec![Val::Num(2.0)]));
        assert_eq!(h.take_payload(), Some(vec![Val::Num(1.0)]));
        assert_eq!(h.state(), ResumeState::Closed);
        assert_eq!(h.take_payload(), None);
        assert!(matches!(s.pop_ready(), Some(Task::Resume(_))));
        assert!(s.pop_ready().is_none());
    }
}
