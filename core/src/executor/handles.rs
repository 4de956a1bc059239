//! Runtime handle values: closures, resume functions and strata
//!
//! These are first-class values that only exist while a program runs. They
//! compare by identity.

use super::arena::FrameId;
use super::env::Env;
use super::scheduler::{Scheduler, Task};
use super::types::{Completion, NodeRef, Val};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/* ===================== Closures ===================== */

#[derive(Debug)]
pub struct ClosureData {
    pub params: Vec<String>,
    pub body: NodeRef,
    pub env: Rc<Env>,
    /// Block lambdas keep the defining frame's block references
    pub block: bool,
}

#[derive(Clone)]
pub struct Closure(pub Rc<ClosureData>);

impl Closure {
    pub fn new(params: Vec<String>, body: NodeRef, env: Rc<Env>, block: bool) -> Self {
        Closure(Rc::new(ClosureData {
            params,
            body,
            env,
            block,
        }))
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.0.block { "blocklambda" } else { "function" };
        write!(f, "<{}({})>", kind, self.0.params.join(", "))
    }
}

impl PartialEq for Closure {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/* ===================== Resume Handles ===================== */

/// Lifecycle of a resume function
#[derive(Debug, Clone, PartialEq)]
pub enum ResumeState {
    /// Not called yet
    Armed,
    /// Called; arguments wait for the deferred resume to pick them up
    Fired(Vec<Val>),
    /// Decided; further calls are ignored
    Closed,
}

struct ResumeSlot {
    frame: FrameId,
    state: RefCell<ResumeState>,
    scheduler: Scheduler,
}

/// One-shot resume function handed to a suspend body
///
/// The first call wins: it stores its arguments and queues a deferred
/// resume of the suspend frame. Later calls, and calls after the frame
/// closed the handle, are ignored.
#[derive(Clone)]
pub struct ResumeHandle(Rc<ResumeSlot>);

impl ResumeHandle {
    pub fn new(frame: FrameId, scheduler: Scheduler) -> Self {
        ResumeHandle(Rc::new(ResumeSlot {
            frame,
            state: RefCell::new(ResumeState::Armed),
            scheduler,
        }))
    }

    pub fn frame(&self) -> FrameId {
        self.0.frame
    }

    pub fn state(&self) -> ResumeState {
        self.0.state.borrow().clone()
    }

    /// Fire the handle. Returns false if it was already decided.
    pub fn resume(&self, payload: Vec<Val>) -> bool {
        {
            let mut state = self.0.state.borrow_mut();
            if *state != ResumeState::Armed {
                debug!(frame = %self.0.frame, "resume ignored, already decided");
                return false;
            }
            *state = ResumeState::Fired(payload);
        }
        self.0.scheduler.defer(Task::Resume(self.clone()));
        true
    }

    /// Decide without firing. Arguments of a fired but undelivered call are
    /// dropped.
    pub fn close(&self) {
        *self.0.state.borrow_mut() = ResumeState::Closed;
    }

    pub fn is_decided(&self) -> bool {
        *self.0.state.borrow() != ResumeState::Armed
    }

    /// Take the stored arguments if the handle fired, closing it.
    pub fn take_payload(&self) -> Option<Vec<Val>> {
        let mut state = self.0.state.borrow_mut();
        match std::mem::replace(&mut *state, ResumeState::Closed) {
            ResumeState::Fired(payload) => Some(payload),
            other => {
                *state = other;
                None
            }
        }
    }
}

impl fmt::Debug for ResumeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<resume {} decided={}>", self.0.frame, self.is_decided())
    }
}

impl PartialEq for ResumeHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/* ===================== Strata ===================== */

#[derive(Debug)]
pub struct StratumData {
    pub id: u64,
    /// Spawn frame running the body, while it runs
    pub frame: Option<FrameId>,
    pub value: Option<Completion>,
    /// Body went asynchronous and has not finished
    pub running: bool,
    pub settled: bool,
    pub picked_up: bool,
    pub waiters: Vec<FrameId>,
    pub line: u32,
    pub file: Rc<str>,
}

/// Handle to an independently running stratum
#[derive(Clone)]
pub struct StratumHandle(Rc<RefCell<StratumData>>);

impl StratumHandle {
    pub fn new(id: u64, line: u32, file: Rc<str>) -> Self {
        StratumHandle(Rc::new(RefCell::new(StratumData {
            id,
            frame: None,
            value: None,
            running: false,
            settled: false,
            picked_up: false,
            waiters: Vec::new(),
            line,
            file,
        })))
    }

    pub fn borrow(&self) -> std::cell::Ref<'_, StratumData> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> std::cell::RefMut<'_, StratumData> {
        self.0.borrow_mut()
    }

    pub fn id(&self) -> u64 {
        self.0.borrow().id
    }

    pub fn is_running(&self) -> bool {
        self.0.borrow().running
    }

    pub fn waiting(&self) -> usize {
        self.0.borrow().waiters.len()
    }
}

impl fmt::Debug for StratumHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(data) => write!(f, "<stratum {} running={}>", data.id, data.running),
            Err(_) => write!(f, "<stratum>"),
        }
    }
}

impl PartialEq for StratumHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
