//! Suspend frames: the bridge to external asynchronous operations
//!
//! The body runs with a one-shot resume function bound in scope. Either the
//! body finishes on its own, or resume fires first. Resume firing wins over
//! a body that is still live: the body is quenched and aborted, then the
//! resume arguments are bound to the declared variables.

use crate::executor::arena::FrameId;
use crate::executor::env::Env;
use crate::executor::handles::ResumeHandle;
use crate::executor::types::{
    AbortResult, Completion, Frame, FrameKind, Node, NodeRef, Outcome, SuspendFrame,
    SuspendPhase, Val,
};
use crate::executor::vm::{state_mut, Engine};
use std::rc::Rc;
use tracing::debug;

const BODY: usize = 0;
const ABORTING: usize = 1;

impl Engine {
    pub(crate) fn suspend_start(&mut self, node: &NodeRef, env: &Rc<Env>) -> Outcome {
        let Node::Suspend { resume, body, .. } = &**node else {
            unreachable!("suspend_start called with {}", node.name());
        };
        let scheduler = self.scheduler().clone();
        let id = self.alloc_with(
            |id| {
                FrameKind::Suspend(SuspendFrame {
                    node: node.clone(),
                    handle: ResumeHandle::new(id, scheduler),
                    phase: SuspendPhase::Starting,
                    payload: None,
                })
            },
            env.clone(),
        );
        let handle = state_mut!(self, id, Suspend).handle.clone();

        let scope = env.args.child();
        scope.define(resume, Val::Resume(handle.clone()));
        let body_env = Rc::new(env.with_scope(scope));
        let out = self.exec(body, &body_env);

        if self.frame(id).aborted {
            handle.close();
            if let Outcome::Pending(child) = out {
                self.cancel(child);
            }
            return self.return_to_parent(id, Completion::null());
        }

        if let Some(payload) = handle.take_payload() {
            // Resumed while the body was still starting up
            if let Outcome::Pending(child) = out {
                self.quench(child);
                if let AbortResult::Pending(next) = self.abort(child) {
                    let state = state_mut!(self, id, Suspend);
                    state.phase = SuspendPhase::Aborting;
                    state.payload = Some(payload);
                    self.set_child(id, next, ABORTING);
                    return Outcome::Pending(id);
                }
            }
            return self.suspend_settle(id, payload);
        }

        match out {
            Outcome::Pending(child) => {
                state_mut!(self, id, Suspend).phase = SuspendPhase::Body;
                self.set_child(id, child, BODY);
                Outcome::Pending(id)
            }
            Outcome::Done(c) => self.suspend_body_done(id, c),
            Outcome::Delivered => self.return_to_parent(
                id,
                Completion::internal("synchronous execution delivered its result"),
            ),
        }
    }

    pub(crate) fn suspend_cont(&mut self, id: FrameId, idx: usize, completion: Completion) -> Outcome {
        match idx {
            BODY => self.suspend_body_done(id, completion),
            _ => {
                let payload = state_mut!(self, id, Suspend).payload.take().unwrap_or_default();
                self.suspend_settle(id, payload)
            }
        }
    }

    /// The body finished before resume fired.
    fn suspend_body_done(&mut self, id: FrameId, completion: Completion) -> Outcome {
        state_mut!(self, id, Suspend).handle.close();
        if let Completion::Value(_) = completion {
            self.suspend_bind(id, Vec::new());
        }
        self.return_to_parent(id, completion)
    }

    /// Process a fired resume function: deliver its arguments to the
    /// suspend frame if that frame is still waiting on its body.
    pub fn resume(&mut self, handle: &ResumeHandle) {
        let id = handle.frame();
        let waiting = matches!(
            self.try_frame(id),
            Some(Frame {
                kind: FrameKind::Suspend(s),
                aborted: false,
                ..
            }) if s.phase == SuspendPhase::Body && s.handle == *handle
        );
        if !waiting {
            debug!(frame = %id, "resume for a finished suspend ignored");
            return;
        }
        let Some(payload) = handle.take_payload() else {
            return;
        };
        let child = self.frame(id).child;
        if let Some((child, _)) = child {
            self.quench(child);
            match self.abort(child) {
                AbortResult::Pending(next) => {
                    let state = state_mut!(self, id, Suspend);
                    state.phase = SuspendPhase::Aborting;
                    state.payload = Some(payload);
                    self.set_child(id, next, ABORTING);
                    return;
                }
                AbortResult::Done => self.frame_mut(id).child = None,
            }
        }
        self.suspend_settle(id, payload);
    }

    /// Bind the resume arguments to the declared variables and finish.
    fn suspend_settle(&mut self, id: FrameId, payload: Vec<Val>) -> Outcome {
        self.suspend_bind(id, payload);
        self.return_to_parent(id, Completion::null())
    }

    /// Missing arguments bind as null.
    fn suspend_bind(&mut self, id: FrameId, payload: Vec<Val>) {
        let node = state_mut!(self, id, Suspend).node.clone();
        let Node::Suspend { bindings, .. } = &*node else {
            unreachable!("suspend frame holds {}", node.name());
        };
        let env = self.env_of(id);
        let mut payload = payload.into_iter();
        for name in bindings {
            env.args.define(name, payload.next().unwrap_or(Val::Null));
        }
    }
}
