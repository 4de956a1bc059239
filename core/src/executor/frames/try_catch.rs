//! Try frames
//!
//! Phases run in order: body, catch, retract, finally. Catch only runs when
//! the frame was not aborted. Retract runs when it was, and when a block
//! lambda break unwinds through the frame. Retract and finally are cleanup:
//! once started they are never aborted, and the frame reports only after
//! they finish. A signal raised by retract replaces the pending result.

use crate::executor::arena::FrameId;
use crate::executor::env::Env;
use crate::executor::types::{
    AbortResult, Completion, FrameKind, Node, NodeRef, Outcome, Signal, TryFrame, TryPhase, Val,
};
use crate::executor::vm::{state_mut, Engine, Flow};
use std::rc::Rc;
use tracing::warn;

impl Engine {
    pub(crate) fn try_start(&mut self, node: &NodeRef, env: &Rc<Env>) -> Outcome {
        let Node::Try { body, .. } = &**node else {
            unreachable!("try_start called with {}", node.name());
        };
        let id = self.alloc(
            FrameKind::Try(TryFrame {
                node: node.clone(),
                phase: TryPhase::Body,
                rv: None,
            }),
            env.clone(),
        );
        match self.run_child_checked(id, body, env, TryPhase::Body as usize) {
            Flow::Done(c) => self.try_step(id, c),
            Flow::Suspended => Outcome::Pending(id),
            Flow::Aborted => self.try_step(id, Completion::null()),
        }
    }

    pub(crate) fn try_cont(&mut self, id: FrameId, _idx: usize, completion: Completion) -> Outcome {
        self.frame_mut(id).child = None;
        self.try_step(id, completion)
    }

    /// Advance past the phase whose child just produced `completion`.
    fn try_step(&mut self, id: FrameId, completion: Completion) -> Outcome {
        let node = state_mut!(self, id, Try).node.clone();
        let Node::Try {
            catch_all,
            catch,
            retract,
            finally,
            ..
        } = &*node
        else {
            unreachable!("try frame holds {}", node.name());
        };
        let env = self.env_of(id);
        let mut completion = completion;

        loop {
            let aborted = self.frame(id).aborted;
            let phase = state_mut!(self, id, Try).phase;
            match phase {
                TryPhase::Body => {
                    state_mut!(self, id, Try).phase = TryPhase::Catch;
                    let Some(catch) = catch else { continue };
                    if aborted {
                        continue;
                    }
                    let caught = match &completion {
                        Completion::Signal(Signal::Throw(thrown)) if *catch_all => {
                            Val::List(vec![thrown.value.clone(), Val::Bool(true)])
                        }
                        Completion::Signal(Signal::Throw(thrown)) => thrown.value.clone(),
                        Completion::Value(v) if *catch_all => {
                            Val::List(vec![v.clone(), Val::Bool(false)])
                        }
                        _ => continue,
                    };
                    let scope = env.args.child();
                    scope.define(&catch.binding, caught);
                    let catch_env = Rc::new(env.with_scope(scope));
                    match self.run_child_checked(id, &catch.body, &catch_env, TryPhase::Catch as usize)
                    {
                        Flow::Done(c) => completion = c,
                        Flow::Suspended => return Outcome::Pending(id),
                        Flow::Aborted => completion = Completion::null(),
                    }
                }
                TryPhase::Catch => {
                    let state = state_mut!(self, id, Try);
                    state.phase = TryPhase::Retract;
                    state.rv = Some(completion.clone());
                    let unwinding =
                        matches!(completion, Completion::Signal(Signal::BlockExit { .. }));
                    if !aborted && !unwinding {
                        continue;
                    }
                    let Some(retract) = retract else { continue };
                    match self.run_child(id, retract, &env, TryPhase::Retract as usize) {
                        Flow::Done(c) => completion = c,
                        Flow::Suspended => return Outcome::Pending(id),
                        Flow::Aborted => completion = Completion::null(),
                    }
                }
                TryPhase::Retract => {
                    let state = state_mut!(self, id, Try);
                    state.phase = TryPhase::Finally;
                    if completion.is_signal() {
                        state.rv = Some(completion.clone());
                    }
                    let Some(finally) = finally else { continue };
                    match self.run_child(id, finally, &env, TryPhase::Finally as usize) {
                        Flow::Done(c) => completion = c,
                        Flow::Suspended => return Outcome::Pending(id),
                        Flow::Aborted => completion = Completion::null(),
                    }
                }
                TryPhase::Finally => {
                    let rv = state_mut!(self, id, Try).rv.take().unwrap_or_else(Completion::null);
                    // A signal from retract/finally overrides the earlier result
                    let result = match completion {
                        Completion::Signal(signal) => {
                            if let Completion::Signal(Signal::Throw(prev)) = &rv {
                                if rv != Completion::Signal(signal.clone()) {
                                    warn!(
                                        error = %prev.error_info(),
                                        "exception in finally overrides earlier exception"
                                    );
                                }
                            }
                            Completion::Signal(signal)
                        }
                        Completion::Value(_) => rv,
                    };
                    return self.return_to_parent(id, result);
                }
            }
        }
    }

    pub(crate) fn try_quench(&mut self, id: FrameId) {
        let frame = self.frame(id);
        let cleanup = match &frame.kind {
            FrameKind::Try(t) => t.phase.is_cleanup(),
            _ => false,
        };
        if let (false, Some((child, _))) = (cleanup, frame.child) {
            self.quench(child);
        }
    }

    pub(crate) fn try_abort(&mut self, id: FrameId) -> AbortResult {
        let frame = self.frame_mut(id);
        if std::mem::replace(&mut frame.aborted, true) {
            return if frame.child.is_some() {
                AbortResult::Pending(id)
            } else {
                AbortResult::Done
            };
        }
        let child = frame.child;
        let phase = state_mut!(self, id, Try).phase;
        let Some((child, idx)) = child else {
            // Mid-execution: the running step notices the flag
            return AbortResult::Done;
        };
        if phase.is_cleanup() {
            return AbortResult::Pending(id);
        }
        match self.abort(child) {
            AbortResult::Pending(next) => {
                self.set_child(id, next, idx);
                AbortResult::Pending(id)
            }
            AbortResult::Done => {
                // Body or catch is gone; run retract and finally now
                self.frame_mut(id).child = None;
                match self.try_step(id, Completion::null()) {
                    Outcome::Pending(_) => AbortResult::Pending(id),
                    _ => AbortResult::Done,
                }
            }
        }
    }
}
