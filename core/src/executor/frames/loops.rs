//! Loop and for-in frames

use crate::executor::arena::FrameId;
use crate::executor::env::Env;
use crate::executor::types::{
    Completion, ForInFrame, FrameKind, LoopFrame, LoopPhase, Node, NodeRef, Outcome, Signal, Val,
};
use crate::executor::vm::{state_mut, Engine, Flow};
use std::collections::VecDeque;
use std::rc::Rc;

/// How a loop reacts to a body completion
enum BodyExit {
    Next(Val),
    Continue,
    Finish(Completion),
}

/// Break ends the loop with its label as the value, Continue and block
/// exits aimed at the loop's block-exit scope move to the next iteration.
/// Inside a block-lambda body the scope is cleared, so exits from the lambda
/// itself pass through to the receiving call.
fn classify(completion: Completion, env: &Env) -> BodyExit {
    match completion {
        Completion::Value(v) => BodyExit::Next(v),
        Completion::Signal(Signal::Break(label)) => {
            BodyExit::Finish(Completion::Value(Val::from_label(label)))
        }
        Completion::Signal(Signal::Continue(_)) => BodyExit::Continue,
        Completion::Signal(Signal::BlockExit { target, .. }) if Some(target) == env.blscope => {
            BodyExit::Continue
        }
        signal => BodyExit::Finish(signal),
    }
}

impl Engine {
    /* ===================== Loop ===================== */

    pub(crate) fn loop_start(&mut self, node: &NodeRef, env: &Rc<Env>) -> Outcome {
        let Node::Loop { do_while, .. } = &**node else {
            unreachable!("loop_start called with {}", node.name());
        };
        let id = self.alloc(FrameKind::Loop(LoopFrame { node: node.clone() }), env.clone());
        let entry = if *do_while {
            LoopPhase::RunBody(0)
        } else {
            LoopPhase::RunTest
        };
        self.loop_run(id, entry, Completion::null())
    }

    pub(crate) fn loop_cont(&mut self, id: FrameId, idx: usize, completion: Completion) -> Outcome {
        self.loop_run(id, LoopPhase::from_idx(idx), completion)
    }

    fn loop_run(&mut self, id: FrameId, mut at: LoopPhase, mut completion: Completion) -> Outcome {
        let node = state_mut!(self, id, Loop).node.clone();
        let Node::Loop {
            test,
            increment,
            body,
            ..
        } = &*node
        else {
            unreachable!("loop frame holds {}", node.name());
        };
        let env = self.env_of(id);

        loop {
            let (child, waiting) = match at {
                LoopPhase::RunTest => (test, LoopPhase::TestDone),
                LoopPhase::TestDone => {
                    match completion {
                        Completion::Value(v) if v.is_truthy() => at = LoopPhase::RunBody(0),
                        Completion::Value(_) => {
                            return self.return_to_parent(id, Completion::null())
                        }
                        signal => return self.return_to_parent(id, signal),
                    }
                    completion = Completion::null();
                    continue;
                }
                LoopPhase::RunBody(i) => match body.get(i) {
                    Some(stmt) => (stmt, LoopPhase::BodyDone(i)),
                    None => {
                        at = LoopPhase::RunIncrement;
                        continue;
                    }
                },
                LoopPhase::BodyDone(i) => {
                    at = match classify(completion, &env) {
                        BodyExit::Next(_) => LoopPhase::RunBody(i + 1),
                        BodyExit::Continue => LoopPhase::RunIncrement,
                        BodyExit::Finish(c) => return self.return_to_parent(id, c),
                    };
                    completion = Completion::null();
                    continue;
                }
                LoopPhase::RunIncrement => match increment {
                    Some(inc) => (inc, LoopPhase::IncrementDone),
                    None => {
                        at = LoopPhase::RunTest;
                        continue;
                    }
                },
                LoopPhase::IncrementDone => {
                    if completion.is_signal() {
                        return self.return_to_parent(id, completion);
                    }
                    at = LoopPhase::RunTest;
                    continue;
                }
            };

            match self.run_child_checked(id, child, &env, waiting.to_idx()) {
                Flow::Done(c) => {
                    completion = c;
                    at = waiting;
                }
                Flow::Suspended => return Outcome::Pending(id),
                Flow::Aborted => return self.return_to_parent(id, Completion::null()),
            }
        }
    }

    /* ===================== For-In ===================== */

    pub(crate) fn for_in_start(&mut self, node: &NodeRef, env: &Rc<Env>) -> Outcome {
        let Node::ForIn { target, .. } = &**node else {
            unreachable!("for_in_start called with {}", node.name());
        };
        let id = self.alloc(
            FrameKind::ForIn(ForInFrame {
                node: node.clone(),
                remaining: VecDeque::new(),
                last: Val::Null,
            }),
            env.clone(),
        );
        match self.run_child_checked(id, target, env, 0) {
            Flow::Done(c) => self.for_in_cont(id, 0, c),
            Flow::Suspended => Outcome::Pending(id),
            Flow::Aborted => self.return_to_parent(id, Completion::null()),
        }
    }

    /// `idx` 0: target evaluated; 1: a body run finished.
    pub(crate) fn for_in_cont(&mut self, id: FrameId, idx: usize, completion: Completion) -> Outcome {
        if idx == 0 {
            return match completion {
                Completion::Value(target) => self.for_in_iterate(id, &target),
                signal => self.return_to_parent(id, signal),
            };
        }
        let env = self.env_of(id);
        match classify(completion, &env) {
            BodyExit::Next(v) => state_mut!(self, id, ForIn).last = v,
            BodyExit::Continue => {}
            BodyExit::Finish(c) => return self.return_to_parent(id, c),
        }
        let mut keys = std::mem::take(&mut state_mut!(self, id, ForIn).remaining).into_iter();
        self.for_in_visit(id, &mut keys)
    }

    /// First pass: enumerate keys straight from the target.
    fn for_in_iterate(&mut self, id: FrameId, target: &Val) -> Outcome {
        let mut keys = target.enumerate_keys();
        self.for_in_visit(id, &mut keys)
    }

    /// Run the body for each key. If the body suspends, the keys not yet
    /// visited are collected so the loop can continue later.
    fn for_in_visit(&mut self, id: FrameId, keys: &mut dyn Iterator<Item = String>) -> Outcome {
        let node = state_mut!(self, id, ForIn).node.clone();
        let Node::ForIn { binding, body, .. } = &*node else {
            unreachable!("for-in frame holds {}", node.name());
        };
        let env = self.env_of(id);

        while let Some(key) = keys.next() {
            env.args.define(binding, Val::Str(key));
            match self.run_child_checked(id, body, &env, 1) {
                Flow::Done(c) => match classify(c, &env) {
                    BodyExit::Next(v) => state_mut!(self, id, ForIn).last = v,
                    BodyExit::Continue => {}
                    BodyExit::Finish(c) => return self.return_to_parent(id, c),
                },
                Flow::Suspended => {
                    state_mut!(self, id, ForIn).remaining = keys.collect();
                    return Outcome::Pending(id);
                }
                Flow::Aborted => return self.return_to_parent(id, Completion::null()),
            }
        }
        let last = std::mem::replace(&mut state_mut!(self, id, ForIn).last, Val::Null);
        self.return_to_parent(id, Completion::Value(last))
    }
}
