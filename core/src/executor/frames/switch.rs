//! Switch frames
//!
//! Three phases: evaluate the discriminant, walk the case labels in source
//! order until one equals it (a default label matches where it stands), then
//! run clause bodies from the match onward, falling through until a Break.

use crate::executor::arena::FrameId;
use crate::executor::env::Env;
use crate::executor::types::{
    CaseLabel, Completion, FrameKind, Node, NodeRef, Outcome, Signal, SwitchFrame, SwitchPhase,
    Val,
};
use crate::executor::vm::{state_mut, Engine, Flow};
use std::rc::Rc;

enum Step {
    /// Evaluate the label of the current clause
    Label,
    /// Run the body of the current clause
    Body,
    Finish(Completion),
}

impl Engine {
    pub(crate) fn switch_start(&mut self, node: &NodeRef, env: &Rc<Env>) -> Outcome {
        let Node::Switch { discriminant, .. } = &**node else {
            unreachable!("switch_start called with {}", node.name());
        };
        let id = self.alloc(
            FrameKind::Switch(SwitchFrame {
                node: node.clone(),
                phase: SwitchPhase::Discriminant,
                testval: Val::Null,
                clause: 0,
                last: Val::Null,
            }),
            env.clone(),
        );
        match self.run_child_checked(id, discriminant, env, 0) {
            Flow::Done(c) => self.switch_cont(id, 0, c),
            Flow::Suspended => Outcome::Pending(id),
            Flow::Aborted => self.return_to_parent(id, Completion::null()),
        }
    }

    /// Feed the completion of the child running for the current phase.
    pub(crate) fn switch_cont(&mut self, id: FrameId, _idx: usize, completion: Completion) -> Outcome {
        let node = state_mut!(self, id, Switch).node.clone();
        let Node::Switch { clauses, .. } = &*node else {
            unreachable!("switch frame holds {}", node.name());
        };
        let env = self.env_of(id);
        let mut completion = completion;

        loop {
            let state = state_mut!(self, id, Switch);
            let step = match (state.phase, completion) {
                (SwitchPhase::Discriminant, Completion::Value(v)) => {
                    state.testval = v;
                    state.phase = SwitchPhase::Match;
                    state.clause = 0;
                    Step::Label
                }
                (SwitchPhase::Match, Completion::Value(v)) => {
                    if v == state.testval {
                        state.phase = SwitchPhase::Body;
                        Step::Body
                    } else {
                        state.clause += 1;
                        Step::Label
                    }
                }
                (SwitchPhase::Body, Completion::Signal(Signal::Break(label))) => {
                    Step::Finish(Completion::Value(Val::from_label(label)))
                }
                (SwitchPhase::Body, Completion::Value(v)) => {
                    state.last = v;
                    state.clause += 1;
                    Step::Body
                }
                (_, signal) => Step::Finish(signal),
            };

            let flow = match step {
                Step::Finish(c) => return self.return_to_parent(id, c),
                Step::Label => {
                    let state = state_mut!(self, id, Switch);
                    let Some(clause) = clauses.get(state.clause) else {
                        return self.return_to_parent(id, Completion::null());
                    };
                    match &clause.label {
                        CaseLabel::Default => {
                            state.phase = SwitchPhase::Body;
                            self.run_child_checked(id, &clause.body, &env, 0)
                        }
                        CaseLabel::Case { value } => self.run_child_checked(id, value, &env, 0),
                    }
                }
                Step::Body => {
                    let state = state_mut!(self, id, Switch);
                    let Some(clause) = clauses.get(state.clause) else {
                        let last = std::mem::replace(&mut state.last, Val::Null);
                        return self.return_to_parent(id, Completion::Value(last));
                    };
                    self.run_child_checked(id, &clause.body, &env, 0)
                }
            };

            completion = match flow {
                Flow::Done(c) => c,
                Flow::Suspended => return Outcome::Pending(id),
                Flow::Aborted => return self.return_to_parent(id, Completion::null()),
            };
        }
    }
}
