//! Conditional frames

use crate::executor::arena::FrameId;
use crate::executor::env::Env;
use crate::executor::types::{Completion, FrameKind, IfFrame, Node, NodeRef, Outcome};
use crate::executor::vm::{state_mut, Engine, Flow};
use std::rc::Rc;

const TEST: usize = 0;
const BRANCH: usize = 1;

impl Engine {
    pub(crate) fn if_start(&mut self, node: &NodeRef, env: &Rc<Env>) -> Outcome {
        let Node::If { test, .. } = &**node else {
            unreachable!("if_start called with {}", node.name());
        };
        let id = self.alloc(FrameKind::If(IfFrame { node: node.clone() }), env.clone());
        match self.run_child_checked(id, test, env, TEST) {
            Flow::Done(c) => self.if_cont(id, TEST, c),
            Flow::Suspended => Outcome::Pending(id),
            Flow::Aborted => self.return_to_parent(id, Completion::null()),
        }
    }

    pub(crate) fn if_cont(&mut self, id: FrameId, idx: usize, completion: Completion) -> Outcome {
        let val = match completion {
            Completion::Value(v) if idx == TEST => v,
            other => return self.return_to_parent(id, other),
        };
        let node = state_mut!(self, id, If).node.clone();
        let Node::If {
            then, otherwise, ..
        } = &*node
        else {
            unreachable!("if frame holds {}", node.name());
        };
        let branch = if val.is_truthy() {
            then
        } else {
            match otherwise {
                Some(branch) => branch,
                None => return self.return_to_parent(id, Completion::null()),
            }
        };
        let env = self.env_of(id);
        match self.run_child_checked(id, branch, &env, BRANCH) {
            Flow::Done(c) => self.return_to_parent(id, c),
            Flow::Suspended => Outcome::Pending(id),
            Flow::Aborted => self.return_to_parent(id, Completion::null()),
        }
    }
}
