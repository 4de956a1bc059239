//! Scalar-call frames
//!
//! Arguments are evaluated in order (each may suspend), then the native
//! operation is applied synchronously.

use crate::executor::arena::FrameId;
use crate::executor::env::Env;
use crate::executor::types::{Completion, FrameKind, Node, NodeRef, Outcome, ScFrame};
use crate::executor::vm::{state_mut, Engine, Flow};
use std::rc::Rc;

impl Engine {
    pub(crate) fn sc_start(&mut self, node: &NodeRef, env: &Rc<Env>) -> Outcome {
        let id = self.alloc(
            FrameKind::Sc(ScFrame {
                node: node.clone(),
                args: Vec::new(),
            }),
            env.clone(),
        );
        self.sc_run(id)
    }

    pub(crate) fn sc_cont(&mut self, id: FrameId, _idx: usize, completion: Completion) -> Outcome {
        match completion {
            Completion::Value(v) => {
                state_mut!(self, id, Sc).args.push(v);
                self.sc_run(id)
            }
            signal => self.return_to_parent(id, signal),
        }
    }

    fn sc_run(&mut self, id: FrameId) -> Outcome {
        let node = state_mut!(self, id, Sc).node.clone();
        let Node::Sc { line, op, args } = &*node else {
            unreachable!("scalar-call frame holds {}", node.name());
        };
        let env = self.env_of(id);

        loop {
            let next = state_mut!(self, id, Sc).args.len();
            if next >= args.len() {
                break;
            }
            match self.run_child_checked(id, &args[next], &env, next) {
                Flow::Done(Completion::Value(v)) => state_mut!(self, id, Sc).args.push(v),
                Flow::Done(signal) => return self.return_to_parent(id, signal),
                Flow::Suspended => return Outcome::Pending(id),
                Flow::Aborted => return self.return_to_parent(id, Completion::null()),
            }
        }

        let values = std::mem::take(&mut state_mut!(self, id, Sc).args);
        let completion = self.apply_native(op, values, &env, *line);
        self.return_to_parent(id, completion)
    }
}
