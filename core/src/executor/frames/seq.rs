//! Sequence frames

use crate::executor::arena::FrameId;
use crate::executor::env::Env;
use crate::executor::types::{
    Completion, FrameKind, Node, NodeRef, Outcome, SeqFlags, SeqFrame, ShortCircuit, Signal, Val,
};
use crate::executor::vm::{state_mut, Engine, Flow};
use std::rc::Rc;

impl Engine {
    pub(crate) fn seq_start(&mut self, node: &NodeRef, env: &Rc<Env>) -> Outcome {
        let Node::Seq { flags, .. } = &**node else {
            unreachable!("seq_start called with {}", node.name());
        };
        let id = self.alloc(FrameKind::Seq(SeqFrame { node: node.clone() }), env.clone());

        // Boundaries get their own copy of the environment
        if flags.is_block_boundary() {
            let mut scoped: Env = (**env).clone();
            scoped.blref = Some(id);
            scoped.blscope = Some(id);
            self.frame_mut(id).env = Rc::new(scoped);
        } else if flags.scope {
            let mut scoped: Env = (**env).clone();
            scoped.blscope = None;
            self.frame_mut(id).env = Rc::new(scoped);
        }

        self.seq_run(id, 0, Completion::null())
    }

    /// `idx` is the index of the next child to run.
    pub(crate) fn seq_cont(&mut self, id: FrameId, idx: usize, completion: Completion) -> Outcome {
        self.seq_run(id, idx, completion)
    }

    fn seq_run(&mut self, id: FrameId, mut idx: usize, mut completion: Completion) -> Outcome {
        let node = state_mut!(self, id, Seq).node.clone();
        let Node::Seq { flags, body } = &*node else {
            unreachable!("sequence frame holds {}", node.name());
        };
        let env = self.env_of(id);

        loop {
            let val = match completion {
                Completion::Signal(Signal::BlockExit { target, .. }) if target == id => Val::Null,
                Completion::Signal(_) => return self.seq_finish(id, flags, completion),
                Completion::Value(v) => v,
            };
            if idx >= body.len() {
                return self.seq_finish(id, flags, Completion::Value(val));
            }
            if idx > 0 {
                match flags.short_circuit {
                    Some(ShortCircuit::Or) if val.is_truthy() => {
                        return self.seq_finish(id, flags, Completion::Value(val));
                    }
                    Some(ShortCircuit::And) if !val.is_truthy() => {
                        return self.seq_finish(id, flags, Completion::Value(val));
                    }
                    _ => {}
                }
            }

            let flow = self.run_child_checked(id, &body[idx], &env, idx + 1);
            idx += 1;
            completion = match flow {
                Flow::Done(c) => c,
                Flow::Suspended => return Outcome::Pending(id),
                Flow::Aborted => return self.return_to_parent(id, Completion::null()),
            };
        }
    }

    fn seq_finish(&mut self, id: FrameId, flags: &SeqFlags, completion: Completion) -> Outcome {
        let completion = match completion {
            Completion::Signal(Signal::Return { value, target })
                if flags.swallows_return() && target.map_or(true, |t| t == id) =>
            {
                Completion::Value(value)
            }
            Completion::Value(_) if flags.scope && !flags.keep_value && !flags.top_level => {
                Completion::null()
            }
            other => other,
        };
        self.return_to_parent(id, completion)
    }
}
