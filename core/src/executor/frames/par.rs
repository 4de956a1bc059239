//! Parallel (wait-all) frames
//!
//! All branches start left to right. The frame finishes when every branch
//! has finished; the value is the last one to complete. The first control
//! signal from any branch wins: the remaining branches are quenched and
//! aborted, and the signal is reported once they are gone.

use crate::executor::arena::FrameId;
use crate::executor::env::Env;
use crate::executor::types::{
    AbortResult, Completion, FrameKind, Node, NodeRef, Outcome, ParFrame,
};
use crate::executor::vm::{state_mut, Engine};
use std::rc::Rc;

/// Outcome of tearing down the remaining branches
pub(crate) enum Teardown {
    Done(Completion),
    Pending,
}

impl Engine {
    pub(crate) fn par_start(&mut self, node: &NodeRef, env: &Rc<Env>) -> Outcome {
        let Node::Par { branches } = &**node else {
            unreachable!("par_start called with {}", node.name());
        };
        let id = self.alloc(
            FrameKind::Par(ParFrame {
                node: node.clone(),
                children: vec![None; branches.len()],
                pending: 0,
                pending_signal: None,
                starting: true,
            }),
            env.clone(),
        );

        let mut last = Completion::null();
        for (i, branch) in branches.iter().enumerate() {
            let out = self.exec(branch, env);
            if let Outcome::Pending(child) = out {
                state_mut!(self, id, Par).pending += 1;
                self.set_branch(id, i, child);
            }
            if self.frame(id).aborted {
                // Aborted from inside a branch, or a sibling signalled
                return self.par_settle_aborted(id);
            }
            match out {
                Outcome::Done(c @ Completion::Signal(_)) => {
                    state_mut!(self, id, Par).pending_signal = Some(c);
                    self.par_quench(id);
                    return self.par_settle_aborted(id);
                }
                Outcome::Done(c) => last = c,
                Outcome::Pending(_) | Outcome::Delivered => {}
            }
        }
        state_mut!(self, id, Par).starting = false;
        self.par_settle(id, last)
    }

    fn par_finish_start(&mut self, id: FrameId) -> Outcome {
        state_mut!(self, id, Par).starting = false;
        self.suspend(id)
    }

    /// Start was interrupted by an abort; report or wait for teardown.
    fn par_settle_aborted(&mut self, id: FrameId) -> Outcome {
        match self.par_abort_inner(id) {
            Teardown::Done(c) => self.return_to_parent(id, c),
            Teardown::Pending => self.par_finish_start(id),
        }
    }

    /// Decide whether the frame is finished after a branch completed.
    fn par_settle(&mut self, id: FrameId, last: Completion) -> Outcome {
        let state = state_mut!(self, id, Par);
        let live = state.children.iter().filter(|c| c.is_some()).count();
        if state.pending_signal.is_some() {
            if state.pending == 0 {
                let signal = state.pending_signal.take().unwrap_or(last);
                return self.return_to_parent(id, signal);
            }
        } else if state.pending == 0 {
            return self.return_to_parent(id, last);
        } else if live != state.pending {
            return self.return_to_parent(id, Completion::internal("invalid state in Par"));
        }
        self.suspend(id)
    }

    pub(crate) fn par_cont(&mut self, id: FrameId, idx: usize, completion: Completion) -> Outcome {
        let aborted = self.frame(id).aborted;
        let state = state_mut!(self, id, Par);
        state.pending = state.pending.saturating_sub(1);
        if let Some(slot) = state.children.get_mut(idx) {
            *slot = None;
        }
        let starting = state.starting;

        if completion.is_signal() && !aborted {
            state_mut!(self, id, Par).pending_signal = Some(completion);
            self.par_quench(id);
            if starting {
                // par_start sees the flag and tears the rest down
                self.frame_mut(id).aborted = true;
                return Outcome::Delivered;
            }
            return match self.par_abort_inner(id) {
                Teardown::Done(c) => self.return_to_parent(id, c),
                Teardown::Pending => Outcome::Pending(id),
            };
        }
        if starting {
            return Outcome::Delivered;
        }
        self.par_settle(id, completion)
    }

    pub(crate) fn par_quench(&mut self, id: FrameId) {
        if self.frame(id).aborted {
            return;
        }
        let children: Vec<FrameId> = state_mut!(self, id, Par).children.iter().flatten().copied().collect();
        for child in children {
            self.quench(child);
        }
    }

    pub(crate) fn par_abort(&mut self, id: FrameId) -> AbortResult {
        if self.frame(id).aborted {
            // Repeated abort: nobody is interested in the signal anymore
            let state = state_mut!(self, id, Par);
            state.pending_signal = None;
            return if state.pending > 0 {
                AbortResult::Pending(id)
            } else {
                AbortResult::Done
            };
        }
        let starting = state_mut!(self, id, Par).starting;
        match self.par_abort_inner(id) {
            Teardown::Done(_) => {
                if !starting {
                    self.free(id);
                }
                AbortResult::Done
            }
            Teardown::Pending => AbortResult::Pending(id),
        }
    }

    /// Abort every live branch.
    fn par_abort_inner(&mut self, id: FrameId) -> Teardown {
        self.frame_mut(id).aborted = true;
        let children: Vec<(usize, FrameId)> = state_mut!(self, id, Par)
            .children
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.map(|c| (i, c)))
            .collect();
        for (i, child) in children {
            match self.abort(child) {
                AbortResult::Pending(next) => self.set_branch(id, i, next),
                AbortResult::Done => {
                    let state = state_mut!(self, id, Par);
                    state.children[i] = None;
                    state.pending = state.pending.saturating_sub(1);
                }
            }
        }
        let state = state_mut!(self, id, Par);
        if state.pending == 0 {
            Teardown::Done(state.pending_signal.take().unwrap_or_else(Completion::null))
        } else {
            self.frame_mut(id).is_async = true;
            Teardown::Pending
        }
    }
}
