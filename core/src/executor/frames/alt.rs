//! Alternation (wait-any) frames and collapse
//!
//! The first branch to finish wins; the others are quenched and aborted
//! before the winner's completion is handed on. A branch can also claim
//! the win early with `collapse`, which suspends until every sibling has
//! finished tearing down.

use super::par::Teardown;
use crate::executor::arena::FrameId;
use crate::executor::env::{Env, Fold};
use crate::executor::errors;
use crate::executor::types::{
    AbortResult, AltFrame, Completion, FrameKind, Node, NodeRef, Outcome, Signal, Val,
};
use crate::executor::vm::{state_mut, Engine};
use std::rc::Rc;
use tracing::debug;

impl Engine {
    pub(crate) fn alt_start(&mut self, node: &NodeRef, env: &Rc<Env>) -> Outcome {
        let Node::Alt { branches } = &**node else {
            unreachable!("alt_start called with {}", node.name());
        };
        if branches.is_empty() {
            return Outcome::Done(Completion::null());
        }
        let id = self.alloc(
            FrameKind::Alt(AltFrame {
                node: node.clone(),
                children: vec![None; branches.len()],
                pending: 0,
                pending_result: None,
                collapsing: None,
                winner: None,
                starting: true,
            }),
            env.clone(),
        );

        for (i, branch) in branches.iter().enumerate() {
            let state = state_mut!(self, id, Alt);
            if state.winner.is_some() || state.collapsing.is_some() {
                break;
            }
            let branch_env = Rc::new(Env {
                fold: Some(Fold {
                    frame: id,
                    branch: i,
                }),
                ..(**env).clone()
            });
            match self.exec(branch, &branch_env) {
                Outcome::Pending(child) => {
                    state_mut!(self, id, Alt).pending += 1;
                    self.set_branch(id, i, child);
                }
                Outcome::Done(c) => {
                    if !self.frame(id).aborted {
                        self.alt_win(id, c);
                    }
                }
                Outcome::Delivered => {}
            }
            if self.frame(id).aborted {
                break;
            }
        }

        state_mut!(self, id, Alt).starting = false;
        if self.frame(id).aborted {
            return match self.alt_abort_inner(id) {
                Teardown::Done(c) => self.return_to_parent(id, c),
                Teardown::Pending => self.suspend(id),
            };
        }
        self.suspend(id)
    }

    /// Record the first completion and quench the rest. Teardown happens
    /// in the caller.
    fn alt_win(&mut self, id: FrameId, completion: Completion) {
        state_mut!(self, id, Alt).pending_result = Some(completion);
        self.alt_quench(id, None);
        self.frame_mut(id).aborted = true;
    }

    pub(crate) fn alt_cont(&mut self, id: FrameId, idx: usize, completion: Completion) -> Outcome {
        let aborted = self.frame(id).aborted;
        let state = state_mut!(self, id, Alt);
        state.pending = state.pending.saturating_sub(1);
        if let Some(slot) = state.children.get_mut(idx) {
            *slot = None;
        }
        let starting = state.starting;

        if let Some((branch, collapse)) = state.collapsing {
            if idx != branch {
                let others_live = state
                    .children
                    .iter()
                    .enumerate()
                    .any(|(k, c)| k != branch && c.is_some());
                if !others_live {
                    state.collapsing = None;
                    state.winner = Some(branch);
                    debug!(frame = %id, branch, "collapse settled");
                    self.cont(collapse, 0, Completion::Value(Val::Bool(true)));
                }
                return Outcome::Delivered;
            }
            state.collapsing = None;
        }

        if aborted {
            let state = state_mut!(self, id, Alt);
            if starting || state.pending > 0 {
                return Outcome::Delivered;
            }
            let result = state.pending_result.take().unwrap_or_else(Completion::null);
            return self.return_to_parent(id, result);
        }

        self.alt_win(id, completion);
        if starting {
            return Outcome::Delivered;
        }
        match self.alt_abort_inner(id) {
            Teardown::Done(c) => self.return_to_parent(id, c),
            Teardown::Pending => Outcome::Pending(id),
        }
    }

    /// Quench live branches other than `except`. While collapsing only the
    /// collapsing branch is still running normally.
    pub(crate) fn alt_quench(&mut self, id: FrameId, except: Option<usize>) {
        if self.frame(id).aborted {
            return;
        }
        let state = state_mut!(self, id, Alt);
        let targets: Vec<FrameId> = match state.collapsing {
            Some((branch, _)) => state.children[branch].into_iter().collect(),
            None => state
                .children
                .iter()
                .enumerate()
                .filter(|(k, _)| Some(*k) != except)
                .filter_map(|(_, c)| *c)
                .collect(),
        };
        for child in targets {
            self.quench(child);
        }
    }

    pub(crate) fn alt_abort(&mut self, id: FrameId) -> AbortResult {
        if self.frame(id).aborted {
            let state = state_mut!(self, id, Alt);
            state.pending_result = None;
            return if state.pending > 0 {
                AbortResult::Pending(id)
            } else {
                AbortResult::Done
            };
        }
        let starting = state_mut!(self, id, Alt).starting;
        match self.alt_abort_inner(id) {
            Teardown::Done(_) => {
                if !starting {
                    self.free(id);
                }
                AbortResult::Done
            }
            Teardown::Pending => AbortResult::Pending(id),
        }
    }

    /// Abort the live branches. While collapsing, the losers are already
    /// going down and only the collapsing branch is left to abort.
    fn alt_abort_inner(&mut self, id: FrameId) -> Teardown {
        self.frame_mut(id).aborted = true;
        let state = state_mut!(self, id, Alt);
        let targets: Vec<(usize, FrameId)> = match state.collapsing.take() {
            Some((branch, _)) => state.children[branch].map(|c| (branch, c)).into_iter().collect(),
            None => live_branches(&state.children, None),
        };
        self.abort_branches(id, targets);
        let state = state_mut!(self, id, Alt);
        if state.pending == 0 {
            Teardown::Done(state.pending_result.take().unwrap_or_else(Completion::null))
        } else {
            self.frame_mut(id).is_async = true;
            Teardown::Pending
        }
    }

    fn abort_branches(&mut self, id: FrameId, targets: Vec<(usize, FrameId)>) {
        for (i, child) in targets {
            match self.abort(child) {
                AbortResult::Pending(next) => self.set_branch(id, i, next),
                AbortResult::Done => {
                    let state = state_mut!(self, id, Alt);
                    state.children[i] = None;
                    state.pending = state.pending.saturating_sub(1);
                }
            }
        }
    }

    /// Make `branch` the winner of alternation `id`. Returns true when all
    /// other branches are gone; otherwise `collapse` waits for them.
    fn alt_collapse(&mut self, id: FrameId, branch: usize, collapse: FrameId) -> bool {
        self.alt_quench(id, Some(branch));
        let state = state_mut!(self, id, Alt);
        let others = live_branches(&state.children, Some(branch));
        self.abort_branches(id, others);
        let state = state_mut!(self, id, Alt);
        if live_branches(&state.children, Some(branch)).is_empty() {
            state.winner = Some(branch);
            true
        } else {
            state.collapsing = Some((branch, collapse));
            false
        }
    }

    /* ===================== Collapse ===================== */

    pub(crate) fn collapse_start(&mut self, line: u32, env: &Rc<Env>) -> Outcome {
        let Some(fold) = env.fold else {
            return Outcome::Done(Completion::Signal(Signal::error(
                errors::INTERNAL_ERROR,
                "Unexpected collapse statement",
                line,
                &env.file,
            )));
        };
        let claimable = match self.try_frame(fold.frame).map(|f| (&f.kind, f.aborted)) {
            Some((FrameKind::Alt(alt), aborted)) => {
                if aborted {
                    Some(false)
                } else {
                    match (alt.winner, alt.collapsing) {
                        (None, None) => Some(true),
                        (Some(w), _) => Some(w == fold.branch),
                        (None, Some(_)) => Some(false),
                    }
                }
            }
            _ => None,
        };
        match claimable {
            None => Outcome::Done(Completion::Signal(Signal::error(
                errors::INTERNAL_ERROR,
                "collapse outside of an active alternation",
                line,
                &env.file,
            ))),
            // Another branch already won, or this one already collapsed
            Some(false) => Outcome::Done(Completion::Value(Val::Bool(false))),
            Some(true) => {
                let cf = self.alloc(FrameKind::Collapse, env.clone());
                if self.alt_collapse(fold.frame, fold.branch, cf) {
                    self.free(cf);
                    Outcome::Done(Completion::Value(Val::Bool(true)))
                } else {
                    self.suspend(cf)
                }
            }
        }
    }
}

fn live_branches(children: &[Option<FrameId>], except: Option<usize>) -> Vec<(usize, FrameId)> {
    children
        .iter()
        .enumerate()
        .filter(|(k, _)| Some(*k) != except)
        .filter_map(|(k, c)| c.map(|c| (k, c)))
        .collect()
}
