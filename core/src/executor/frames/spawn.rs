//! Spawned strata and waiting on their values
//!
//! A spawn frame is the root of an independent strand. Its completion goes
//! to the stratum handle instead of a parent frame. Frames blocked on
//! `value()` are kept as waiters on the handle and continued when the
//! strand settles.

use crate::executor::arena::FrameId;
use crate::executor::env::Env;
use crate::executor::errors;
use crate::executor::handles::StratumHandle;
use crate::executor::host::Origin;
use crate::executor::scheduler::Task;
use crate::executor::types::{
    AbortResult, Completion, FrameKind, Node, NodeRef, Outcome, Parent, Signal, SpawnFrame, Val,
    WaitFrame,
};
use crate::executor::vm::{Engine, Flow};
use std::rc::Rc;
use tracing::debug;

impl Engine {
    pub(crate) fn spawn_start(&mut self, node: &NodeRef, env: &Rc<Env>) -> Outcome {
        let Node::Spawn { line, body } = &**node else {
            unreachable!("spawn_start called with {}", node.name());
        };
        let stratum = StratumHandle::new(self.next_stratum_id(), *line, env.file.clone());
        let id = self.alloc(
            FrameKind::Spawn(SpawnFrame {
                stratum: stratum.clone(),
            }),
            env.clone(),
        );
        self.frame_mut(id).parent = Parent::Strand(stratum.clone());
        stratum.borrow_mut().frame = Some(id);
        debug!(stratum = stratum.id(), frame = %id, "spawn");

        match self.run_child(id, body, env, 0) {
            Flow::Suspended => stratum.borrow_mut().running = true,
            Flow::Done(c) => {
                self.return_to_parent(id, c);
            }
            Flow::Aborted => {}
        }
        Outcome::Done(Completion::Value(Val::Stratum(stratum)))
    }

    /// Record the strand's completion and wake whoever waits for it.
    pub(crate) fn finish_strand(&mut self, stratum: &StratumHandle, completion: Completion) {
        let waiters = {
            let mut data = stratum.borrow_mut();
            if data.settled {
                return;
            }
            data.settled = true;
            data.running = false;
            data.frame = None;
            data.value = Some(completion.clone());
            if !data.waiters.is_empty() {
                data.picked_up = true;
            }
            std::mem::take(&mut data.waiters)
        };
        debug!(stratum = stratum.id(), waiters = waiters.len(), "stratum settled");
        if waiters.is_empty() {
            if completion.is_signal() {
                // Give the spawner this turn to pick the value up
                self.scheduler().defer(Task::CheckStratum(stratum.clone()));
            }
            return;
        }
        for waiter in waiters {
            self.cont(waiter, 0, completion.clone());
        }
    }

    /// Report a failed strand whose value nobody picked up.
    pub(crate) fn check_stratum(&mut self, stratum: &StratumHandle) {
        let (id, signal) = {
            let data = stratum.borrow();
            match (&data.value, data.picked_up) {
                (Some(Completion::Signal(signal)), false) => (data.id, signal.clone()),
                _ => return,
            }
        };
        self.report(Origin::Stratum(id), &signal);
    }

    /// Methods of a stratum handle value.
    pub(crate) fn stratum_method(
        &mut self,
        stratum: &StratumHandle,
        method: &str,
        env: &Rc<Env>,
        line: u32,
    ) -> Outcome {
        let value = match method {
            "value" | "waitforValue" => return self.stratum_value(stratum, env),
            "running" => Val::Bool(self.stratum_running(stratum)),
            "waiting" => Val::Num(self.stratum_waiting(stratum) as f64),
            "abort" => {
                self.stratum_abort(stratum, line, &env.file);
                Val::Null
            }
            other => {
                return Outcome::Done(Completion::Signal(Signal::error(
                    errors::TYPE_ERROR,
                    format!("'{}' is not a method of stratum", other),
                    line,
                    &env.file,
                )))
            }
        };
        Outcome::Done(Completion::Value(value))
    }

    /// The strand's completion, or a wait frame that receives it later.
    pub fn stratum_value(&mut self, stratum: &StratumHandle, env: &Rc<Env>) -> Outcome {
        {
            let mut data = stratum.borrow_mut();
            if data.settled {
                data.picked_up = true;
                return Outcome::Done(data.value.clone().unwrap_or_else(Completion::null));
            }
        }
        let wait = self.alloc(
            FrameKind::Wait(WaitFrame {
                stratum: stratum.clone(),
            }),
            env.clone(),
        );
        stratum.borrow_mut().waiters.push(wait);
        self.suspend(wait)
    }

    pub fn stratum_running(&self, stratum: &StratumHandle) -> bool {
        stratum.is_running()
    }

    /// Number of frames blocked in `value()`
    pub fn stratum_waiting(&self, stratum: &StratumHandle) -> usize {
        stratum.waiting()
    }

    /// Cancel a running strand; waiters get a "stratum aborted" throw.
    pub fn stratum_abort(&mut self, stratum: &StratumHandle, line: u32, file: &str) {
        let aborted = Completion::Signal(Signal::error(
            errors::STRATUM_ABORTED,
            "stratum aborted",
            line,
            file,
        ));
        let (frame, waiters) = {
            let mut data = stratum.borrow_mut();
            if data.settled {
                return;
            }
            data.settled = true;
            data.running = false;
            data.picked_up = true;
            data.value = Some(aborted.clone());
            (data.frame.take(), std::mem::take(&mut data.waiters))
        };
        debug!(stratum = stratum.id(), "stratum aborted");
        if let Some(frame) = frame {
            self.cancel(frame);
        }
        for waiter in waiters {
            self.cont(waiter, 0, aborted.clone());
        }
    }

    pub(crate) fn wait_abort(&mut self, id: FrameId) -> AbortResult {
        let stratum = match &self.frame(id).kind {
            FrameKind::Wait(w) => w.stratum.clone(),
            other => unreachable!("wait_abort called on {}", other.name()),
        };
        stratum.borrow_mut().waiters.retain(|w| *w != id);
        self.free(id);
        AbortResult::Done
    }

    /* ===================== Hold ===================== */

    /// Suspend forever; only an abort ends it.
    pub(crate) fn hold_start(&mut self, env: &Rc<Env>) -> Outcome {
        let id = self.alloc(FrameKind::Hold, env.clone());
        self.suspend(id)
    }
}
