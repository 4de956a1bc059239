//! Engine - owns the frame arena and drives the frame protocol
//!
//! Every suspendable operator is a frame in the arena. A frame is driven by
//! three operations:
//!
//! - `cont(id, idx, completion)`: a child reported; `idx` says which one
//! - `quench(id)`: first phase of cancellation; resume handles stop firing
//! - `abort(id)`: second phase; tear down, possibly asynchronously
//!
//! Synchronous completion travels back through return values. Once a frame
//! has been adopted by a parent, its completion is delivered with `cont`
//! on the parent instead.

use super::arena::{Arena, FrameId};
use super::env::Env;
use super::handles::Closure;
use super::host::{Host, Origin, Reporter};
use super::scheduler::{Scheduler, Task};
use super::trace;
use super::types::{
    AbortResult, Completion, Frame, FrameKind, Node, NodeRef, Outcome, Parent, RootId, Signal,
    Val,
};
use crate::config::Config;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Access the kind state of a live frame.
///
/// Panics on a dead id or a kind mismatch. Ids only reach a step function
/// while their frame is live and of that kind, so either case is an engine
/// bug that no program can trigger.
macro_rules! state_mut {
    ($engine:expr, $id:expr, $kind:ident) => {
        match &mut $engine.frame_mut($id).kind {
            $crate::executor::types::FrameKind::$kind(state) => state,
            other => panic!(
                "frame {} is {}, expected {}",
                $id,
                other.name(),
                stringify!($kind)
            ),
        }
    };
}
pub(crate) use state_mut;

/// Result of running a child node on behalf of a frame
pub(crate) enum Flow {
    Done(Completion),
    /// Child was adopted; the frame must return `Pending`
    Suspended,
    /// Frame was aborted while the child ran synchronously
    Aborted,
}

pub struct Engine {
    arena: Arena<Frame>,
    host: Box<dyn Host>,
    scheduler: Scheduler,
    reporter: Reporter,
    roots: HashMap<RootId, Option<Completion>>,
    next_root: u64,
    next_stratum: u64,
    pub(crate) trace_depth: usize,
}

impl Engine {
    pub fn new(host: Box<dyn Host>, config: &Config) -> Self {
        Engine {
            arena: Arena::new(),
            host,
            scheduler: Scheduler::new(),
            reporter: Reporter::default(),
            roots: HashMap::new(),
            next_root: 0,
            next_stratum: 0,
            trace_depth: config.trace_depth,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    pub fn host_mut(&mut self) -> &mut dyn Host {
        self.host.as_mut()
    }

    /// Number of frames currently alive
    pub fn live_frames(&self) -> usize {
        self.arena.len()
    }

    pub fn reported(&self) -> usize {
        self.reporter.reported()
    }

    /* ===================== Frame Storage ===================== */

    pub(crate) fn is_live(&self, id: FrameId) -> bool {
        self.arena.contains(id)
    }

    /// Live frame `id`. Panics if it was freed; callers that may hold a
    /// stale id use [`Engine::try_frame`].
    pub(crate) fn frame(&self, id: FrameId) -> &Frame {
        match self.arena.get(id) {
            Some(frame) => frame,
            None => panic!("frame {} is not live", id),
        }
    }

    pub(crate) fn frame_mut(&mut self, id: FrameId) -> &mut Frame {
        match self.arena.get_mut(id) {
            Some(frame) => frame,
            None => panic!("frame {} is not live", id),
        }
    }

    pub(crate) fn try_frame(&self, id: FrameId) -> Option<&Frame> {
        self.arena.get(id)
    }

    pub(crate) fn alloc(&mut self, kind: FrameKind, env: Rc<Env>) -> FrameId {
        let id = self.arena.insert(Frame::new(kind, env));
        trace!(frame = %id, "alloc");
        id
    }

    pub(crate) fn alloc_with(
        &mut self,
        kind: impl FnOnce(FrameId) -> FrameKind,
        env: Rc<Env>,
    ) -> FrameId {
        let id = self.arena.insert_with(|id| Frame::new(kind(id), env));
        trace!(frame = %id, "alloc");
        id
    }

    pub(crate) fn free(&mut self, id: FrameId) {
        self.arena.remove(id);
    }

    pub(crate) fn env_of(&self, id: FrameId) -> Rc<Env> {
        self.frame(id).env.clone()
    }

    /// Mark the frame asynchronous and report it as pending.
    pub(crate) fn suspend(&mut self, id: FrameId) -> Outcome {
        self.frame_mut(id).is_async = true;
        Outcome::Pending(id)
    }

    pub(crate) fn next_stratum_id(&mut self) -> u64 {
        self.next_stratum += 1;
        self.next_stratum
    }

    /* ===================== Entry Points ===================== */

    /// Run `node` in `env`.
    ///
    /// A pending result must be attached with [`Engine::attach_root`] (or
    /// adopted by a frame) before the scheduler runs.
    pub fn execute(&mut self, node: &NodeRef, env: Rc<Env>) -> Outcome {
        self.exec(node, &env)
    }

    /// Run a block-lambda body.
    ///
    /// `env` is the environment captured where the block lambda was created,
    /// so its `blref` is the sequence that a bare break or return inside the
    /// body unwinds to.
    pub fn execute_block(&mut self, node: &NodeRef, env: Rc<Env>) -> Outcome {
        if env.blref.is_none() {
            warn!("block lambda executed without a block-exit reference");
        }
        self.exec(node, &env)
    }

    /// Make a pending frame a program root owned by the driver.
    pub fn attach_root(&mut self, id: FrameId) -> RootId {
        self.next_root += 1;
        let root = RootId(self.next_root);
        self.frame_mut(id).parent = Parent::Root(root);
        self.roots.insert(root, None);
        root
    }

    /// Take the completion of a finished root.
    pub fn take_root(&mut self, root: RootId) -> Option<Completion> {
        if self.roots.get(&root).map_or(false, Option::is_some) {
            self.roots.remove(&root).flatten()
        } else {
            None
        }
    }

    /// Dispatch on the node type.
    pub(crate) fn exec(&mut self, node: &NodeRef, env: &Rc<Env>) -> Outcome {
        match &**node {
            Node::Lit { v } => Outcome::Done(Completion::Value(v.clone())),
            Node::Var { name } => match env.args.get(name) {
                Some(v) => Outcome::Done(Completion::Value(v)),
                None => Outcome::Done(Completion::Signal(Signal::error(
                    super::errors::REFERENCE_ERROR,
                    format!("{} is not defined", name),
                    0,
                    &env.file,
                ))),
            },
            Node::Func {
                params,
                body,
                block,
            } => Outcome::Done(Completion::Value(Val::Func(Closure::new(
                params.clone(),
                body.clone(),
                env.clone(),
                *block,
            )))),
            Node::Seq { .. } => self.seq_start(node, env),
            Node::Sc { .. } => self.sc_start(node, env),
            Node::Call { .. } | Node::MethodCall { .. } => self.call_start(node, env),
            Node::If { .. } => self.if_start(node, env),
            Node::Switch { .. } => self.switch_start(node, env),
            Node::Try { .. } => self.try_start(node, env),
            Node::Loop { .. } => self.loop_start(node, env),
            Node::ForIn { .. } => self.for_in_start(node, env),
            Node::Par { .. } => self.par_start(node, env),
            Node::Alt { .. } => self.alt_start(node, env),
            Node::Suspend { .. } => self.suspend_start(node, env),
            Node::Spawn { .. } => self.spawn_start(node, env),
            Node::Collapse { line } => self.collapse_start(*line, env),
            Node::Hold => self.hold_start(env),
        }
    }

    /* ===================== Frame Protocol ===================== */

    /// Deliver a child's completion to frame `id`.
    pub(crate) fn cont(&mut self, id: FrameId, idx: usize, completion: Completion) -> Outcome {
        let Some(frame) = self.arena.get_mut(id) else {
            warn!(frame = %id, "completion for stale frame dropped");
            return Outcome::Delivered;
        };
        if !frame.kind.has_custom_abort() {
            frame.child = None;
            if frame.aborted {
                return self.return_to_parent(id, completion);
            }
        }
        let step: fn(&mut Engine, FrameId, usize, Completion) -> Outcome = match &frame.kind {
            FrameKind::Seq(_) => Engine::seq_cont,
            FrameKind::Sc(_) => Engine::sc_cont,
            FrameKind::Call(_) => Engine::call_cont,
            FrameKind::If(_) => Engine::if_cont,
            FrameKind::Switch(_) => Engine::switch_cont,
            FrameKind::Try(_) => Engine::try_cont,
            FrameKind::Loop(_) => Engine::loop_cont,
            FrameKind::ForIn(_) => Engine::for_in_cont,
            FrameKind::Par(_) => Engine::par_cont,
            FrameKind::Alt(_) => Engine::alt_cont,
            FrameKind::Suspend(_) => Engine::suspend_cont,
            FrameKind::Spawn(_)
            | FrameKind::Collapse
            | FrameKind::Wait(_)
            | FrameKind::Hold => Engine::forward_cont,
        };
        step(self, id, idx, completion)
    }

    fn forward_cont(&mut self, id: FrameId, _idx: usize, completion: Completion) -> Outcome {
        self.return_to_parent(id, completion)
    }

    /// First phase of cancellation. Idempotent.
    pub fn quench(&mut self, id: FrameId) {
        let Some(frame) = self.arena.get(id) else {
            return;
        };
        let child = frame.child.map(|(c, _)| c);
        match &frame.kind {
            FrameKind::Par(_) => self.par_quench(id),
            FrameKind::Alt(_) => self.alt_quench(id, None),
            FrameKind::Try(_) => self.try_quench(id),
            FrameKind::Suspend(s) => {
                s.handle.close();
                if let Some(c) = child {
                    self.quench(c);
                }
            }
            FrameKind::Hold | FrameKind::Collapse | FrameKind::Wait(_) => {}
            _ => {
                if let Some(c) = child {
                    self.quench(c);
                }
            }
        }
    }

    /// Second phase of cancellation.
    ///
    /// The frame is detached first: whatever it produces from now on is
    /// discarded unless the aborter re-adopts it from a `Pending` result.
    pub fn abort(&mut self, id: FrameId) -> AbortResult {
        let Some(frame) = self.arena.get_mut(id) else {
            return AbortResult::Done;
        };
        frame.parent = Parent::Detached;
        trace!(frame = %id, kind = frame.kind.name(), "abort");
        let step: fn(&mut Engine, FrameId) -> AbortResult = match &frame.kind {
            FrameKind::Par(_) => Engine::par_abort,
            FrameKind::Alt(_) => Engine::alt_abort,
            FrameKind::Try(_) => Engine::try_abort,
            FrameKind::Hold | FrameKind::Collapse => Engine::abort_leaf,
            FrameKind::Wait(_) => Engine::wait_abort,
            FrameKind::Suspend(s) => {
                s.handle.close();
                Engine::abort_forward
            }
            _ => Engine::abort_forward,
        };
        step(self, id)
    }

    fn abort_leaf(&mut self, id: FrameId) -> AbortResult {
        self.free(id);
        AbortResult::Done
    }

    /// Abort for frames with a single child: forward to the child.
    fn abort_forward(&mut self, id: FrameId) -> AbortResult {
        let frame = self.frame_mut(id);
        let already = std::mem::replace(&mut frame.aborted, true);
        let child = frame.child;
        match child {
            // Mid-execution: the running step sees the flag and finishes
            None => AbortResult::Done,
            Some(_) if already => AbortResult::Pending(id),
            Some((child, idx)) => match self.abort(child) {
                AbortResult::Pending(next) => {
                    self.set_child(id, next, idx);
                    AbortResult::Pending(id)
                }
                AbortResult::Done => {
                    self.free(id);
                    AbortResult::Done
                }
            },
        }
    }

    /// Quench then abort; used wherever a subtree loses.
    pub(crate) fn cancel(&mut self, id: FrameId) -> AbortResult {
        self.quench(id);
        self.abort(id)
    }

    /// Free frame `id` and hand its completion on.
    ///
    /// Returns the completion itself if the frame was never adopted, and
    /// `Delivered` otherwise.
    pub(crate) fn return_to_parent(&mut self, id: FrameId, completion: Completion) -> Outcome {
        let Some(frame) = self.arena.remove(id) else {
            warn!(frame = %id, "return from stale frame dropped");
            return Outcome::Delivered;
        };
        let mut completion = completion;
        if let Completion::Signal(Signal::Throw(thrown)) = &mut completion {
            if let Val::Error(info) = &mut thrown.value {
                if !frame.callstack.is_empty() {
                    info.extend_trace(&frame.callstack, self.trace_depth);
                }
            }
        }
        match frame.parent {
            Parent::Unset => Outcome::Done(completion),
            Parent::Frame { id: parent, idx } => {
                self.cont(parent, idx, completion);
                Outcome::Delivered
            }
            Parent::Root(root) => {
                debug!(root = root.0, "program root settled");
                self.roots.insert(root, Some(completion));
                Outcome::Delivered
            }
            Parent::Strand(stratum) => {
                self.finish_strand(&stratum, completion);
                Outcome::Delivered
            }
            Parent::Detached => {
                if let Completion::Signal(Signal::Throw(thrown)) = &completion {
                    debug!(frame = %id, error = %thrown.error_info(), "throw from aborted frame discarded");
                }
                Outcome::Delivered
            }
        }
    }

    /// Adopt `child` as the current child of `id`.
    pub(crate) fn set_child(&mut self, id: FrameId, child: FrameId, idx: usize) {
        let prev = self.frame(id).child;
        if let Some((prev, _)) = prev {
            if prev != child {
                self.inherit_callstack(prev, child);
            }
        }
        let frame = self.frame_mut(id);
        frame.child = Some((child, idx));
        frame.is_async = true;
        if let Some(c) = self.arena.get_mut(child) {
            c.parent = Parent::Frame { id, idx };
        }
    }

    /// Adopt `child` as branch `idx` of a Par or Alt frame.
    ///
    /// Panics if `id` is neither; only the Par and Alt steps call this.
    pub(crate) fn set_branch(&mut self, id: FrameId, idx: usize, child: FrameId) {
        let prev = match &self.frame(id).kind {
            FrameKind::Par(p) => p.children[idx],
            FrameKind::Alt(a) => a.children[idx],
            other => panic!("frame {} is {}, expected a branching frame", id, other.name()),
        };
        if let Some(prev) = prev {
            if prev != child {
                self.inherit_callstack(prev, child);
            }
        }
        let frame = self.frame_mut(id);
        frame.is_async = true;
        match &mut frame.kind {
            FrameKind::Par(p) => p.children[idx] = Some(child),
            FrameKind::Alt(a) => a.children[idx] = Some(child),
            _ => {}
        }
        if let Some(c) = self.arena.get_mut(child) {
            c.parent = Parent::Frame { id, idx };
        }
    }

    /// Record that suspended frame `id` was entered from `file:line`.
    pub(crate) fn push_call_site(&mut self, id: FrameId, file: &str, line: u32) {
        let depth = self.trace_depth;
        if let Some(frame) = self.arena.get_mut(id) {
            frame.callstack.push(super::trace::TraceEntry::at(file, line));
            trace::cap(&mut frame.callstack, depth);
        }
    }

    fn inherit_callstack(&mut self, from: FrameId, to: FrameId) {
        let Some(src) = self
            .arena
            .get_mut(from)
            .map(|f| std::mem::take(&mut f.callstack))
        else {
            return;
        };
        let depth = self.trace_depth;
        if let Some(dst) = self.arena.get_mut(to) {
            trace::merge(&mut dst.callstack, src, depth);
        }
    }

    /// Run `node` as the child of `id` reporting with `idx`.
    pub(crate) fn run_child(
        &mut self,
        id: FrameId,
        node: &NodeRef,
        env: &Rc<Env>,
        idx: usize,
    ) -> Flow {
        self.frame_mut(id).child = None;
        match self.exec(node, env) {
            Outcome::Done(c) => Flow::Done(c),
            Outcome::Pending(child) => {
                self.set_child(id, child, idx);
                Flow::Suspended
            }
            Outcome::Delivered => Flow::Done(Completion::internal(
                "synchronous execution delivered its result",
            )),
        }
    }

    /// Like [`Engine::run_child`], but notices an abort of `id` that
    /// happened while the child ran synchronously. A pending child is then
    /// cancelled rather than adopted.
    pub(crate) fn run_child_checked(
        &mut self,
        id: FrameId,
        node: &NodeRef,
        env: &Rc<Env>,
        idx: usize,
    ) -> Flow {
        self.frame_mut(id).child = None;
        let out = self.exec(node, env);
        if self.arena.get(id).map_or(true, |f| f.aborted) {
            if let Outcome::Pending(child) = out {
                self.cancel(child);
            }
            return Flow::Aborted;
        }
        match out {
            Outcome::Done(c) => Flow::Done(c),
            Outcome::Pending(child) => {
                self.set_child(id, child, idx);
                Flow::Suspended
            }
            Outcome::Delivered => Flow::Done(Completion::internal(
                "synchronous execution delivered its result",
            )),
        }
    }

    /* ===================== Deferred Work ===================== */

    pub fn run_task(&mut self, task: Task) {
        match task {
            Task::Resume(handle) => self.resume(&handle),
            Task::Fire { handle, payload } => {
                handle.resume(payload);
            }
            Task::CheckStratum(stratum) => self.check_stratum(&stratum),
        }
    }

    /// Hand an uncaught failure to the host, once per error.
    pub(crate) fn report(&mut self, origin: Origin, signal: &Signal) -> bool {
        let info = signal.escaped();
        self.reporter.report(self.host.as_mut(), origin, info)
    }

    pub(crate) fn host_call(
        &mut self,
        name: &str,
        args: Vec<Val>,
        line: u32,
        file: &str,
    ) -> Result<Val, Val> {
        let cx = super::host::HostCx {
            scheduler: &self.scheduler,
            line,
            file,
        };
        self.host.call(name, args, &cx)
    }
}
