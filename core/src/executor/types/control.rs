//! Control signals, completions and execution frame types

use super::super::arena::FrameId;
use super::super::env::Env;
use super::super::errors::{self, ErrorInfo};
use super::super::handles::{ResumeHandle, StratumHandle};
use super::super::trace::TraceEntry;
use super::ast::NodeRef;
use super::phase::{SuspendPhase, SwitchPhase, TryPhase};
use super::values::Val;
use std::collections::VecDeque;
use std::rc::Rc;

/* ===================== Control Signals ===================== */

/// A thrown value together with where it was thrown
#[derive(Debug, Clone, PartialEq)]
pub struct Thrown {
    pub value: Val,
    pub line: u32,
    pub file: String,
}

impl Thrown {
    /// The thrown value as an error record, wrapping plain values.
    pub fn error_info(&self) -> ErrorInfo {
        match &self.value {
            Val::Error(info) => info.clone(),
            other => {
                let mut info = ErrorInfo::new(errors::USER_ERROR, other.display());
                info.line = self.line;
                info.file = Some(self.file.clone());
                info
            }
        }
    }
}

/// Non-local control transfer travelling up the frame tree
///
/// The innermost construct that understands a signal intercepts it.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// `target: None` means the nearest function scope
    Return { value: Val, target: Option<FrameId> },
    Break(Option<String>),
    Continue(Option<String>),
    Throw(Thrown),
    /// Exit from a block lambda, aimed at the frame that established it
    BlockExit {
        label: Option<String>,
        target: FrameId,
    },
    /// Engine invariant violation
    Internal(String),
}

impl Signal {
    /// Throw `value` from `line` of `file`.
    ///
    /// Error values are stamped with a provenance id, line and file the
    /// first time they are thrown. Rethrowing keeps the original stamp.
    pub fn throw(value: Val, line: u32, file: &str) -> Signal {
        let mut value = value;
        if let Val::Error(info) = &mut value {
            info.stamp(line, file);
        }
        Signal::Throw(Thrown {
            value,
            line,
            file: file.to_string(),
        })
    }

    /// Throw a freshly built error.
    pub fn error(code: &str, message: impl Into<String>, line: u32, file: &str) -> Signal {
        Signal::throw(Val::Error(ErrorInfo::new(code, message)), line, file)
    }

    pub fn is_throw(&self) -> bool {
        matches!(self, Signal::Throw(_))
    }

    /// Error record describing this signal when it escapes to the top.
    pub fn escaped(&self) -> ErrorInfo {
        match self {
            Signal::Throw(thrown) => thrown.error_info(),
            Signal::Break(_) => ErrorInfo::new(errors::INTERNAL_ERROR, "Unexpected break statement"),
            Signal::Continue(_) => {
                ErrorInfo::new(errors::INTERNAL_ERROR, "Unexpected continue statement")
            }
            Signal::Return { .. } => {
                ErrorInfo::new(errors::INTERNAL_ERROR, "Unexpected return statement")
            }
            Signal::BlockExit { .. } => {
                ErrorInfo::new(errors::BLOCK_EXIT_ERROR, "Unexpected blocklambda break")
            }
            Signal::Internal(msg) => ErrorInfo::new(errors::INTERNAL_ERROR, msg.clone()),
        }
    }
}

/// Result of a finished frame: a value or a control signal
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Value(Val),
    Signal(Signal),
}

impl Completion {
    pub fn null() -> Completion {
        Completion::Value(Val::Null)
    }

    pub fn internal(msg: impl Into<String>) -> Completion {
        Completion::Signal(Signal::Internal(msg.into()))
    }

    pub fn is_signal(&self) -> bool {
        matches!(self, Completion::Signal(_))
    }
}

/// Result of executing or continuing a frame
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Finished synchronously
    Done(Completion),
    /// Suspended; the frame will report later
    Pending(FrameId),
    /// Finished asynchronously; the completion went to the parent
    Delivered,
}

/// Result of aborting a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AbortResult {
    /// Torn down synchronously
    Done,
    /// Teardown continues; this frame reports once finished
    Pending(FrameId),
}

/// Who receives a frame's completion
#[derive(Debug, Clone, PartialEq)]
pub enum Parent {
    /// Not adopted yet; completion is returned to the caller
    Unset,
    Frame { id: FrameId, idx: usize },
    /// Driver-owned program root
    Root(RootId),
    /// Body of a spawned stratum
    Strand(StratumHandle),
    /// Aborted; completion is discarded
    Detached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RootId(pub u64);

/* ===================== Frames ===================== */

#[derive(Debug, Clone)]
pub struct SeqFrame {
    pub node: NodeRef,
}

#[derive(Debug, Clone)]
pub struct ScFrame {
    pub node: NodeRef,
    pub args: Vec<Val>,
}

/// Call and method-call state; `operands[0]` is the callee or receiver
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub node: NodeRef,
    pub operands: Vec<Val>,
}

#[derive(Debug, Clone)]
pub struct IfFrame {
    pub node: NodeRef,
}

#[derive(Debug, Clone)]
pub struct SwitchFrame {
    pub node: NodeRef,
    pub phase: SwitchPhase,
    pub testval: Val,
    pub clause: usize,
    pub last: Val,
}

#[derive(Debug, Clone)]
pub struct TryFrame {
    pub node: NodeRef,
    pub phase: TryPhase,
    /// Result of body/catch, saved while retract and finally run
    pub rv: Option<Completion>,
}

#[derive(Debug, Clone)]
pub struct LoopFrame {
    pub node: NodeRef,
}

#[derive(Debug, Clone)]
pub struct ForInFrame {
    pub node: NodeRef,
    /// Keys not yet visited, collected once the body first suspends
    pub remaining: VecDeque<String>,
    pub last: Val,
}

#[derive(Debug, Clone)]
pub struct ParFrame {
    pub node: NodeRef,
    pub children: Vec<Option<FrameId>>,
    pub pending: usize,
    pub pending_signal: Option<Completion>,
    pub starting: bool,
}

#[derive(Debug, Clone)]
pub struct AltFrame {
    pub node: NodeRef,
    pub children: Vec<Option<FrameId>>,
    pub pending: usize,
    pub pending_result: Option<Completion>,
    /// Branch that collapsed and the collapse frame waiting for its siblings
    pub collapsing: Option<(usize, FrameId)>,
    /// Branch that collapsed synchronously; later branches are not started
    pub winner: Option<usize>,
    pub starting: bool,
}

#[derive(Debug, Clone)]
pub struct SuspendFrame {
    pub node: NodeRef,
    pub handle: ResumeHandle,
    pub phase: SuspendPhase,
    pub payload: Option<Vec<Val>>,
}

#[derive(Debug, Clone)]
pub struct SpawnFrame {
    pub stratum: StratumHandle,
}

#[derive(Debug, Clone)]
pub struct WaitFrame {
    pub stratum: StratumHandle,
}

/// Frame kind - the operator and its state
#[derive(Debug, Clone)]
pub enum FrameKind {
    Seq(SeqFrame),
    Sc(ScFrame),
    Call(CallFrame),
    If(IfFrame),
    Switch(SwitchFrame),
    Try(TryFrame),
    Loop(LoopFrame),
    ForIn(ForInFrame),
    Par(ParFrame),
    Alt(AltFrame),
    Suspend(SuspendFrame),
    Spawn(SpawnFrame),
    /// Waiting for an alternation's losing branches to finish aborting
    Collapse,
    /// Waiting for a stratum's value
    Wait(WaitFrame),
    Hold,
}

impl FrameKind {
    pub fn name(&self) -> &'static str {
        match self {
            FrameKind::Seq(_) => "Seq",
            FrameKind::Sc(_) => "Sc",
            FrameKind::Call(_) => "Call",
            FrameKind::If(_) => "If",
            FrameKind::Switch(_) => "Switch",
            FrameKind::Try(_) => "Try",
            FrameKind::Loop(_) => "Loop",
            FrameKind::ForIn(_) => "ForIn",
            FrameKind::Par(_) => "Par",
            FrameKind::Alt(_) => "Alt",
            FrameKind::Suspend(_) => "Suspend",
            FrameKind::Spawn(_) => "Spawn",
            FrameKind::Collapse => "Collapse",
            FrameKind::Wait(_) => "Wait",
            FrameKind::Hold => "Hold",
        }
    }

    /// Kinds whose cancellation logic goes beyond forwarding to one child
    pub fn has_custom_abort(&self) -> bool {
        matches!(
            self,
            FrameKind::Par(_) | FrameKind::Alt(_) | FrameKind::Try(_)
        )
    }
}

/// Execution frame - one per suspendable operator instance
#[derive(Debug, Clone)]
pub struct Frame {
    pub kind: FrameKind,
    pub env: Rc<Env>,
    /// Current child and the index it reports with
    pub child: Option<(FrameId, usize)>,
    pub parent: Parent,
    /// Set once the frame has suspended at least once
    pub is_async: bool,
    pub aborted: bool,
    /// Call sites accumulated while asynchronous
    pub callstack: Vec<TraceEntry>,
}

impl Frame {
    pub fn new(kind: FrameKind, env: Rc<Env>) -> Self {
        Frame {
            kind,
            env,
            child: None,
            parent: Parent::Unset,
            is_async: false,
            aborted: false,
            callstack: Vec::new(),
        }
    }
}
