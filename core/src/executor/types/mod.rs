//! Type definitions for the execution engine

pub mod ast;
pub mod control;
pub mod phase;
pub mod values;

pub use ast::{CaseLabel, Catch, Clause, NativeOp, Node, NodeRef, SeqFlags, ShortCircuit};
pub use control::{
    AbortResult, AltFrame, CallFrame, Completion, ForInFrame, Frame, FrameKind, IfFrame,
    LoopFrame, Outcome, ParFrame, Parent, RootId, ScFrame, SeqFrame, Signal, SpawnFrame,
    SuspendFrame, SwitchFrame, Thrown, TryFrame, WaitFrame,
};
pub use phase::{LoopPhase, SuspendPhase, SwitchPhase, TryPhase};
pub use values::Val;
