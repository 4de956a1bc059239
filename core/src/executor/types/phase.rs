//! Execution phase enums for composite frames
//!
//! The phase records which child a frame is waiting on, so a completion
//! arriving through `cont` can be routed to the right step.

use serde::{Deserialize, Serialize};

/// Execution phase for Switch frames
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SwitchPhase {
    /// Evaluating the discriminant
    Discriminant = 0,
    /// Evaluating case labels
    Match = 1,
    /// Running clause bodies, falling through
    Body = 2,
}

/// Execution phase for Try frames
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TryPhase {
    /// Executing the try block
    Body = 0,
    /// Executing the catch block
    Catch = 1,
    /// Executing the retract block (only after an abort)
    Retract = 2,
    /// Executing the finally block
    Finally = 3,
}

impl TryPhase {
    /// Cleanup phases run to completion even when the frame is aborted
    pub fn is_cleanup(self) -> bool {
        matches!(self, TryPhase::Retract | TryPhase::Finally)
    }
}

/// Execution phase for Loop frames
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LoopPhase {
    /// About to evaluate the test
    RunTest,
    /// Test value available
    TestDone,
    /// About to run body statement `i`
    RunBody(usize),
    /// Body statement `i` completed
    BodyDone(usize),
    /// About to run the increment
    RunIncrement,
    /// Increment completed
    IncrementDone,
}

impl LoopPhase {
    /// Encode a waiting phase as a child index
    pub fn to_idx(self) -> usize {
        match self {
            LoopPhase::TestDone => 0,
            LoopPhase::IncrementDone => 1,
            LoopPhase::BodyDone(i) => 2 + i,
            other => panic!("loop phase {:?} never waits on a child", other),
        }
    }

    pub fn from_idx(idx: usize) -> LoopPhase {
        match idx {
            0 => LoopPhase::TestDone,
            1 => LoopPhase::IncrementDone,
            i => LoopPhase::BodyDone(i - 2),
        }
    }
}

/// Execution phase for Suspend frames
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SuspendPhase {
    /// Body is being run synchronously
    Starting = 0,
    /// Body went asynchronous, waiting for resume or body completion
    Body = 1,
    /// Resume fired, waiting for the body's abort to finish
    Aborting = 2,
}
