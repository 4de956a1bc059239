//! # Executor - stack-free structured concurrency engine
//!
//! Programs are trees of [`Node`]s. Running one either finishes right away
//! or leaves a tree of suspended frames in the engine's arena, which the
//! [`Driver`] advances as resume functions, timers and strata fire.
//!
//! ## Layout
//!
//! - `types`: nodes, values, control signals and frame state
//! - `vm`: the engine and the frame protocol (`cont`, `quench`, `abort`)
//! - `frames`: one module per composite operator
//! - `scheduler`, `host`, `stdlib`: deferred work and the outside world
//! - `driver`: runs a program to completion on virtual or real time

pub mod arena;
pub mod build;
pub mod check;
pub mod driver;
pub mod env;
pub mod errors;
mod frames;
pub mod handles;
pub mod host;
mod native;
pub mod scheduler;
pub mod stdlib;
pub mod trace;
pub mod types;
pub mod vm;

#[cfg(test)]
mod tests;

// Re-export commonly used items
pub use driver::{Driver, RunOutcome};
pub use env::{Env, Scope};
pub use errors::ErrorInfo;
pub use host::{Host, HostCx, Origin, UncaughtReport};
pub use stdlib::StdHost;
pub use types::{Completion, Node, NodeRef, Outcome, Signal, Val};
pub use vm::Engine;
