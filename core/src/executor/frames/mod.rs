//! Composite operators
//!
//! Each module adds the start, continue and (where needed) quench/abort
//! steps of one construct to [`Engine`](super::vm::Engine).

mod alt;
mod call;
mod cond;
mod loops;
mod par;
mod scalar;
mod seq;
mod spawn;
mod suspend;
mod switch;
mod try_catch;
