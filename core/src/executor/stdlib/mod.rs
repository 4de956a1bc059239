//! Standard library host
//!
//! Natives installed into the global scope of every program the driver
//! runs. Each native is a [`StdlibFunc`] variant, dispatched by
//! [`call_stdlib_func`]. Output and uncaught reports are recorded on the
//! host so embedders and tests can inspect them after a run.

pub mod builtins;
pub mod io;
pub mod timers;

use super::errors::{self, ErrorInfo};
use super::host::{Host, HostCx, UncaughtReport};
use super::types::Val;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::error;

/// Result of a native call; `Err` is thrown into the program
pub type NativeResult = Result<Val, Val>;

/* ===================== Standard Library Function Types ===================== */

/// Standard library function identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StdlibFunc {
    Print,
    SetTimeout,
    ClearTimeout,
    Now,
    Len,
    Keys,
    Error,
}

impl StdlibFunc {
    pub const ALL: [StdlibFunc; 7] = [
        StdlibFunc::Print,
        StdlibFunc::SetTimeout,
        StdlibFunc::ClearTimeout,
        StdlibFunc::Now,
        StdlibFunc::Len,
        StdlibFunc::Keys,
        StdlibFunc::Error,
    ];

    /// Global name the function is installed under
    pub fn name(self) -> &'static str {
        match self {
            StdlibFunc::Print => "print",
            StdlibFunc::SetTimeout => "setTimeout",
            StdlibFunc::ClearTimeout => "clearTimeout",
            StdlibFunc::Now => "now",
            StdlibFunc::Len => "len",
            StdlibFunc::Keys => "keys",
            StdlibFunc::Error => "Error",
        }
    }

    pub fn from_name(name: &str) -> Option<StdlibFunc> {
        StdlibFunc::ALL.into_iter().find(|f| f.name() == name)
    }
}

/* ===================== Stdlib Dispatcher ===================== */

/// Call a standard library function with arguments
pub fn call_stdlib_func(
    func: StdlibFunc,
    args: &[Val],
    cx: &HostCx<'_>,
    output: &RefCell<Vec<String>>,
) -> NativeResult {
    match func {
        StdlibFunc::Print => io::print(args, output),
        StdlibFunc::SetTimeout => timers::set_timeout(args, cx.scheduler),
        StdlibFunc::ClearTimeout => timers::clear_timeout(args, cx.scheduler),
        StdlibFunc::Now => Ok(Val::Num(cx.scheduler.now() as f64)),
        StdlibFunc::Len => builtins::len(args),
        StdlibFunc::Keys => builtins::keys(args),
        StdlibFunc::Error => builtins::error(args),
    }
}

/// Throwable error value for a misused native
pub(crate) fn arg_error(code: &str, message: impl Into<String>) -> Val {
    Val::Error(ErrorInfo::new(code, message))
}

pub(crate) fn expect_args(name: &str, args: &[Val], min: usize) -> Result<(), Val> {
    if args.len() < min {
        return Err(arg_error(
            errors::WRONG_ARG_COUNT,
            format!("{} expects at least {} argument(s), got {}", name, min, args.len()),
        ));
    }
    Ok(())
}

/* ===================== Host ===================== */

/// Host backed by the standard library
#[derive(Debug, Default, Clone)]
pub struct StdHost {
    output: Rc<RefCell<Vec<String>>>,
    uncaught: Rc<RefCell<Vec<UncaughtReport>>>,
}

impl StdHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines printed so far
    pub fn output(&self) -> Vec<String> {
        self.output.borrow().clone()
    }

    /// Uncaught failures reported so far
    pub fn uncaught(&self) -> Vec<UncaughtReport> {
        self.uncaught.borrow().clone()
    }
}

impl Host for StdHost {
    fn natives(&self) -> Vec<String> {
        StdlibFunc::ALL.iter().map(|f| f.name().to_string()).collect()
    }

    fn call(&mut self, name: &str, args: Vec<Val>, cx: &HostCx<'_>) -> NativeResult {
        let Some(func) = StdlibFunc::from_name(name) else {
            return Err(arg_error(
                errors::REFERENCE_ERROR,
                format!("{} is not defined", name),
            ));
        };
        call_stdlib_func(func, &args, cx, &self.output)
    }

    fn report_uncaught(&mut self, report: &UncaughtReport) {
        error!(origin = ?report.origin, "uncaught {}", report.error.render());
        self.uncaught.borrow_mut().push(report.clone());
    }
}
