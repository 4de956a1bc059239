//! Timer functions
//!
//! Timers hand a resume function to the scheduler. When the timer expires
//! the resume function is called with the extra arguments given to
//! `setTimeout`.

use super::{arg_error, expect_args, NativeResult};
use crate::executor::errors;
use crate::executor::scheduler::{Scheduler, Task, TimerId};
use crate::executor::types::Val;

/// setTimeout(resume, ms, ...payload) - Returns the timer id
pub fn set_timeout(args: &[Val], scheduler: &Scheduler) -> NativeResult {
    expect_args("setTimeout", args, 2)?;
    let Val::Resume(handle) = &args[0] else {
        return Err(arg_error(
            errors::WRONG_ARG_TYPE,
            format!(
                "setTimeout expects a resume function, got {}",
                args[0].type_name()
            ),
        ));
    };
    let delay = match &args[1] {
        Val::Num(ms) if *ms >= 0.0 => *ms as u64,
        Val::Num(_) => 0,
        other => {
            return Err(arg_error(
                errors::WRONG_ARG_TYPE,
                format!("setTimeout delay must be a number, got {}", other.type_name()),
            ))
        }
    };
    let id = scheduler.set_timer(
        delay,
        Task::Fire {
            handle: handle.clone(),
            payload: args[2..].to_vec(),
        },
    );
    Ok(Val::Num(id.0 as f64))
}

/// clearTimeout(id) - Returns whether a pending timer was removed
pub fn clear_timeout(args: &[Val], scheduler: &Scheduler) -> NativeResult {
    expect_args("clearTimeout", args, 1)?;
    match &args[0] {
        Val::Num(id) if *id >= 0.0 => Ok(Val::Bool(scheduler.clear_timer(TimerId(*id as u64)))),
        _ => Ok(Val::Bool(false)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_timeout_rejects_plain_values() {
        let scheduler = Scheduler::new();
        let Err(Val::Error(err)) = set_timeout(&[Val::Num(1.0), Val::Num(5.0)], &scheduler) else {
            unreachable!("Expected a thrown error");
        };
        assert_eq!(err.code, errors::WRONG_ARG_TYPE);
        assert_eq!(scheduler.pending_timers(), 0);
    }

    #[test]
    fn test_clear_unknown_timer() {
        let scheduler = Scheduler::new();
        assert_eq!(clear_timeout(&[Val::Num(42.0)], &scheduler), Ok(Val::Bool(false)));
        assert_eq!(clear_timeout(&[Val::str("x")], &scheduler), Ok(Val::Bool(false)));
    }
}
