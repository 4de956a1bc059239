//! Tests for execution traces on thrown errors

use super::helpers::{run, run_with_config, FILE};
use crate::config::Config;
use crate::executor::build::*;
use crate::executor::trace::TraceEntry;
use crate::executor::types::NodeRef;

fn error_value(message: &str) -> NodeRef {
    call_named("Error", vec![text(message)])
}

fn at(line: u32) -> TraceEntry {
    TraceEntry::at(FILE, line)
}

#[test]
fn test_async_throw_carries_call_site() {
    let f = func(
        &[],
        body(vec![sleep(5.0), throw(4, error_value("bad"))]),
    );
    let r = run(program(vec![define("f", f), call_at(9, var("f"), vec![])]));
    let err = r.error();
    assert_eq!(err.message, "bad");
    assert_eq!(err.line, 4);
    assert_eq!(err.trace, vec![at(4), at(9)]);
    assert_eq!(
        err.render(),
        "UserError: bad\n    at main.sjs:4\n    at main.sjs:9"
    );
}

#[test]
fn test_synchronous_throw_has_throw_site_only() {
    let f = func(&[], body(vec![throw(4, error_value("bad"))]));
    let r = run(program(vec![define("f", f), call_at(9, var("f"), vec![])]));
    assert_eq!(r.error().trace, vec![at(4)]);
}

#[test]
fn test_rethrow_keeps_original_site() {
    let r = run(program(vec![try_(throw(3, error_value("x")))
        .catch("e", throw(7, var("e")))
        .build()]));
    let err = r.error();
    assert_eq!(err.line, 3);
    assert_eq!(err.trace, vec![at(3)]);
}

#[test]
fn test_plain_value_throw_has_no_trace() {
    let r = run(program(vec![throw(2, text("plain"))]));
    let err = r.error();
    assert_eq!(err.message, "plain");
    assert_eq!(err.line, 2);
    assert!(err.trace.is_empty());
}

#[test]
fn test_deep_async_trace_is_capped() {
    // rec() sleeps, then calls itself until n reaches 10, then throws
    let rec = func(
        &[],
        body(vec![
            sleep(1.0),
            incr("n"),
            if_else(
                lt(var("n"), num(10.0)),
                call_at(5, var("rec"), vec![]),
                Some(throw(2, error_value("deep"))),
            ),
        ]),
    );
    let config = Config {
        trace_depth: 4,
        ..Config::default()
    };
    let r = run_with_config(
        program(vec![
            define("n", num(0.0)),
            define("rec", rec),
            call_at(9, var("rec"), vec![]),
        ]),
        &config,
    );
    let err = r.error();
    assert_eq!(err.trace.len(), 4);
    assert_eq!(err.trace[0], at(2));
    assert_eq!(err.trace[1], at(5));
    assert_eq!(err.trace[2], TraceEntry::Omitted);
    assert_eq!(err.trace[3], at(9));
}
