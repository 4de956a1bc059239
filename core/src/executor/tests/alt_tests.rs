//! Tests for Alt (wait-any) and collapse

use super::helpers::{run, strings};
use crate::executor::build::*;
use crate::executor::errors;
use crate::executor::types::Val;

#[test]
fn test_alt_first_to_finish_wins() {
    let r = run(program(vec![alt(vec![
        seq(vec![sleep(20.0), print(vec![text("slow")]), text("slow")]),
        seq(vec![sleep(5.0), text("fast")]),
    ])]));
    assert_eq!(r.value(), Val::str("fast"));
    assert!(r.output().is_empty());
    assert_eq!(r.now(), 5);
    assert_eq!(r.driver.engine().live_frames(), 0);
}

#[test]
fn test_alt_synchronous_winner_skips_later_branches() {
    let r = run(program(vec![alt(vec![
        text("first"),
        print(vec![text("never")]),
    ])]));
    assert_eq!(r.value(), Val::str("first"));
    assert!(r.output().is_empty());
}

#[test]
fn test_alt_synchronous_winner_aborts_earlier_branches() {
    let r = run(program(vec![alt(vec![
        try_(sleep(10.0))
            .retract(print(vec![text("retracted")]))
            .build(),
        text("second"),
    ])]));
    assert_eq!(r.value(), Val::str("second"));
    assert_eq!(r.output(), strings(&["retracted"]));
}

#[test]
fn test_alt_empty() {
    let r = run(program(vec![alt(vec![])]));
    assert_eq!(r.value(), Val::Null);
}

#[test]
fn test_alt_timeout_pattern() {
    let r = run(program(vec![alt(vec![
        seq(vec![sleep(100.0), text("work")]),
        seq(vec![sleep(10.0), throw(1, text("timeout"))]),
    ])]));
    assert_eq!(r.error().message, "timeout");
    assert_eq!(r.now(), 10);
}

#[test]
fn test_collapse_beats_faster_sibling() {
    // Branch 0 collapses at t=5; branch 1 would finish at t=10
    let r = run(program(vec![alt(vec![
        seq(vec![
            sleep(5.0),
            collapse(),
            sleep(20.0),
            text("collapsed"),
        ]),
        seq(vec![sleep(10.0), print(vec![text("sibling")]), text("sibling")]),
    ])]));
    assert_eq!(r.value(), Val::str("collapsed"));
    assert!(r.output().is_empty());
    assert_eq!(r.now(), 25);
}

#[test]
fn test_collapse_waits_for_sibling_teardown() {
    let r = run(program(vec![alt(vec![
        seq(vec![
            sleep(5.0),
            define("c", collapse()),
            print(vec![text("after collapse")]),
            var("c"),
        ]),
        try_(sleep(100.0))
            .retract(seq(vec![sleep(5.0), print(vec![text("retracted")])]))
            .build(),
    ])]));
    assert_eq!(r.value(), Val::Bool(true));
    assert_eq!(r.output(), strings(&["retracted", "after collapse"]));
    assert_eq!(r.now(), 10);
}

#[test]
fn test_repeated_collapse_in_winning_branch() {
    let r = run(program(vec![alt(vec![
        seq(vec![
            sleep(5.0),
            define("a", collapse()),
            define("b", collapse()),
            sc(
                crate::executor::types::NativeOp::Arr,
                vec![var("a"), var("b")],
            ),
        ]),
        hold(),
    ])]));
    assert_eq!(
        r.value(),
        Val::List(vec![Val::Bool(true), Val::Bool(true)])
    );
}

#[test]
fn test_collapse_outside_alt() {
    let r = run(program(vec![collapse()]));
    let err = r.error();
    assert_eq!(err.code, errors::INTERNAL_ERROR);
    assert_eq!(err.message, "Unexpected collapse statement");
}

#[test]
fn test_collapse_does_not_cross_function_boundary() {
    let f = func(&[], body(vec![collapse()]));
    let r = run(program(vec![alt(vec![call(f, vec![]), hold()])]));
    assert_eq!(r.error().message, "Unexpected collapse statement");
}

#[test]
fn test_alt_aborted_from_outside() {
    let r = run(program(vec![alt(vec![
        alt(vec![
            try_(sleep(50.0))
                .retract(print(vec![text("inner 0")]))
                .build(),
            try_(sleep(50.0))
                .retract(print(vec![text("inner 1")]))
                .build(),
        ]),
        seq(vec![sleep(5.0), text("outer")]),
    ])]));
    assert_eq!(r.value(), Val::str("outer"));
    assert_eq!(r.output(), strings(&["inner 0", "inner 1"]));
}
