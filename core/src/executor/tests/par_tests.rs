//! Tests for Par (wait-all)

use super::helpers::{run, strings};
use crate::executor::build::*;
use crate::executor::types::Val;

#[test]
fn test_par_value_is_last_to_complete() {
    let r = run(program(vec![par(vec![
        seq(vec![sleep(20.0), text("slow")]),
        seq(vec![sleep(5.0), text("fast")]),
    ])]));
    assert_eq!(r.value(), Val::str("slow"));
    assert_eq!(r.now(), 20);
    assert_eq!(r.driver.engine().live_frames(), 0);
}

#[test]
fn test_par_branches_run_concurrently() {
    let r = run(program(vec![par(vec![
        seq(vec![sleep(10.0), print(vec![text("a")])]),
        seq(vec![sleep(10.0), print(vec![text("b")])]),
        seq(vec![sleep(5.0), print(vec![text("c")])]),
    ])]));
    assert_eq!(r.output(), strings(&["c", "a", "b"]));
    assert_eq!(r.now(), 10);
}

#[test]
fn test_par_synchronous_branches() {
    let r = run(program(vec![par(vec![num(1.0), num(2.0)])]));
    assert_eq!(r.value(), Val::Num(2.0));

    let r = run(program(vec![par(vec![])]));
    assert_eq!(r.value(), Val::Null);
}

#[test]
fn test_par_throw_aborts_siblings() {
    let r = run(program(vec![try_(par(vec![
        seq(vec![sleep(10.0), print(vec![text("a")])]),
        seq(vec![sleep(5.0), throw(3, text("E"))]),
        try_(seq(vec![sleep(20.0), print(vec![text("c")])]))
            .retract(print(vec![text("c retracted")]))
            .build(),
    ]))
    .catch(
        "e",
        seq(vec![print(vec![add(text("caught "), var("e"))]), var("e")]),
    )
    .build()]));
    assert_eq!(r.value(), Val::str("E"));
    // The sibling was torn down before the catch saw the error
    assert_eq!(r.output(), strings(&["c retracted", "caught E"]));
    assert_eq!(r.now(), 5);
}

#[test]
fn test_par_synchronous_throw_stops_start() {
    let r = run(program(vec![par(vec![
        seq(vec![sleep(5.0), print(vec![text("a")])]),
        throw(1, text("E")),
        print(vec![text("never")]),
    ])]));
    assert_eq!(r.error().message, "E");
    assert!(r.output().is_empty());
}

#[test]
fn test_par_first_throw_wins() {
    // The second branch throws while being torn down; only the first counts
    let r = run(program(vec![par(vec![
        seq(vec![sleep(5.0), throw(1, text("first"))]),
        try_(sleep(50.0))
            .retract(throw(2, text("second")))
            .build(),
    ])]));
    assert_eq!(r.error().message, "first");
}

#[test]
fn test_par_break_tears_down_siblings() {
    let r = run(program(vec![
        while_loop(
            boolean(true),
            vec![par(vec![
                seq(vec![sleep(50.0), print(vec![text("late")])]),
                seq(vec![sleep(5.0), brk(Some("stop"))]),
            ])],
        ),
    ]));
    assert_eq!(r.value(), Val::str("stop"));
    assert!(r.output().is_empty());
}
