//! Tests for Switch statements

use super::helpers::{run, strings};
use crate::executor::build::*;
use crate::executor::types::Val;

fn say(s: &str) -> crate::executor::types::NodeRef {
    print(vec![text(s)])
}

#[test]
fn test_switch_falls_through() {
    let r = run(program(vec![switch(
        num(2.0),
        vec![
            case(num(1.0), say("one")),
            case(num(2.0), say("two")),
            case(num(3.0), say("three")),
            default_case(say("other")),
        ],
    )]));
    assert_eq!(r.output(), strings(&["two", "three", "other"]));
}

#[test]
fn test_switch_break_stops_fallthrough() {
    let r = run(program(vec![
        switch(
            num(2.0),
            vec![
                case(num(1.0), say("one")),
                case(num(2.0), seq(vec![say("two"), brk(None)])),
                case(num(3.0), say("three")),
            ],
        ),
        text("after"),
    ]));
    assert_eq!(r.output(), strings(&["two"]));
    assert_eq!(r.value(), Val::str("after"));
}

#[test]
fn test_switch_no_match() {
    let r = run(program(vec![switch(
        text("z"),
        vec![case(text("a"), say("a")), case(text("b"), say("b"))],
    )]));
    assert!(r.output().is_empty());
    assert_eq!(r.value(), Val::Null);
}

#[test]
fn test_default_matches_where_it_stands() {
    let r = run(program(vec![switch(
        num(9.0),
        vec![
            case(num(1.0), say("one")),
            default_case(say("default")),
            case(num(2.0), say("two")),
        ],
    )]));
    assert_eq!(r.output(), strings(&["default", "two"]));
}

#[test]
fn test_structural_equality() {
    let r = run(program(vec![switch(
        sc(
            crate::executor::types::NativeOp::Arr,
            vec![num(1.0), num(2.0)],
        ),
        vec![
            case(
                sc(crate::executor::types::NativeOp::Arr, vec![num(1.0)]),
                say("short"),
            ),
            case(
                sc(
                    crate::executor::types::NativeOp::Arr,
                    vec![num(1.0), num(2.0)],
                ),
                seq(vec![say("pair"), brk(None)]),
            ),
        ],
    )]));
    assert_eq!(r.output(), strings(&["pair"]));
}

#[test]
fn test_async_discriminant_and_labels() {
    let r = run(program(vec![switch(
        seq(vec![sleep(5.0), num(2.0)]),
        vec![
            case(seq(vec![sleep(5.0), num(1.0)]), say("one")),
            case(seq(vec![sleep(5.0), num(2.0)]), seq(vec![say("two"), brk(None)])),
        ],
    )]));
    assert_eq!(r.output(), strings(&["two"]));
    assert_eq!(r.now(), 15);
}

#[test]
fn test_continue_passes_through_switch() {
    // for (i = 0; i < 3; i++) { switch (i) { case 1: continue; } print(i) }
    let r = run(program(vec![
        define("i", num(0.0)),
        for_loop(
            lt(var("i"), num(3.0)),
            incr("i"),
            vec![
                switch(var("i"), vec![case(num(1.0), cont(None))]),
                print(vec![var("i")]),
            ],
        ),
    ]));
    assert_eq!(r.output(), strings(&["0", "2"]));
}
