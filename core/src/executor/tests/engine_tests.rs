//! Tests driving the engine directly: cancellation phases and frame access

use super::helpers::FILE;
use crate::config::Config;
use crate::executor::arena::FrameId;
use crate::executor::build::*;
use crate::executor::types::{AbortResult, Completion, NodeRef, Outcome};
use crate::executor::vm::state_mut;
use crate::executor::{Driver, StdHost};

fn driver() -> (Driver, StdHost) {
    let host = StdHost::new();
    let driver = Driver::new(Box::new(host.clone()), &Config::default());
    (driver, host)
}

/// Execute `node` and return the id of the frame left waiting
fn start(driver: &mut Driver, node: &NodeRef) -> FrameId {
    let env = driver.root_env(FILE);
    match driver.engine_mut().execute(node, env) {
        Outcome::Pending(id) => id,
        other => panic!("Expected a pending frame, got {:?}", other),
    }
}

/// Fire every timer due by `t` and run the resulting tasks
fn advance(driver: &mut Driver, t: u64) {
    let engine = driver.engine_mut();
    engine.scheduler().advance_to(t);
    while let Some(task) = engine.scheduler().pop_ready() {
        engine.run_task(task);
    }
}

#[test]
fn test_quench_alone_stops_resume_but_keeps_frames() {
    let (mut driver, host) = driver();
    let node = seq(vec![
        suspend(
            seq(vec![
                call_named("setTimeout", vec![var("resume"), num(10.0), text("woke")]),
                hold(),
            ]),
            &["x"],
        ),
        print(vec![var("x")]),
    ]);
    let id = start(&mut driver, &node);
    let root = driver.engine_mut().attach_root(id);
    let live = driver.engine().live_frames();
    assert!(live > 0);

    driver.engine_mut().quench(id);
    // Quenching twice is harmless
    driver.engine_mut().quench(id);
    advance(&mut driver, 10);

    assert!(host.output().is_empty());
    assert_eq!(driver.engine().live_frames(), live);
    assert_eq!(driver.engine_mut().take_root(root), None);

    assert_eq!(driver.engine_mut().abort(id), AbortResult::Done);
    assert_eq!(driver.engine().live_frames(), 0);
}

#[test]
fn test_resume_without_quench_still_fires() {
    let (mut driver, host) = driver();
    let node = seq(vec![
        suspend(
            seq(vec![
                call_named("setTimeout", vec![var("resume"), num(10.0), text("woke")]),
                hold(),
            ]),
            &["x"],
        ),
        print(vec![var("x")]),
    ]);
    let id = start(&mut driver, &node);
    let root = driver.engine_mut().attach_root(id);
    advance(&mut driver, 10);

    assert_eq!(host.output(), vec!["woke".to_string()]);
    assert!(driver.engine_mut().take_root(root).is_some());
    assert_eq!(driver.engine().live_frames(), 0);
}

#[test]
fn test_par_pending_count_mismatch_is_internal_error() {
    let (mut driver, _host) = driver();
    let id = start(&mut driver, &par(vec![hold(), hold()]));
    let engine = driver.engine_mut();
    state_mut!(engine, id, Par).pending += 1;

    let out = engine.cont(id, 0, Completion::null());
    assert_eq!(out, Outcome::Done(Completion::internal("invalid state in Par")));
}

#[test]
fn test_par_pending_count_matches_live_branches() {
    let (mut driver, _host) = driver();
    let id = start(&mut driver, &par(vec![hold(), num(1.0), sleep(5.0), hold()]));
    let engine = driver.engine_mut();
    let state = state_mut!(engine, id, Par);
    let live = state.children.iter().flatten().count();
    assert_eq!(live, 3);
    assert_eq!(state.pending, live);
}

#[test]
#[should_panic(expected = "is not live")]
fn test_freed_frame_access_panics() {
    let (mut driver, _host) = driver();
    let id = start(&mut driver, &hold());
    assert_eq!(driver.engine_mut().abort(id), AbortResult::Done);
    driver.engine().frame(id);
}

#[test]
#[should_panic(expected = "expected Par")]
fn test_frame_kind_mismatch_panics() {
    let (mut driver, _host) = driver();
    let id = start(&mut driver, &hold());
    let engine = driver.engine_mut();
    state_mut!(engine, id, Par).pending += 1;
}

#[test]
#[should_panic(expected = "expected a branching frame")]
fn test_branch_on_plain_frame_panics() {
    let (mut driver, _host) = driver();
    let id = start(&mut driver, &hold());
    let child = start(&mut driver, &hold());
    driver.engine_mut().set_branch(id, 0, child);
}
