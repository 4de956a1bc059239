//! Tests for the driver: outcomes, task budget, hosts and real-time runs

use super::helpers::{run, run_json, FILE};
use crate::config::Config;
use crate::error::StrataError;
use crate::executor::build::*;
use crate::executor::driver::{load_program, parse_program};
use crate::executor::host::{Host, HostCx};
use crate::executor::types::Val;
use crate::executor::{Driver, RunOutcome, StdHost};
use serde_json::json;

#[test]
fn test_program_left_waiting_is_suspended() {
    let r = run(program(vec![print(vec![text("before")]), hold()]));
    assert_eq!(r.outcome, RunOutcome::Suspended);
    assert_eq!(r.output(), vec!["before".to_string()]);
}

#[test]
fn test_task_budget() {
    let config = Config {
        max_tasks_per_run: 3,
        ..Config::default()
    };
    let mut driver = Driver::new(Box::new(StdHost::new()), &config);
    let program = program(vec![while_loop(boolean(true), vec![sleep(1.0)])]);
    let result = driver.run(&program, FILE);
    assert!(matches!(result, Err(StrataError::TaskBudgetExceeded(3))));
}

#[test]
fn test_outcome_json_shape() {
    let r = run(program(vec![num(1.0)]));
    assert_eq!(
        serde_json::to_value(&r.outcome).unwrap(),
        json!({"status": "completed", "value": {"t": "Num", "v": 1.0}})
    );

    let r = run(program(vec![throw(3, text("E"))]));
    let value = serde_json::to_value(&r.outcome).unwrap();
    assert_eq!(value["status"], "threw");
    assert_eq!(value["value"]["message"], "E");
    assert_eq!(value["value"]["line"], 3);

    let r = run(program(vec![hold()]));
    assert_eq!(
        serde_json::to_value(&r.outcome).unwrap(),
        json!({"status": "suspended"})
    );
}

#[test]
fn test_run_json_program_with_timer() {
    let source = r#"{
        "t": "Seq",
        "flags": {"top_level": true},
        "body": [
            {"t": "Suspend", "bindings": ["x"], "body": {
                "t": "Seq",
                "body": [
                    {"t": "Call", "line": 2, "callee": {"t": "Var", "name": "setTimeout"},
                     "args": [{"t": "Var", "name": "resume"},
                              {"t": "Lit", "v": {"t": "Num", "v": 10}},
                              {"t": "Lit", "v": {"t": "Str", "v": "woke"}}]},
                    {"t": "Hold"}
                ]
            }},
            {"t": "Var", "name": "x"}
        ]
    }"#;
    let r = run_json(source);
    assert_eq!(r.value(), Val::str("woke"));
    assert_eq!(r.now(), 10);
}

#[test]
fn test_parse_errors() {
    assert!(matches!(
        parse_program("{\"t\": \"Nope\"}"),
        Err(StrataError::Program(_))
    ));
    assert!(matches!(
        load_program(std::path::Path::new("/nonexistent/strata/main.json")),
        Err(StrataError::Io { .. })
    ));
}

#[test]
fn test_load_program_from_file() {
    let path = std::env::temp_dir().join(format!("strata-{}.json", uuid::Uuid::new_v4()));
    let source = serde_json::to_string(&*program(vec![num(2.0), text("loaded")])).unwrap();
    std::fs::write(&path, source).unwrap();

    let loaded = load_program(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    let r = run(loaded);
    assert_eq!(r.value(), Val::str("loaded"));
}

/// Host exposing a single `double` native
struct DoublingHost;

impl Host for DoublingHost {
    fn natives(&self) -> Vec<String> {
        vec!["double".to_string()]
    }

    fn call(&mut self, name: &str, args: Vec<Val>, _cx: &HostCx<'_>) -> Result<Val, Val> {
        match (name, args.first()) {
            ("double", Some(Val::Num(n))) => Ok(Val::Num(n * 2.0)),
            _ => Err(Val::str("bad call")),
        }
    }
}

#[test]
fn test_custom_host() {
    let mut driver = Driver::new(Box::new(DoublingHost), &Config::default());
    let outcome = driver
        .run(&program(vec![call_named("double", vec![num(21.0)])]), FILE)
        .unwrap();
    assert_eq!(outcome, RunOutcome::Completed(Val::Num(42.0)));

    let outcome = driver
        .run(&program(vec![call_named("double", vec![text("x")])]), FILE)
        .unwrap();
    let RunOutcome::Threw(err) = outcome else {
        panic!("Expected a throw, got {:?}", outcome);
    };
    assert_eq!(err.message, "bad call");

    // Natives the host does not list are unbound
    let outcome = driver
        .run(&program(vec![call_named("print", vec![])]), FILE)
        .unwrap();
    assert!(matches!(outcome, RunOutcome::Threw(_)));
}

#[tokio::test]
async fn test_run_realtime() {
    let host = StdHost::new();
    let mut driver = Driver::new(Box::new(host.clone()), &Config::default());
    let program = program(vec![sleep(5.0), print(vec![text("awake")]), text("done")]);
    let outcome = driver.run_realtime(&program, FILE).await.unwrap();
    assert_eq!(outcome, RunOutcome::Completed(Val::str("done")));
    assert_eq!(host.output(), vec!["awake".to_string()]);
    assert_eq!(driver.engine().scheduler().now(), 5);
}
