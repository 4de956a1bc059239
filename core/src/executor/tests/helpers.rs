//! Test helpers for executor tests
//!
//! Programs run on the virtual clock with a recording stdlib host, so tests
//! can look at printed lines and uncaught reports after the run.

use crate::config::Config;
use crate::executor::driver::parse_program;
use crate::executor::errors::ErrorInfo;
use crate::executor::types::{NodeRef, Val};
use crate::executor::{Driver, RunOutcome, StdHost};

/// File name every test program runs as
pub const FILE: &str = "main.sjs";

pub struct TestRun {
    pub outcome: RunOutcome,
    pub host: StdHost,
    pub driver: Driver,
}

impl TestRun {
    /// Lines printed by the program
    pub fn output(&self) -> Vec<String> {
        self.host.output()
    }

    /// Virtual time when the run ended
    pub fn now(&self) -> u64 {
        self.driver.engine().scheduler().now()
    }

    pub fn value(&self) -> Val {
        let RunOutcome::Completed(v) = &self.outcome else {
            unreachable!("Expected completed run, got {:?}", self.outcome);
        };
        v.clone()
    }

    pub fn error(&self) -> ErrorInfo {
        let RunOutcome::Threw(e) = &self.outcome else {
            unreachable!("Expected thrown error, got {:?}", self.outcome);
        };
        e.clone()
    }
}

pub fn run_with_config(program: NodeRef, config: &Config) -> TestRun {
    let host = StdHost::new();
    let mut driver = Driver::new(Box::new(host.clone()), config);
    let outcome = driver.run(&program, FILE).expect("Run failed");
    TestRun {
        outcome,
        host,
        driver,
    }
}

/// Run `program` to quiescence with the default configuration
pub fn run(program: NodeRef) -> TestRun {
    run_with_config(program, &Config::default())
}

/// Parse a JSON program and run it
pub fn run_json(source: &str) -> TestRun {
    let program = parse_program(source).expect("Parse program failed");
    run(program)
}

pub fn strings(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|s| s.to_string()).collect()
}
