//! Host interface
//!
//! The host supplies native callables and receives reports of failures that
//! no program code observed. Calls into the host are synchronous: a native
//! that needs to wait hands a resume function to a timer or other event
//! source through the scheduler.

use super::errors::ErrorInfo;
use super::scheduler::Scheduler;
use super::types::Val;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tracing::error;

/// Context passed to every native call
pub struct HostCx<'a> {
    pub scheduler: &'a Scheduler,
    pub line: u32,
    pub file: &'a str,
}

/// Where an uncaught failure came from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "t", content = "v")]
pub enum Origin {
    Program,
    Stratum(u64),
}

#[derive(Debug, Clone, Serialize)]
pub struct UncaughtReport {
    pub origin: Origin,
    pub error: ErrorInfo,
    pub at: DateTime<Utc>,
}

pub trait Host {
    /// Names installed into the global scope as native functions
    fn natives(&self) -> Vec<String>;

    /// Call native `name`. `Err` is thrown into the program.
    fn call(&mut self, name: &str, args: Vec<Val>, cx: &HostCx<'_>) -> Result<Val, Val>;

    fn report_uncaught(&mut self, report: &UncaughtReport) {
        error!(origin = ?report.origin, "uncaught {}", report.error.render());
    }
}

/// Forwards uncaught failures to the host, once per error.
#[derive(Debug, Default)]
pub struct Reporter {
    seen: HashSet<u64>,
    reported: usize,
}

impl Reporter {
    /// Returns false when this error was already reported.
    pub fn report(&mut self, host: &mut dyn Host, origin: Origin, error: ErrorInfo) -> bool {
        if let Some(id) = error.id {
            if !self.seen.insert(id) {
                return false;
            }
        }
        self.reported += 1;
        let report = UncaughtReport {
            origin,
            error,
            at: Utc::now(),
        };
        host.report_uncaught(&report);
        true
    }

    pub fn reported(&self) -> usize {
        self.reported
    }
}
