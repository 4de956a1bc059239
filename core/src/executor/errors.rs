//! Error values raised inside running programs
//!
//! These are program-level errors carried by `Val::Error`. Engine and
//! configuration failures use [`crate::error::StrataError`] instead.

use super::trace::{self, TraceEntry};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

pub const TYPE_ERROR: &str = "TypeError";
pub const REFERENCE_ERROR: &str = "ReferenceError";
pub const RANGE_ERROR: &str = "RangeError";
pub const INTERNAL_ERROR: &str = "InternalError";
pub const STRATUM_ABORTED: &str = "StratumAborted";
pub const BLOCK_EXIT_ERROR: &str = "BlockExitError";
pub const USER_ERROR: &str = "UserError";
pub const WRONG_ARG_COUNT: &str = "WrongArgCount";
pub const WRONG_ARG_TYPE: &str = "WrongArgType";

static NEXT_ERROR_ID: AtomicU64 = AtomicU64::new(1);

/// Error record with code, message and an execution trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
    /// Provenance stamp, assigned the first time the error is thrown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<TraceEntry>,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        ErrorInfo {
            code: code.into(),
            message: message.into(),
            id: None,
            line: 0,
            file: None,
            trace: Vec::new(),
        }
    }

    /// Record where this error was first thrown. No-op once stamped.
    pub fn stamp(&mut self, line: u32, file: &str) {
        if self.id.is_some() {
            return;
        }
        self.id = Some(NEXT_ERROR_ID.fetch_add(1, Ordering::Relaxed));
        self.line = line;
        self.file = Some(file.to_string());
        if line > 0 {
            self.trace.push(TraceEntry::at(file, line));
        }
    }

    /// Append call sites from an asynchronous frame, keeping at most `depth`
    /// entries.
    pub fn extend_trace(&mut self, entries: &[TraceEntry], depth: usize) {
        self.trace.extend(entries.iter().cloned());
        trace::cap(&mut self.trace, depth);
    }

    /// Multi-line rendering: message followed by one line per trace entry.
    pub fn render(&self) -> String {
        let mut out = format!("{}: {}", self.code, self.message);
        for entry in &self.trace {
            out.push('\n');
            out.push_str(&entry.to_string());
        }
        out
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}
