//! Execution traces for thrown errors
//!
//! A trace is a list of `file:line` call sites. Frames collect call sites
//! once they go asynchronous, and a throw passing through such a frame picks
//! them up. Traces are capped: on overflow the middle is replaced by a
//! single omitted-frames marker.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum TraceEntry {
    At { file: String, line: u32 },
    Omitted,
}

impl TraceEntry {
    pub fn at(file: &str, line: u32) -> Self {
        TraceEntry::At {
            file: file.to_string(),
            line,
        }
    }
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEntry::At { file, line } => write!(f, "    at {}:{}", file, line),
            TraceEntry::Omitted => write!(f, "    ...(frames omitted)"),
        }
    }
}

/// Trim `trace` to `depth` entries.
///
/// Keeps the first `depth / 2` entries and the newest ones, with one marker
/// in between.
pub fn cap(trace: &mut Vec<TraceEntry>, depth: usize) {
    if depth < 2 || trace.len() <= depth {
        return;
    }
    let head = depth / 2;
    let cut = trace.len() - depth + 1;
    trace.splice(head..head + cut, std::iter::once(TraceEntry::Omitted));
}

/// Append `src` to `dst` and cap the result.
pub fn merge(dst: &mut Vec<TraceEntry>, src: Vec<TraceEntry>, depth: usize) {
    if src.is_empty() {
        return;
    }
    dst.extend(src);
    cap(dst, depth);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(n: u32) -> Vec<TraceEntry> {
        (1..=n).map(|i| TraceEntry::at("f.sjs", i)).collect()
    }

    #[test]
    fn test_cap_under_limit() {
        let mut t = entries(20);
        cap(&mut t, 20);
        assert_eq!(t, entries(20));
    }

    #[test]
    fn test_cap_overflow() {
        let mut t = entries(25);
        cap(&mut t, 20);
        assert_eq!(t.len(), 20);
        assert_eq!(t[9], TraceEntry::at("f.sjs", 10));
        assert_eq!(t[10], TraceEntry::Omitted);
        assert_eq!(t[11], TraceEntry::at("f.sjs", 17));
        assert_eq!(t[19], TraceEntry::at("f.sjs", 25));
    }

    #[test]
    fn test_merge_repeated() {
        let mut t = entries(15);
        merge(&mut t, entries(15), 20);
        merge(&mut t, entries(3), 20);
        assert_eq!(t.len(), 20);
        assert_eq!(t.iter().filter(|e| **e == TraceEntry::Omitted).count(), 1);
    }
}
