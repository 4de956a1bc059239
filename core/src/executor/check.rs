//! Static checks for execution trees
//!
//! Walks a program before it runs and collects statistics plus structural
//! warnings: control statements with no construct to receive them, and
//! `collapse` that cannot reach an alternation. Warnings never stop a
//! program from running; the engine reports the same mistakes as errors
//! when the offending node actually executes.

use super::types::{NativeOp, Node};
use serde::Serialize;
use std::collections::BTreeMap;

/// Structural problems found by [`check_program`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// `collapse` with no enclosing alternation branch
    CollapseOutsideAlt { line: u32 },
    /// `break` outside of a loop or switch, or `continue` outside of a loop
    ControlFlowOutsideLoop { statement: String, line: u32 },
    /// Blocklambda `break`/`return` outside of any blocklambda
    BlockExitOutsideBlockLambda { statement: String, line: u32 },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::CollapseOutsideAlt { line } => {
                write!(f, "'collapse' outside of an alternation{}", line_info(*line))
            }
            Warning::ControlFlowOutsideLoop { statement, line } => {
                write!(f, "'{}' statement outside of loop{}", statement, line_info(*line))
            }
            Warning::BlockExitOutsideBlockLambda { statement, line } => write!(
                f,
                "blocklambda '{}' outside of a blocklambda{}",
                statement,
                line_info(*line)
            ),
        }
    }
}

/// Line 0 means the node carries no position
fn line_info(line: u32) -> String {
    if line == 0 {
        String::new()
    } else {
        format!(" at line {}", line)
    }
}

/// Statistics and warnings for one program
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub nodes: usize,
    pub max_depth: usize,
    /// Node count per construct name
    pub constructs: BTreeMap<&'static str, usize>,
    pub warnings: Vec<Warning>,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// What the walk knows about the enclosing constructs
#[derive(Debug, Clone, Copy, Default)]
struct Context {
    in_alt: bool,
    in_loop: bool,
    /// Inside a loop or a switch
    in_breakable: bool,
    in_block_lambda: bool,
}

pub fn check_program(program: &Node) -> Report {
    let mut report = Report::default();
    walk(program, Context::default(), 1, &mut report);
    report
}

fn walk(node: &Node, cx: Context, depth: usize, report: &mut Report) {
    report.nodes += 1;
    report.max_depth = report.max_depth.max(depth);
    *report.constructs.entry(node.name()).or_insert(0) += 1;

    match node {
        Node::Collapse { line } if !cx.in_alt => {
            report.warnings.push(Warning::CollapseOutsideAlt { line: *line });
        }
        Node::Sc { line, op, .. } => check_op(op, *line, cx, report),
        _ => {}
    }

    for (i, child) in node.children().into_iter().enumerate() {
        walk(child, child_context(node, i, cx), depth + 1, report);
    }
}

fn check_op(op: &NativeOp, line: u32, cx: Context, report: &mut Report) {
    let warning = match op {
        NativeOp::Break { label } if !cx.in_breakable && label.is_none() => {
            Warning::ControlFlowOutsideLoop {
                statement: "break".into(),
                line,
            }
        }
        NativeOp::Continue { .. } if !cx.in_loop => Warning::ControlFlowOutsideLoop {
            statement: "continue".into(),
            line,
        },
        NativeOp::BlockBreak { .. } if !cx.in_block_lambda => Warning::BlockExitOutsideBlockLambda {
            statement: "break".into(),
            line,
        },
        NativeOp::BlockReturn if !cx.in_block_lambda => Warning::BlockExitOutsideBlockLambda {
            statement: "return".into(),
            line,
        },
        _ => return,
    };
    report.warnings.push(warning);
}

/// Context for the `index`th entry of `parent.children()`.
fn child_context(parent: &Node, index: usize, cx: Context) -> Context {
    match parent {
        // A function call starts from a fresh environment; a blocklambda
        // keeps the alternation it was created in
        Node::Func { block, .. } => Context {
            in_alt: *block && cx.in_alt,
            in_loop: false,
            in_breakable: false,
            in_block_lambda: *block,
        },
        Node::Alt { .. } => Context { in_alt: true, ..cx },
        // The test is child 0
        Node::Loop { .. } if index > 0 => Context {
            in_loop: true,
            in_breakable: true,
            ..cx
        },
        Node::ForIn { .. } if index == 1 => Context {
            in_loop: true,
            in_breakable: true,
            ..cx
        },
        // The discriminant is child 0
        Node::Switch { .. } if index > 0 => Context {
            in_breakable: true,
            ..cx
        },
        _ => cx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::driver::parse_program;
    use maplit::btreemap;

    fn check(json: &str) -> Report {
        let program = parse_program(json).expect("program should parse");
        check_program(&program)
    }

    #[test]
    fn test_counts_nodes_and_depth() {
        let report = check(
            r#"{"t": "Seq", "body": [
                {"t": "Lit", "v": {"t": "Num", "v": 1}},
                {"t": "Par", "branches": [{"t": "Lit", "v": {"t": "Num", "v": 2}}, {"t": "Hold"}]}
            ]}"#,
        );
        assert_eq!(report.nodes, 5);
        assert_eq!(report.max_depth, 3);
        assert_eq!(
            report.constructs,
            btreemap! { "Hold" => 1, "Lit" => 2, "Par" => 1, "Seq" => 1 }
        );
        assert!(report.is_clean());
    }

    #[test]
    fn test_collapse_inside_alt_branch() {
        let report = check(
            r#"{"t": "Alt", "branches": [
                {"t": "Seq", "body": [{"t": "Collapse", "line": 3}]},
                {"t": "Hold"}
            ]}"#,
        );
        assert!(report.is_clean(), "unexpected warnings: {:?}", report.warnings);
    }

    #[test]
    fn test_collapse_outside_alt() {
        let report = check(r#"{"t": "Seq", "body": [{"t": "Collapse", "line": 7}]}"#);
        assert_eq!(report.warnings, vec![Warning::CollapseOutsideAlt { line: 7 }]);
        assert_eq!(
            report.warnings[0].to_string(),
            "'collapse' outside of an alternation at line 7"
        );
    }

    #[test]
    fn test_function_body_leaves_alternation() {
        let report = check(
            r#"{"t": "Alt", "branches": [
                {"t": "Func", "body": {"t": "Collapse", "line": 2}},
                {"t": "Func", "block": true, "body": {"t": "Collapse", "line": 4}}
            ]}"#,
        );
        assert_eq!(report.warnings, vec![Warning::CollapseOutsideAlt { line: 2 }]);
    }

    #[test]
    fn test_break_placement() {
        let report = check(
            r#"{"t": "Seq", "body": [
                {"t": "Loop", "test": {"t": "Lit", "v": {"t": "Bool", "v": true}},
                 "body": [{"t": "Sc", "line": 2, "op": {"Break": {}}}]},
                {"t": "Switch", "discriminant": {"t": "Lit", "v": {"t": "Num", "v": 1}}, "clauses": [
                    {"label": {"t": "Default"}, "body": {"t": "Sc", "line": 4, "op": {"Break": {}}}}
                ]},
                {"t": "Sc", "line": 6, "op": {"Break": {}}},
                {"t": "Switch", "discriminant": {"t": "Lit", "v": {"t": "Num", "v": 1}}, "clauses": [
                    {"label": {"t": "Default"}, "body": {"t": "Sc", "line": 8, "op": {"Continue": {}}}}
                ]}
            ]}"#,
        );
        assert_eq!(
            report.warnings,
            vec![
                Warning::ControlFlowOutsideLoop {
                    statement: "break".into(),
                    line: 6
                },
                Warning::ControlFlowOutsideLoop {
                    statement: "continue".into(),
                    line: 8
                },
            ]
        );
    }

    #[test]
    fn test_loop_does_not_reach_into_functions() {
        let report = check(
            r#"{"t": "ForIn", "target": {"t": "Lit", "v": {"t": "List", "v": [{"t": "Num", "v": 1}]}}, "binding": "x",
                "body": {"t": "Func", "body": {"t": "Sc", "line": 3, "op": {"Continue": {}}}}}"#,
        );
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(
            report.warnings[0].to_string(),
            "'continue' statement outside of loop at line 3"
        );
    }

    #[test]
    fn test_block_exits_need_a_blocklambda() {
        let report = check(
            r#"{"t": "Seq", "flags": {"top_level": true}, "body": [
                {"t": "Sc", "line": 1, "op": "Return"},
                {"t": "Sc", "line": 2, "op": "BlockReturn"},
                {"t": "Func", "block": true, "body": {"t": "Sc", "line": 3, "op": "BlockReturn"}},
                {"t": "Func", "body": {"t": "Sc", "line": 4, "op": {"BlockBreak": {}}}}
            ]}"#,
        );
        assert_eq!(
            report.warnings,
            vec![
                Warning::BlockExitOutsideBlockLambda {
                    statement: "return".into(),
                    line: 2
                },
                Warning::BlockExitOutsideBlockLambda {
                    statement: "break".into(),
                    line: 4
                },
            ]
        );
    }
}
