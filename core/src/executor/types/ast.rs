//! Execution tree node types
//!
//! A program arrives as a tree of [`Node`]s produced by an upstream compiler
//! (or written by hand as JSON). Subtrees are shared through `Rc`, so frames
//! can hold on to the node they are running without copying it.

use super::values::Val;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Shared handle to a node
pub type NodeRef = Rc<Node>;

fn is_false(b: &bool) -> bool {
    !*b
}

fn default_resume() -> String {
    "resume".to_string()
}

/* ===================== Sequence Flags ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortCircuit {
    And,
    Or,
}

/// Mode bits for a sequence node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeqFlags {
    /// Function body: swallows untargeted returns and returns aimed at it
    #[serde(default, skip_serializing_if = "is_false")]
    pub scope: bool,
    /// Block lambdas created inside return and break to this sequence
    #[serde(default, skip_serializing_if = "is_false")]
    pub block: bool,
    /// Program root: returns keep their value, block lambdas may break here
    #[serde(default, skip_serializing_if = "is_false")]
    pub top_level: bool,
    /// With `scope`, deliver the last child's value instead of null
    #[serde(default, skip_serializing_if = "is_false")]
    pub keep_value: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_circuit: Option<ShortCircuit>,
}

impl SeqFlags {
    /// Whether this sequence intercepts Return signals
    pub fn swallows_return(&self) -> bool {
        self.scope || self.top_level
    }

    /// Whether block exits from block lambdas created inside target this
    /// sequence
    pub fn is_block_boundary(&self) -> bool {
        self.block || self.top_level
    }
}

/* ===================== Native Operations ===================== */

/// Synchronous operation applied by a scalar-call node to its evaluated
/// arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NativeOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Not,
    Neg,
    /// Build a list from all arguments
    Arr,
    /// Build an object pairing `keys` with the arguments
    Obj { keys: Vec<String> },
    /// `args[0][args[1]]`
    Get,
    /// Declare a variable in the current scope
    Define { name: String },
    /// Assign to the nearest scope declaring the variable
    Assign { name: String },
    Return,
    Break {
        #[serde(default)]
        label: Option<String>,
    },
    Continue {
        #[serde(default)]
        label: Option<String>,
    },
    Throw,
    /// `break` inside a block lambda
    BlockBreak {
        #[serde(default)]
        label: Option<String>,
    },
    /// `return` inside a block lambda
    BlockReturn,
}

/* ===================== Nodes ===================== */

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum CaseLabel {
    Case { value: NodeRef },
    Default,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clause {
    pub label: CaseLabel,
    pub body: NodeRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catch {
    pub binding: String,
    pub body: NodeRef,
}

/// Execution tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Node {
    /// Literal value
    Lit { v: Val },
    /// Variable lookup
    Var { name: String },
    /// Ordered children with scope/short-circuit modes
    Seq {
        #[serde(default)]
        flags: SeqFlags,
        body: Vec<NodeRef>,
    },
    /// Evaluate arguments in order, then apply a native operation
    Sc {
        #[serde(default)]
        line: u32,
        op: NativeOp,
        #[serde(default)]
        args: Vec<NodeRef>,
    },
    /// Function or block-lambda literal
    Func {
        #[serde(default)]
        params: Vec<String>,
        body: NodeRef,
        #[serde(default, skip_serializing_if = "is_false")]
        block: bool,
    },
    Call {
        #[serde(default)]
        line: u32,
        callee: NodeRef,
        #[serde(default)]
        args: Vec<NodeRef>,
    },
    MethodCall {
        #[serde(default)]
        line: u32,
        target: NodeRef,
        method: String,
        #[serde(default)]
        args: Vec<NodeRef>,
    },
    If {
        test: NodeRef,
        then: NodeRef,
        #[serde(default)]
        otherwise: Option<NodeRef>,
    },
    Switch {
        discriminant: NodeRef,
        clauses: Vec<Clause>,
    },
    Try {
        /// Catch every completion, passing `[value, is_error]` to the handler
        #[serde(default, skip_serializing_if = "is_false")]
        catch_all: bool,
        body: NodeRef,
        #[serde(default)]
        catch: Option<Catch>,
        #[serde(default)]
        retract: Option<NodeRef>,
        #[serde(default)]
        finally: Option<NodeRef>,
    },
    Loop {
        #[serde(default, skip_serializing_if = "is_false")]
        do_while: bool,
        test: NodeRef,
        #[serde(default)]
        increment: Option<NodeRef>,
        body: Vec<NodeRef>,
    },
    ForIn {
        target: NodeRef,
        binding: String,
        body: NodeRef,
    },
    /// Run all branches concurrently, finish when all finish
    Par { branches: Vec<NodeRef> },
    /// Run all branches concurrently, finish when the first finishes
    Alt { branches: Vec<NodeRef> },
    /// Wait for the resume function bound inside `body` to be called
    Suspend {
        #[serde(default = "default_resume")]
        resume: String,
        body: NodeRef,
        #[serde(default)]
        bindings: Vec<String>,
    },
    /// Start `body` as an independent stratum
    Spawn {
        #[serde(default)]
        line: u32,
        body: NodeRef,
    },
    /// Make the enclosing alternation branch the winner
    Collapse {
        #[serde(default)]
        line: u32,
    },
    /// Never completes; only abort ends it
    Hold,
}

impl Node {
    pub fn name(&self) -> &'static str {
        match self {
            Node::Lit { .. } => "Lit",
            Node::Var { .. } => "Var",
            Node::Seq { .. } => "Seq",
            Node::Sc { .. } => "Sc",
            Node::Func { .. } => "Func",
            Node::Call { .. } => "Call",
            Node::MethodCall { .. } => "MethodCall",
            Node::If { .. } => "If",
            Node::Switch { .. } => "Switch",
            Node::Try { .. } => "Try",
            Node::Loop { .. } => "Loop",
            Node::ForIn { .. } => "ForIn",
            Node::Par { .. } => "Par",
            Node::Alt { .. } => "Alt",
            Node::Suspend { .. } => "Suspend",
            Node::Spawn { .. } => "Spawn",
            Node::Collapse { .. } => "Collapse",
            Node::Hold => "Hold",
        }
    }

    /// Direct children, in evaluation order.
    pub fn children(&self) -> Vec<&NodeRef> {
        match self {
            Node::Lit { .. } | Node::Var { .. } | Node::Collapse { .. } | Node::Hold => vec![],
            Node::Seq { body, .. } => body.iter().collect(),
            Node::Sc { args, .. } => args.iter().collect(),
            Node::Func { body, .. } | Node::Spawn { body, .. } | Node::Suspend { body, .. } => {
                vec![body]
            }
            Node::Call { callee, args, .. } => std::iter::once(callee).chain(args).collect(),
            Node::MethodCall { target, args, .. } => std::iter::once(target).chain(args).collect(),
            Node::If {
                test,
                then,
                otherwise,
            } => std::iter::once(test)
                .chain(std::iter::once(then))
                .chain(otherwise.iter())
                .collect(),
            Node::Switch {
                discriminant,
                clauses,
            } => {
                let mut out = vec![discriminant];
                for clause in clauses {
                    if let CaseLabel::Case { value } = &clause.label {
                        out.push(value);
                    }
                    out.push(&clause.body);
                }
                out
            }
            Node::Try {
                body,
                catch,
                retract,
                finally,
                ..
            } => std::iter::once(body)
                .chain(catch.iter().map(|c| &c.body))
                .chain(retract.iter())
                .chain(finally.iter())
                .collect(),
            Node::Loop {
                test,
                increment,
                body,
                ..
            } => std::iter::once(test)
                .chain(body.iter())
                .chain(increment.iter())
                .collect(),
            Node::ForIn { target, body, .. } => vec![target, body],
            Node::Par { branches } | Node::Alt { branches } => branches.iter().collect(),
        }
    }
}
