//! Node constructors
//!
//! Shorthands for assembling execution trees in Rust: used by the tests and
//! by embedders that generate programs without going through JSON.

use super::types::{
    CaseLabel, Catch, Clause, NativeOp, Node, NodeRef, SeqFlags, ShortCircuit, Val,
};
use std::rc::Rc;

pub fn lit(v: Val) -> NodeRef {
    Rc::new(Node::Lit { v })
}

pub fn num(n: f64) -> NodeRef {
    lit(Val::Num(n))
}

pub fn text(s: &str) -> NodeRef {
    lit(Val::str(s))
}

pub fn boolean(b: bool) -> NodeRef {
    lit(Val::Bool(b))
}

pub fn null() -> NodeRef {
    lit(Val::Null)
}

pub fn var(name: &str) -> NodeRef {
    Rc::new(Node::Var { name: name.into() })
}

/* ===================== Sequences ===================== */

pub fn seq_with(flags: SeqFlags, body: Vec<NodeRef>) -> NodeRef {
    Rc::new(Node::Seq { flags, body })
}

/// Plain sequence
pub fn seq(body: Vec<NodeRef>) -> NodeRef {
    seq_with(SeqFlags::default(), body)
}

/// Program root
pub fn program(body: Vec<NodeRef>) -> NodeRef {
    seq_with(
        SeqFlags {
            top_level: true,
            ..SeqFlags::default()
        },
        body,
    )
}

/// Function body that keeps the value of its last statement
pub fn body(body: Vec<NodeRef>) -> NodeRef {
    seq_with(
        SeqFlags {
            scope: true,
            keep_value: true,
            ..SeqFlags::default()
        },
        body,
    )
}

/// Block that block lambdas created inside it exit to
pub fn block(body: Vec<NodeRef>) -> NodeRef {
    seq_with(
        SeqFlags {
            block: true,
            ..SeqFlags::default()
        },
        body,
    )
}

pub fn and(body: Vec<NodeRef>) -> NodeRef {
    seq_with(
        SeqFlags {
            short_circuit: Some(ShortCircuit::And),
            ..SeqFlags::default()
        },
        body,
    )
}

pub fn or(body: Vec<NodeRef>) -> NodeRef {
    seq_with(
        SeqFlags {
            short_circuit: Some(ShortCircuit::Or),
            ..SeqFlags::default()
        },
        body,
    )
}

/* ===================== Scalar calls ===================== */

pub fn sc(op: NativeOp, args: Vec<NodeRef>) -> NodeRef {
    Rc::new(Node::Sc { line: 0, op, args })
}

/// Scalar call carrying a source line
pub fn sc_at(line: u32, op: NativeOp, args: Vec<NodeRef>) -> NodeRef {
    Rc::new(Node::Sc { line, op, args })
}

pub fn define(name: &str, value: NodeRef) -> NodeRef {
    sc(NativeOp::Define { name: name.into() }, vec![value])
}

pub fn assign(name: &str, value: NodeRef) -> NodeRef {
    sc(NativeOp::Assign { name: name.into() }, vec![value])
}

pub fn add(a: NodeRef, b: NodeRef) -> NodeRef {
    sc(NativeOp::Add, vec![a, b])
}

pub fn lt(a: NodeRef, b: NodeRef) -> NodeRef {
    sc(NativeOp::Lt, vec![a, b])
}

pub fn eq(a: NodeRef, b: NodeRef) -> NodeRef {
    sc(NativeOp::Eq, vec![a, b])
}

pub fn throw(line: u32, value: NodeRef) -> NodeRef {
    sc_at(line, NativeOp::Throw, vec![value])
}

pub fn ret(value: NodeRef) -> NodeRef {
    sc(NativeOp::Return, vec![value])
}

pub fn brk(label: Option<&str>) -> NodeRef {
    sc(
        NativeOp::Break {
            label: label.map(String::from),
        },
        vec![],
    )
}

pub fn cont(label: Option<&str>) -> NodeRef {
    sc(
        NativeOp::Continue {
            label: label.map(String::from),
        },
        vec![],
    )
}

/// `x = x + 1`
pub fn incr(name: &str) -> NodeRef {
    assign(name, add(var(name), num(1.0)))
}

/* ===================== Functions ===================== */

pub fn func(params: &[&str], body: NodeRef) -> NodeRef {
    Rc::new(Node::Func {
        params: params.iter().map(|p| p.to_string()).collect(),
        body,
        block: false,
    })
}

pub fn block_lambda(params: &[&str], body: NodeRef) -> NodeRef {
    Rc::new(Node::Func {
        params: params.iter().map(|p| p.to_string()).collect(),
        body,
        block: true,
    })
}

pub fn call(callee: NodeRef, args: Vec<NodeRef>) -> NodeRef {
    Rc::new(Node::Call {
        line: 0,
        callee,
        args,
    })
}

pub fn call_at(line: u32, callee: NodeRef, args: Vec<NodeRef>) -> NodeRef {
    Rc::new(Node::Call { line, callee, args })
}

/// Call a global by name
pub fn call_named(name: &str, args: Vec<NodeRef>) -> NodeRef {
    call(var(name), args)
}

pub fn method(target: NodeRef, method: &str, args: Vec<NodeRef>) -> NodeRef {
    Rc::new(Node::MethodCall {
        line: 0,
        target,
        method: method.into(),
        args,
    })
}

/* ===================== Control flow ===================== */

pub fn if_else(test: NodeRef, then: NodeRef, otherwise: Option<NodeRef>) -> NodeRef {
    Rc::new(Node::If {
        test,
        then,
        otherwise,
    })
}

pub fn case(value: NodeRef, body: NodeRef) -> Clause {
    Clause {
        label: CaseLabel::Case { value },
        body,
    }
}

pub fn default_case(body: NodeRef) -> Clause {
    Clause {
        label: CaseLabel::Default,
        body,
    }
}

pub fn switch(discriminant: NodeRef, clauses: Vec<Clause>) -> NodeRef {
    Rc::new(Node::Switch {
        discriminant,
        clauses,
    })
}

/// Try statement; build it up with the `TryBuilder` methods
pub fn try_(body: NodeRef) -> TryBuilder {
    TryBuilder {
        catch_all: false,
        body,
        catch: None,
        retract: None,
        finally: None,
    }
}

pub struct TryBuilder {
    catch_all: bool,
    body: NodeRef,
    catch: Option<Catch>,
    retract: Option<NodeRef>,
    finally: Option<NodeRef>,
}

impl TryBuilder {
    pub fn catch(mut self, binding: &str, body: NodeRef) -> Self {
        self.catch = Some(Catch {
            binding: binding.into(),
            body,
        });
        self
    }

    /// Catch every completion as `[value, is_error]`
    pub fn catch_all(mut self, binding: &str, body: NodeRef) -> Self {
        self.catch_all = true;
        self.catch(binding, body)
    }

    pub fn retract(mut self, body: NodeRef) -> Self {
        self.retract = Some(body);
        self
    }

    pub fn finally(mut self, body: NodeRef) -> Self {
        self.finally = Some(body);
        self
    }

    pub fn build(self) -> NodeRef {
        Rc::new(Node::Try {
            catch_all: self.catch_all,
            body: self.body,
            catch: self.catch,
            retract: self.retract,
            finally: self.finally,
        })
    }
}

pub fn while_loop(test: NodeRef, body: Vec<NodeRef>) -> NodeRef {
    Rc::new(Node::Loop {
        do_while: false,
        test,
        increment: None,
        body,
    })
}

pub fn do_while(test: NodeRef, body: Vec<NodeRef>) -> NodeRef {
    Rc::new(Node::Loop {
        do_while: true,
        test,
        increment: None,
        body,
    })
}

pub fn for_loop(test: NodeRef, increment: NodeRef, body: Vec<NodeRef>) -> NodeRef {
    Rc::new(Node::Loop {
        do_while: false,
        test,
        increment: Some(increment),
        body,
    })
}

pub fn for_in(target: NodeRef, binding: &str, body: NodeRef) -> NodeRef {
    Rc::new(Node::ForIn {
        target,
        binding: binding.into(),
        body,
    })
}

/* ===================== Concurrency ===================== */

pub fn par(branches: Vec<NodeRef>) -> NodeRef {
    Rc::new(Node::Par { branches })
}

pub fn alt(branches: Vec<NodeRef>) -> NodeRef {
    Rc::new(Node::Alt { branches })
}

/// Suspend with the resume function bound as `resume`
pub fn suspend(body: NodeRef, bindings: &[&str]) -> NodeRef {
    Rc::new(Node::Suspend {
        resume: "resume".into(),
        body,
        bindings: bindings.iter().map(|b| b.to_string()).collect(),
    })
}

pub fn spawn(body: NodeRef) -> NodeRef {
    Rc::new(Node::Spawn { line: 0, body })
}

pub fn collapse() -> NodeRef {
    Rc::new(Node::Collapse { line: 0 })
}

pub fn hold() -> NodeRef {
    Rc::new(Node::Hold)
}

/// `suspend { setTimeout(resume, ms); hold() }`
pub fn sleep(ms: f64) -> NodeRef {
    suspend(
        seq(vec![
            call_named("setTimeout", vec![var("resume"), num(ms)]),
            hold(),
        ]),
        &[],
    )
}

pub fn print(args: Vec<NodeRef>) -> NodeRef {
    call_named("print", args)
}
