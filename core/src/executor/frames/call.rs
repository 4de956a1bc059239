//! Call frames
//!
//! Evaluate callee (or receiver) and arguments in order, then invoke. A
//! callee that suspends gets the call site pushed onto its call stack, so a
//! throw that later surfaces through it carries the asynchronous trace.

use crate::executor::arena::FrameId;
use crate::executor::env::Env;
use crate::executor::errors;
use crate::executor::handles::Closure;
use crate::executor::types::{CallFrame, Completion, FrameKind, Node, NodeRef, Outcome, Signal, Val};
use crate::executor::vm::{state_mut, Engine, Flow};
use std::rc::Rc;

/// Child index used once the callee itself is running
const INVOKED: usize = usize::MAX;

fn operand_nodes(node: &Node) -> (u32, Vec<&NodeRef>) {
    match node {
        Node::Call { line, callee, args } => (*line, std::iter::once(callee).chain(args).collect()),
        Node::MethodCall {
            line, target, args, ..
        } => (*line, std::iter::once(target).chain(args).collect()),
        other => unreachable!("call frame holds {}", other.name()),
    }
}

/// Name used in "is not a function" errors
fn callee_name(node: &Node, callee: &Val) -> String {
    match node {
        Node::Call { callee: c, .. } => match &**c {
            Node::Var { name } => name.clone(),
            _ => callee.display(),
        },
        Node::MethodCall { method, .. } => method.clone(),
        _ => callee.display(),
    }
}

impl Engine {
    pub(crate) fn call_start(&mut self, node: &NodeRef, env: &Rc<Env>) -> Outcome {
        let id = self.alloc(
            FrameKind::Call(CallFrame {
                node: node.clone(),
                operands: Vec::new(),
            }),
            env.clone(),
        );
        self.call_run(id)
    }

    pub(crate) fn call_cont(&mut self, id: FrameId, idx: usize, completion: Completion) -> Outcome {
        if idx == INVOKED {
            return self.call_finish(id, completion);
        }
        match completion {
            Completion::Value(v) => {
                state_mut!(self, id, Call).operands.push(v);
                self.call_run(id)
            }
            signal => self.return_to_parent(id, signal),
        }
    }

    fn call_run(&mut self, id: FrameId) -> Outcome {
        let node = state_mut!(self, id, Call).node.clone();
        let env = self.env_of(id);
        let (line, nodes) = operand_nodes(&node);

        loop {
            let next = state_mut!(self, id, Call).operands.len();
            if next >= nodes.len() {
                break;
            }
            match self.run_child_checked(id, nodes[next], &env, next) {
                Flow::Done(Completion::Value(v)) => state_mut!(self, id, Call).operands.push(v),
                Flow::Done(signal) => return self.return_to_parent(id, signal),
                Flow::Suspended => return Outcome::Pending(id),
                Flow::Aborted => return self.return_to_parent(id, Completion::null()),
            }
        }

        let operands = std::mem::take(&mut state_mut!(self, id, Call).operands);
        let out = self.invoke(&node, operands, &env, line);
        if self.try_frame(id).map_or(true, |f| f.aborted) {
            if let Outcome::Pending(child) = out {
                self.cancel(child);
            }
            return self.return_to_parent(id, Completion::null());
        }
        match out {
            Outcome::Pending(child) => {
                self.push_call_site(child, &env.file, line);
                self.set_child(id, child, INVOKED);
                Outcome::Pending(id)
            }
            Outcome::Done(c) => self.call_finish(id, c),
            Outcome::Delivered => {
                self.call_finish(id, Completion::internal("callee delivered synchronously"))
            }
        }
    }

    fn call_finish(&mut self, id: FrameId, completion: Completion) -> Outcome {
        let env = self.env_of(id);
        let completion = match completion {
            // A block lambda broke out of the call that received it
            Completion::Signal(Signal::BlockExit { target, .. }) if Some(target) == env.blscope => {
                Completion::null()
            }
            other => other,
        };
        self.return_to_parent(id, completion)
    }

    fn invoke(&mut self, node: &Node, operands: Vec<Val>, env: &Rc<Env>, line: u32) -> Outcome {
        let mut operands = operands.into_iter();
        let head = operands.next().unwrap_or(Val::Null);
        let args: Vec<Val> = operands.collect();
        match node {
            Node::MethodCall { method, .. } => match &head {
                Val::Stratum(stratum) => {
                    let stratum = stratum.clone();
                    self.stratum_method(&stratum, method, env, line)
                }
                Val::Obj(map) => match map.get(method) {
                    Some(f) => {
                        let f = f.clone();
                        self.call_value(f, args, head.clone(), env, line, method)
                    }
                    None => not_a_function(method, env, line),
                },
                other => Outcome::Done(Completion::Signal(Signal::error(
                    errors::TYPE_ERROR,
                    format!("cannot call '{}' on {}", method, other.type_name()),
                    line,
                    &env.file,
                ))),
            },
            _ => {
                let name = callee_name(node, &head);
                self.call_value(head, args, Val::Null, env, line, &name)
            }
        }
    }

    /// Invoke a callable value.
    pub(crate) fn call_value(
        &mut self,
        callee: Val,
        args: Vec<Val>,
        this: Val,
        env: &Rc<Env>,
        line: u32,
        name: &str,
    ) -> Outcome {
        match callee {
            Val::Func(closure) => self.invoke_closure(&closure, args, this),
            Val::Native(native) => match self.host_call(&native, args, line, &env.file) {
                Ok(v) => Outcome::Done(Completion::Value(v)),
                Err(e) => Outcome::Done(Completion::Signal(Signal::throw(e, line, &env.file))),
            },
            Val::Resume(handle) => {
                handle.resume(args);
                Outcome::Done(Completion::null())
            }
            _ => not_a_function(name, env, line),
        }
    }

    fn invoke_closure(&mut self, closure: &Closure, args: Vec<Val>, this: Val) -> Outcome {
        let data = &closure.0;
        let scope = data.env.args.child();
        for (i, param) in data.params.iter().enumerate() {
            scope.define(param, args.get(i).cloned().unwrap_or(Val::Null));
        }
        if data.block {
            // Exits keep aiming at the creating block; only the receiving call absorbs them
            let mut env = data.env.with_scope(scope);
            env.blscope = None;
            self.execute_block(&data.body, Rc::new(env))
        } else {
            let env = Rc::new(Env {
                args: scope,
                this,
                file: data.env.file.clone(),
                blref: None,
                blscope: None,
                fold: None,
            });
            self.exec(&data.body, &env)
        }
    }
}

fn not_a_function(name: &str, env: &Env, line: u32) -> Outcome {
    Outcome::Done(Completion::Signal(Signal::error(
        errors::TYPE_ERROR,
        format!("'{}' is not a function", name),
        line,
        &env.file,
    )))
}
