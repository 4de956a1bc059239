//! Native operations applied by scalar calls

use super::env::Env;
use super::errors::{self, ErrorInfo};
use super::types::{Completion, FrameKind, NativeOp, Node, Signal, Val};
use super::vm::Engine;
use indexmap::IndexMap;
use std::cmp::Ordering;

type OpResult = Result<Val, ErrorInfo>;

impl Engine {
    /// Apply `op` to already evaluated arguments.
    pub(crate) fn apply_native(
        &mut self,
        op: &NativeOp,
        args: Vec<Val>,
        env: &Env,
        line: u32,
    ) -> Completion {
        let file = &*env.file;
        let result = match op {
            NativeOp::Return => {
                let value = args.into_iter().next().unwrap_or(Val::Null);
                return Completion::Signal(Signal::Return {
                    value,
                    target: None,
                });
            }
            NativeOp::Break { label } => return Completion::Signal(Signal::Break(label.clone())),
            NativeOp::Continue { label } => {
                return Completion::Signal(Signal::Continue(label.clone()))
            }
            NativeOp::Throw => {
                let value = args.into_iter().next().unwrap_or(Val::Null);
                return Completion::Signal(Signal::throw(value, line, file));
            }
            NativeOp::BlockBreak { label } => self.block_break(label.clone(), env),
            NativeOp::BlockReturn => {
                let value = args.into_iter().next().unwrap_or(Val::Null);
                self.block_return(value, env)
            }
            NativeOp::Define { name } => {
                let value = args.into_iter().next().unwrap_or(Val::Null);
                env.args.define(name, value.clone());
                Ok(Completion::Value(value))
            }
            NativeOp::Assign { name } => {
                let value = args.into_iter().next().unwrap_or(Val::Null);
                if env.args.assign(name, value.clone()) {
                    Ok(Completion::Value(value))
                } else {
                    Err(ErrorInfo::new(
                        errors::REFERENCE_ERROR,
                        format!("{} is not defined", name),
                    ))
                }
            }
            other => apply_pure(other, args).map(Completion::Value),
        };
        match result {
            Ok(completion) => completion,
            Err(info) => Completion::Signal(Signal::throw(Val::Error(info), line, file)),
        }
    }

    fn block_break(&self, label: Option<String>, env: &Env) -> Result<Completion, ErrorInfo> {
        let Some(target) = env.blref else {
            return Err(ErrorInfo::new(
                errors::BLOCK_EXIT_ERROR,
                "Unexpected blocklambda break",
            ));
        };
        if !self.is_live(target) {
            return Err(ErrorInfo::new(
                errors::BLOCK_EXIT_ERROR,
                "Blocklambda break to inactive scope",
            ));
        }
        Ok(Completion::Signal(Signal::BlockExit { label, target }))
    }

    fn block_return(&self, value: Val, env: &Env) -> Result<Completion, ErrorInfo> {
        let Some(target) = env.blref else {
            return Err(ErrorInfo::new(
                errors::BLOCK_EXIT_ERROR,
                "Unexpected blocklambda return",
            ));
        };
        let Some(frame) = self.try_frame(target) else {
            return Err(ErrorInfo::new(
                errors::BLOCK_EXIT_ERROR,
                "Blocklambda return to inactive function",
            ));
        };
        if let FrameKind::Seq(seq) = &frame.kind {
            if let Node::Seq { flags, .. } = &*seq.node {
                if flags.top_level {
                    return Err(ErrorInfo::new(
                        errors::BLOCK_EXIT_ERROR,
                        "Invalid blocklambda 'return' statement; 'return' is only allowed in blocklambdas that are nested in functions",
                    ));
                }
            }
        }
        Ok(Completion::Signal(Signal::Return {
            value,
            target: Some(target),
        }))
    }
}

/* ===================== Pure Operations ===================== */

fn type_error(msg: impl Into<String>) -> ErrorInfo {
    ErrorInfo::new(errors::TYPE_ERROR, msg)
}

fn two(args: Vec<Val>) -> (Val, Val) {
    let mut it = args.into_iter();
    let a = it.next().unwrap_or(Val::Null);
    let b = it.next().unwrap_or(Val::Null);
    (a, b)
}

fn numbers(op: &str, a: &Val, b: &Val) -> Result<(f64, f64), ErrorInfo> {
    match (a, b) {
        (Val::Num(x), Val::Num(y)) => Ok((*x, *y)),
        _ => Err(type_error(format!(
            "cannot apply '{}' to {} and {}",
            op,
            a.type_name(),
            b.type_name()
        ))),
    }
}

/// `None` when either side is NaN; such comparisons are false every way.
fn compare(a: &Val, b: &Val) -> Result<Option<Ordering>, ErrorInfo> {
    match (a, b) {
        (Val::Num(x), Val::Num(y)) => Ok(x.partial_cmp(y)),
        (Val::Str(x), Val::Str(y)) => Ok(Some(x.cmp(y))),
        _ => Err(type_error(format!(
            "cannot compare {} with {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn get(target: &Val, key: &Val) -> OpResult {
    match (target, key) {
        (Val::List(items), Val::Num(i)) => {
            if *i < 0.0 || i.fract() != 0.0 {
                return Ok(Val::Null);
            }
            Ok(items.get(*i as usize).cloned().unwrap_or(Val::Null))
        }
        (Val::List(items), Val::Str(k)) if k == "length" => Ok(Val::Num(items.len() as f64)),
        (Val::Obj(map), Val::Str(k)) => Ok(map.get(k).cloned().unwrap_or(Val::Null)),
        (Val::Str(s), Val::Num(i)) => Ok(s
            .chars()
            .nth(*i as usize)
            .map(|c| Val::Str(c.to_string()))
            .unwrap_or(Val::Null)),
        (Val::Str(s), Val::Str(k)) if k == "length" => Ok(Val::Num(s.chars().count() as f64)),
        (Val::Error(info), Val::Str(k)) => Ok(match k.as_str() {
            "message" => Val::Str(info.message.clone()),
            "code" => Val::Str(info.code.clone()),
            "line" => Val::Num(info.line as f64),
            _ => Val::Null,
        }),
        (Val::Null, _) => Err(type_error(format!(
            "cannot read property '{}' of null",
            key.display()
        ))),
        _ => Ok(Val::Null),
    }
}

/// Operations that only look at their arguments.
fn apply_pure(op: &NativeOp, args: Vec<Val>) -> OpResult {
    match op {
        NativeOp::Add => {
            let (a, b) = two(args);
            match (&a, &b) {
                (Val::Num(x), Val::Num(y)) => Ok(Val::Num(x + y)),
                (Val::Str(_), _) | (_, Val::Str(_)) => {
                    Ok(Val::Str(format!("{}{}", a.display(), b.display())))
                }
                (Val::List(x), Val::List(y)) => {
                    Ok(Val::List(x.iter().chain(y.iter()).cloned().collect()))
                }
                _ => numbers("+", &a, &b).map(|(x, y)| Val::Num(x + y)),
            }
        }
        NativeOp::Sub => {
            let (a, b) = two(args);
            numbers("-", &a, &b).map(|(x, y)| Val::Num(x - y))
        }
        NativeOp::Mul => {
            let (a, b) = two(args);
            numbers("*", &a, &b).map(|(x, y)| Val::Num(x * y))
        }
        NativeOp::Div => {
            let (a, b) = two(args);
            numbers("/", &a, &b).map(|(x, y)| Val::Num(x / y))
        }
        NativeOp::Mod => {
            let (a, b) = two(args);
            numbers("%", &a, &b).map(|(x, y)| Val::Num(x % y))
        }
        NativeOp::Eq => {
            let (a, b) = two(args);
            Ok(Val::Bool(a == b))
        }
        NativeOp::Ne => {
            let (a, b) = two(args);
            Ok(Val::Bool(a != b))
        }
        NativeOp::Lt => {
            let (a, b) = two(args);
            Ok(Val::Bool(compare(&a, &b)? == Some(Ordering::Less)))
        }
        NativeOp::Le => {
            let (a, b) = two(args);
            Ok(Val::Bool(matches!(
                compare(&a, &b)?,
                Some(Ordering::Less | Ordering::Equal)
            )))
        }
        NativeOp::Gt => {
            let (a, b) = two(args);
            Ok(Val::Bool(compare(&a, &b)? == Some(Ordering::Greater)))
        }
        NativeOp::Ge => {
            let (a, b) = two(args);
            Ok(Val::Bool(matches!(
                compare(&a, &b)?,
                Some(Ordering::Greater | Ordering::Equal)
            )))
        }
        NativeOp::Not => {
            let (a, _) = two(args);
            Ok(Val::Bool(!a.is_truthy()))
        }
        NativeOp::Neg => match two(args).0 {
            Val::Num(x) => Ok(Val::Num(-x)),
            other => Err(type_error(format!("cannot negate {}", other.type_name()))),
        },
        NativeOp::Arr => Ok(Val::List(args)),
        NativeOp::Obj { keys } => {
            let mut values = args.into_iter();
            let map: IndexMap<String, Val> = keys
                .iter()
                .map(|k| (k.clone(), values.next().unwrap_or(Val::Null)))
                .collect();
            Ok(Val::Obj(map))
        }
        NativeOp::Get => {
            let (target, key) = two(args);
            get(&target, &key)
        }
        other => Err(ErrorInfo::new(
            errors::INTERNAL_ERROR,
            format!("{:?} is not a pure operation", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Val {
        Val::Num(n)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(apply_pure(&NativeOp::Add, vec![num(2.0), num(3.0)]), Ok(num(5.0)));
        assert_eq!(apply_pure(&NativeOp::Mod, vec![num(7.0), num(4.0)]), Ok(num(3.0)));
        assert_eq!(
            apply_pure(&NativeOp::Add, vec![Val::str("n="), num(1.0)]),
            Ok(Val::str("n=1"))
        );

        let err = apply_pure(&NativeOp::Sub, vec![Val::str("a"), num(1.0)]).unwrap_err();
        assert_eq!(err.code, errors::TYPE_ERROR);
    }

    #[test]
    fn test_comparison() {
        let nan = num(f64::NAN);
        assert_eq!(apply_pure(&NativeOp::Lt, vec![nan.clone(), num(1.0)]), Ok(Val::Bool(false)));
        assert_eq!(apply_pure(&NativeOp::Ge, vec![nan, num(1.0)]), Ok(Val::Bool(false)));
        assert_eq!(apply_pure(&NativeOp::Lt, vec![num(1.0), num(2.0)]), Ok(Val::Bool(true)));
        assert_eq!(apply_pure(&NativeOp::Ge, vec![num(2.0), num(2.0)]), Ok(Val::Bool(true)));
        assert_eq!(
            apply_pure(&NativeOp::Gt, vec![Val::str("b"), Val::str("a")]),
            Ok(Val::Bool(true))
        );
        assert_eq!(
            apply_pure(&NativeOp::Eq, vec![Val::List(vec![num(1.0)]), Val::List(vec![num(1.0)])]),
            Ok(Val::Bool(true))
        );
    }

    #[test]
    fn test_get() {
        let list = Val::List(vec![Val::str("a"), Val::str("b")]);
        assert_eq!(get(&list, &num(1.0)), Ok(Val::str("b")));
        assert_eq!(get(&list, &num(5.0)), Ok(Val::Null));
        assert_eq!(get(&list, &Val::str("length")), Ok(num(2.0)));
        assert!(get(&Val::Null, &Val::str("x")).is_err());
    }

    #[test]
    fn test_obj() {
        let op = NativeOp::Obj {
            keys: vec!["a".to_string(), "b".to_string()],
        };
        let map = match apply_pure(&op, vec![num(1.0)]) {
            Ok(Val::Obj(map)) => map,
            other => unreachable!("Expected object, got {:?}", other),
        };
        assert_eq!(map.get("a"), Some(&num(1.0)));
        assert_eq!(map.get("b"), Some(&Val::Null));
    }
}
