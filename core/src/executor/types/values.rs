//! Runtime value types

use super::super::errors::ErrorInfo;
use super::super::handles::{Closure, ResumeHandle, StratumHandle};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Runtime value type
///
/// The first group of variants is plain data and round-trips through JSON.
/// Closures and the two runtime handles only exist while a program runs and
/// are skipped by serde.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Val {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    List(Vec<Val>),
    /// Object with keys in insertion order
    Obj(IndexMap<String, Val>),
    /// Error value with code and message
    Error(ErrorInfo),
    /// Host-provided callable, dispatched by name
    Native(String),
    #[serde(skip)]
    Func(Closure),
    #[serde(skip)]
    Resume(ResumeHandle),
    #[serde(skip)]
    Stratum(StratumHandle),
}

impl Val {
    /// Check if value is truthy (for conditionals)
    pub fn is_truthy(&self) -> bool {
        match self {
            Val::Bool(b) => *b,
            Val::Null => false,
            Val::Num(n) => *n != 0.0 && !n.is_nan(),
            Val::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn str(s: impl Into<String>) -> Val {
        Val::Str(s.into())
    }

    /// Label carried by a Break signal, as a value.
    pub fn from_label(label: Option<String>) -> Val {
        label.map(Val::Str).unwrap_or(Val::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Val::Null => "null",
            Val::Bool(_) => "boolean",
            Val::Num(_) => "number",
            Val::Str(_) => "string",
            Val::List(_) => "list",
            Val::Obj(_) => "object",
            Val::Error(_) => "error",
            Val::Native(_) | Val::Func(_) | Val::Resume(_) => "function",
            Val::Stratum(_) => "stratum",
        }
    }

    /// Keys visited by a for-in loop, in enumeration order.
    ///
    /// Objects yield their keys, lists and strings yield their indices.
    /// Everything else is empty.
    pub fn enumerate_keys(&self) -> Box<dyn Iterator<Item = String> + '_> {
        match self {
            Val::Obj(map) => Box::new(map.keys().cloned()),
            Val::List(items) => Box::new((0..items.len()).map(|i| i.to_string())),
            Val::Str(s) => Box::new((0..s.chars().count()).map(|i| i.to_string())),
            _ => Box::new(std::iter::empty()),
        }
    }

    /// Human-readable rendering used by `print` and string concatenation.
    pub fn display(&self) -> String {
        match self {
            Val::Null => "null".to_string(),
            Val::Bool(b) => b.to_string(),
            Val::Num(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Val::Str(s) => s.clone(),
            Val::List(items) => {
                let parts: Vec<String> = items.iter().map(Val::display).collect();
                format!("[{}]", parts.join(", "))
            }
            Val::Obj(map) => {
                let parts: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v.display()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Val::Error(info) => format!("{}: {}", info.code, info.message),
            Val::Native(name) => format!("[native {}]", name),
            Val::Func(_) => "[function]".to_string(),
            Val::Resume(_) => "[resume]".to_string(),
            Val::Stratum(_) => "[object Stratum]".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Val::Null.is_truthy());
        assert!(!Val::Num(0.0).is_truthy());
        assert!(!Val::str("").is_truthy());
        assert!(Val::Num(2.0).is_truthy());
        assert!(Val::List(vec![]).is_truthy());
    }

    #[test]
    fn test_enumerate_keys() {
        let list = Val::List(vec![Val::Null, Val::Null]);
        let keys: Vec<String> = list.enumerate_keys().collect();
        assert_eq!(keys, vec!["0", "1"]);

        let mut map = IndexMap::new();
        map.insert("b".to_string(), Val::Null);
        map.insert("a".to_string(), Val::Null);
        let keys: Vec<String> = Val::Obj(map).enumerate_keys().collect();
        assert_eq!(keys, vec!["b", "a"]);

        assert_eq!(Val::Num(3.0).enumerate_keys().count(), 0);
    }

    #[test]
    fn test_value_json_shape() {
        let v: Val = serde_json::from_str(r#"{"t": "Num", "v": 1.5}"#).unwrap();
        assert_eq!(v, Val::Num(1.5));
        assert_eq!(Val::Num(4.0).display(), "4");
    }
}
