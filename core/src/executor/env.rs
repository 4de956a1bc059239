//! Lexical environment threaded through execution
//!
//! Variables live in a chain of shared [`Scope`]s. The [`Env`] record is
//! cheap to clone and is copied whenever a construct changes one of the
//! block-lambda or alternation references.

use super::arena::FrameId;
use super::types::Val;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

struct ScopeData {
    vars: HashMap<String, Val>,
    parent: Option<Scope>,
}

/// One level of variable bindings, shared by every closure capturing it
#[derive(Clone)]
pub struct Scope(Rc<RefCell<ScopeData>>);

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        let mut names: Vec<&String> = data.vars.keys().collect();
        names.sort();
        f.debug_struct("Scope")
            .field("vars", &names)
            .field("has_parent", &data.parent.is_some())
            .finish()
    }
}

impl Default for Scope {
    fn default() -> Self {
        Scope::root()
    }
}

impl Scope {
    pub fn root() -> Self {
        Scope(Rc::new(RefCell::new(ScopeData {
            vars: HashMap::new(),
            parent: None,
        })))
    }

    pub fn child(&self) -> Self {
        Scope(Rc::new(RefCell::new(ScopeData {
            vars: HashMap::new(),
            parent: Some(self.clone()),
        })))
    }

    pub fn get(&self, name: &str) -> Option<Val> {
        let data = self.0.borrow();
        match data.vars.get(name) {
            Some(v) => Some(v.clone()),
            None => data.parent.as_ref().and_then(|p| p.get(name)),
        }
    }

    /// Bind `name` in this scope, shadowing outer bindings.
    pub fn define(&self, name: &str, val: Val) {
        self.0.borrow_mut().vars.insert(name.to_string(), val);
    }

    /// Update the nearest binding of `name`. Returns false if unbound.
    pub fn assign(&self, name: &str, val: Val) -> bool {
        let mut data = self.0.borrow_mut();
        if let Some(slot) = data.vars.get_mut(name) {
            *slot = val;
            return true;
        }
        match &data.parent {
            Some(parent) => parent.assign(name, val),
            None => false,
        }
    }
}

/// Alternation branch a collapse inside it would select
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fold {
    pub frame: FrameId,
    pub branch: usize,
}

/// Execution environment
#[derive(Debug, Clone)]
pub struct Env {
    pub args: Scope,
    pub this: Val,
    pub file: Rc<str>,
    /// Sequence that a block-lambda `return` or `break` unwinds to
    pub blref: Option<FrameId>,
    /// Boundary where an arriving block exit is absorbed
    pub blscope: Option<FrameId>,
    pub fold: Option<Fold>,
}

impl Env {
    pub fn new(args: Scope, file: &str) -> Self {
        Env {
            args,
            this: Val::Null,
            file: Rc::from(file),
            blref: None,
            blscope: None,
            fold: None,
        }
    }

    /// Same environment with a fresh child scope
    pub fn with_scope(&self, args: Scope) -> Self {
        Env {
            args,
            ..self.clone()
        }
    }
}
