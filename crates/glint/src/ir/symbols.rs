//! Lexically scoped symbol tables and the variables they own.
//!
//! Scopes form a parent-linked tree held in a [`SymbolArena`]; the arena
//! also owns every [`Variable`] in the program, so a [`VarId`] stays valid
//! for as long as the program does regardless of what happens to the
//! statement tree that declared it.

use std::collections::HashMap;

use crate::intern::{ExprId, FunctionId, Name, ScopeId, TypeId, VarId};

/// The subset of declaration modifiers the inliner cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub is_in: bool,
    pub is_out: bool,
    pub is_inline: bool,
}

impl Modifiers {
    pub fn out() -> Self {
        Self {
            is_out: true,
            ..Self::default()
        }
    }

    pub fn inline() -> Self {
        Self {
            is_inline: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Global,
    Parameter,
    Local,
    InterfaceBlockField,
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub offset: u32,
    pub modifiers: Modifiers,
    pub name: Name,
    pub ty: TypeId,
    pub storage: Storage,
    pub initial_value: Option<ExprId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeEntry {
    Variable(VarId),
    Function(FunctionId),
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    entries: HashMap<Name, ScopeEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolArena {
    scopes: Vec<Scope>,
    vars: Vec<Variable>,
}

impl SymbolArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId::new(self.scopes.len());
        self.scopes.push(Scope {
            parent,
            entries: HashMap::new(),
        });
        id
    }

    /// Resolves `name` starting at `scope`, walking parent scopes.
    pub fn lookup(&self, scope: ScopeId, name: Name) -> Option<ScopeEntry> {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            let scope = &self.scopes[id.index()];
            if let Some(&entry) = scope.entries.get(&name) {
                return Some(entry);
            }
            cursor = scope.parent;
        }
        None
    }

    /// Binds `name` in `scope` itself; parent scopes are unaffected and an
    /// existing binding in `scope` is replaced.
    pub fn insert(&mut self, scope: ScopeId, name: Name, entry: ScopeEntry) {
        self.scopes[scope.index()].entries.insert(name, entry);
    }

    /// Takes ownership of `var`, binds it in `scope` under its own name,
    /// and returns its stable id.
    pub fn declare_variable(&mut self, scope: ScopeId, var: Variable) -> VarId {
        let id = VarId::new(self.vars.len());
        let name = var.name;
        self.vars.push(var);
        self.insert(scope, name, ScopeEntry::Variable(id));
        id
    }

    pub fn var(&self, id: VarId) -> &Variable {
        &self.vars[id.index()]
    }

    pub fn var_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.vars[id.index()]
    }
}
