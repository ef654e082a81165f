//! Arena-backed IR for the Glint shading language.
//!
//! A [`Program`] owns two node arenas (expressions and statements), the
//! symbol arena, and the function declarations. Tree edges are typed
//! indices ([`ExprId`] / [`StmtId`]) rather than owned pointers, which is
//! what lets rewriting passes record *slots* — storage locations they can
//! later overwrite — while the rest of the tree stays addressable.
//!
//! Both node universes are closed sums; passes match exhaustively and an
//! unknown variant is unrepresentable by construction.

pub mod symbols;
pub mod types;
pub mod visit;

use std::sync::atomic::AtomicU32;

use crate::intern::{ExprId, FunctionId, Name, ScopeId, StmtId, TypeId, VarId};

use self::symbols::{Modifiers, SymbolArena};

/// Operator tokens for unary and binary expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    LogicalAnd,
    LogicalOr,
    LogicalNot,
    Assign,
    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    PlusPlus,
    MinusMinus,
}

impl Operator {
    /// `&&` and `||` — the operators whose right operand must not be
    /// evaluated eagerly.
    pub fn is_short_circuit(self) -> bool {
        matches!(self, Operator::LogicalAnd | Operator::LogicalOr)
    }

    pub fn token(self) -> &'static str {
        match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Star => "*",
            Operator::Slash => "/",
            Operator::Percent => "%",
            Operator::Shl => "<<",
            Operator::Shr => ">>",
            Operator::BitAnd => "&",
            Operator::BitOr => "|",
            Operator::BitXor => "^",
            Operator::LogicalAnd => "&&",
            Operator::LogicalOr => "||",
            Operator::LogicalNot => "!",
            Operator::Assign => "=",
            Operator::EqEq => "==",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::LtEq => "<=",
            Operator::GtEq => ">=",
            Operator::PlusPlus => "++",
            Operator::MinusMinus => "--",
        }
    }
}

/// How a variable reference accesses its variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Read,
    Write,
    ReadWrite,
}

#[derive(Debug, Clone)]
pub struct Expression {
    pub offset: u32,
    pub ty: TypeId,
    pub kind: ExprKind,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    BoolLiteral(bool),
    IntLiteral(i64),
    FloatLiteral(f64),
    VariableRef {
        var: VarId,
        ref_kind: RefKind,
    },
    FieldAccess {
        base: ExprId,
        field_index: usize,
    },
    Swizzle {
        base: ExprId,
        components: Vec<u8>,
    },
    Index {
        base: ExprId,
        index: ExprId,
    },
    Prefix {
        op: Operator,
        operand: ExprId,
    },
    Postfix {
        operand: ExprId,
        op: Operator,
    },
    Binary {
        left: ExprId,
        op: Operator,
        right: ExprId,
    },
    Ternary {
        test: ExprId,
        if_true: ExprId,
        if_false: ExprId,
    },
    /// Type-constructor call, e.g. `float2(x, y)`.
    Constructor {
        args: Vec<ExprId>,
    },
    /// Call to a function defined in the program.
    Call {
        function: FunctionId,
        args: Vec<ExprId>,
    },
    /// Call to a host-provided external function.
    ExternalCall {
        name: Name,
        args: Vec<ExprId>,
    },
    FunctionRef(FunctionId),
    TypeRef(TypeId),
    ExternalValueRef(Name),
    SettingRef(Name),
}

impl Expression {
    pub fn variable_ref(offset: u32, ty: TypeId, var: VarId, ref_kind: RefKind) -> Self {
        Self {
            offset,
            ty,
            kind: ExprKind::VariableRef { var, ref_kind },
        }
    }

    pub fn bool_literal(offset: u32, ty: TypeId, value: bool) -> Self {
        Self {
            offset,
            ty,
            kind: ExprKind::BoolLiteral(value),
        }
    }

    /// `Some(var)` when this is a bare variable reference.
    pub fn as_variable_ref(&self) -> Option<VarId> {
        match self.kind {
            ExprKind::VariableRef { var, .. } => Some(var),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// `None` for the `default` label.
    pub value: Option<ExprId>,
    pub stmts: Vec<StmtId>,
}

#[derive(Debug, Clone)]
pub struct Statement {
    pub offset: u32,
    pub kind: StmtKind,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Block {
        stmts: Vec<StmtId>,
        /// The symbol table introduced by this block, if it has one.
        scope: Option<ScopeId>,
        /// Whether the block is a lexical scope in the emitted source. A
        /// scope-less block groups statements without introducing braces.
        is_scope: bool,
    },
    Expression(ExprId),
    VarDeclaration {
        var: VarId,
        init: Option<ExprId>,
    },
    /// A group of declarations sharing one base type, e.g. `int a = 1, b;`.
    DeclarationGroup {
        base_type: TypeId,
        decls: Vec<StmtId>,
    },
    If {
        test: ExprId,
        if_true: StmtId,
        if_false: Option<StmtId>,
    },
    For {
        init: Option<StmtId>,
        test: Option<ExprId>,
        next: Option<ExprId>,
        body: StmtId,
        scope: Option<ScopeId>,
    },
    While {
        test: ExprId,
        body: StmtId,
    },
    DoWhile {
        body: StmtId,
        test: ExprId,
    },
    Switch {
        value: ExprId,
        cases: Vec<SwitchCase>,
        scope: Option<ScopeId>,
    },
    Return(Option<ExprId>),
    Break,
    Continue,
    Discard,
    /// Semantically a no-op; records that `FunctionId`'s body has been
    /// spliced at this position so recursion detection can see through
    /// partially rewritten code.
    InlineMarker(FunctionId),
    Nop,
}

impl Statement {
    pub fn nop() -> Self {
        Self {
            offset: 0,
            kind: StmtKind::Nop,
        }
    }

    pub fn expression(offset: u32, expr: ExprId) -> Self {
        Self {
            offset,
            kind: StmtKind::Expression(expr),
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self.kind, StmtKind::Block { .. })
    }
}

#[derive(Debug)]
pub struct FunctionDeclaration {
    pub offset: u32,
    pub modifiers: Modifiers,
    pub name: Name,
    /// Parameters, in declaration order; each has `Storage::Parameter`.
    pub params: Vec<VarId>,
    pub return_type: TypeId,
    /// Number of call sites referencing this function. Written by the IR
    /// generator (possibly from concurrent compilations sharing built-in
    /// modules); the inliner only loads it.
    pub call_count: AtomicU32,
    /// The body block, once a definition has been seen.
    pub definition: Option<StmtId>,
}

#[derive(Debug)]
pub enum ProgramElement {
    /// A function definition; `body` mirrors the declaration's
    /// `definition` field.
    Function { function: FunctionId, body: StmtId },
    /// A group of global variable declarations.
    GlobalVars(StmtId),
}

/// A fully type-checked program: node arenas plus the symbol and function
/// storage every node index points into.
#[derive(Debug)]
pub struct Program {
    exprs: Vec<Expression>,
    stmts: Vec<Statement>,
    pub symbols: SymbolArena,
    pub functions: Vec<FunctionDeclaration>,
    pub elements: Vec<ProgramElement>,
    pub root_scope: ScopeId,
}

impl Program {
    pub fn new() -> Self {
        let mut symbols = SymbolArena::new();
        let root_scope = symbols.alloc_scope(None);
        Self {
            exprs: Vec::new(),
            stmts: Vec::new(),
            symbols,
            functions: Vec::new(),
            elements: Vec::new(),
            root_scope,
        }
    }

    pub fn alloc_expr(&mut self, expr: Expression) -> ExprId {
        let id = ExprId::new(self.exprs.len());
        self.exprs.push(expr);
        id
    }

    pub fn alloc_stmt(&mut self, stmt: Statement) -> StmtId {
        let id = StmtId::new(self.stmts.len());
        self.stmts.push(stmt);
        id
    }

    pub fn expr(&self, id: ExprId) -> &Expression {
        &self.exprs[id.index()]
    }

    pub fn expr_mut(&mut self, id: ExprId) -> &mut Expression {
        &mut self.exprs[id.index()]
    }

    pub fn stmt(&self, id: StmtId) -> &Statement {
        &self.stmts[id.index()]
    }

    pub fn stmt_mut(&mut self, id: StmtId) -> &mut Statement {
        &mut self.stmts[id.index()]
    }

    pub fn add_function(&mut self, decl: FunctionDeclaration) -> FunctionId {
        let id = FunctionId::new(self.functions.len());
        self.functions.push(decl);
        id
    }

    pub fn function(&self, id: FunctionId) -> &FunctionDeclaration {
        &self.functions[id.index()]
    }

    pub fn function_mut(&mut self, id: FunctionId) -> &mut FunctionDeclaration {
        &mut self.functions[id.index()]
    }

    /// Signature identity: same name and same parameter types. Distinct
    /// declaration instances of one signature (a prototype and its
    /// definition) match each other.
    pub fn decls_match(&self, a: FunctionId, b: FunctionId) -> bool {
        if a == b {
            return true;
        }
        let (fa, fb) = (self.function(a), self.function(b));
        fa.name == fb.name
            && fa.params.len() == fb.params.len()
            && fa
                .params
                .iter()
                .zip(&fb.params)
                .all(|(&pa, &pb)| self.symbols.var(pa).ty == self.symbols.var(pb).ty)
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::symbols::{Storage, Variable};

    fn int_param(program: &mut Program, name: &str) -> VarId {
        let scope = program.root_scope;
        program.symbols.declare_variable(
            scope,
            Variable {
                offset: 0,
                modifiers: Modifiers::default(),
                name: Name::new(name),
                ty: TypeId::new(2),
                storage: Storage::Parameter,
                initial_value: None,
            },
        )
    }

    fn decl(program: &mut Program, name: &str, params: Vec<VarId>) -> FunctionId {
        program.add_function(FunctionDeclaration {
            offset: 0,
            modifiers: Modifiers::default(),
            name: Name::new(name),
            params,
            return_type: TypeId::new(0),
            call_count: Default::default(),
            definition: None,
        })
    }

    #[test]
    fn distinct_instances_of_one_signature_match() {
        let mut program = Program::new();
        let x = int_param(&mut program, "x");
        let y = int_param(&mut program, "y");
        let prototype = decl(&mut program, "f", vec![x]);
        let definition = decl(&mut program, "f", vec![y]);

        assert!(program.decls_match(prototype, definition));
        assert!(program.decls_match(prototype, prototype));
    }

    #[test]
    fn different_names_or_arities_do_not_match() {
        let mut program = Program::new();
        let x = int_param(&mut program, "x");
        let y = int_param(&mut program, "y");
        let f = decl(&mut program, "f", vec![x]);
        let g = decl(&mut program, "g", vec![y]);
        let f2 = decl(&mut program, "f", vec![]);

        assert!(!program.decls_match(f, g));
        assert!(!program.decls_match(f, f2));
    }
}
