//! Read-only traversal over the IR arenas.
//!
//! A visitor overrides `visit_statement` / `visit_expression` and calls
//! back into [`walk_statement`] / [`walk_expression`] when it wants the
//! default descent; returning `true` aborts the walk. The default method
//! bodies descend into every child, so a pass only overrides the node
//! kinds it cares about.

use crate::intern::{ExprId, StmtId};
use crate::ir::{ExprKind, Program, StmtKind};

pub trait Visitor: Sized {
    /// Return `true` to stop the walk.
    fn visit_statement(&mut self, program: &Program, id: StmtId) -> bool {
        walk_statement(self, program, id)
    }

    /// Return `true` to stop the walk.
    fn visit_expression(&mut self, program: &Program, id: ExprId) -> bool {
        walk_expression(self, program, id)
    }
}

/// Descends into every child of `id`. Returns `true` as soon as any
/// callback does.
pub fn walk_statement<V: Visitor>(v: &mut V, program: &Program, id: StmtId) -> bool {
    match &program.stmt(id).kind {
        StmtKind::Block { stmts, .. } => stmts.iter().any(|&s| v.visit_statement(program, s)),
        StmtKind::Expression(expr) => v.visit_expression(program, *expr),
        StmtKind::VarDeclaration { init, .. } => {
            init.is_some_and(|e| v.visit_expression(program, e))
        }
        StmtKind::DeclarationGroup { decls, .. } => {
            decls.iter().any(|&d| v.visit_statement(program, d))
        }
        StmtKind::If {
            test,
            if_true,
            if_false,
        } => {
            v.visit_expression(program, *test)
                || v.visit_statement(program, *if_true)
                || if_false.is_some_and(|s| v.visit_statement(program, s))
        }
        StmtKind::For {
            init,
            test,
            next,
            body,
            ..
        } => {
            init.is_some_and(|s| v.visit_statement(program, s))
                || test.is_some_and(|e| v.visit_expression(program, e))
                || next.is_some_and(|e| v.visit_expression(program, e))
                || v.visit_statement(program, *body)
        }
        StmtKind::While { test, body } => {
            v.visit_expression(program, *test) || v.visit_statement(program, *body)
        }
        StmtKind::DoWhile { body, test } => {
            v.visit_statement(program, *body) || v.visit_expression(program, *test)
        }
        StmtKind::Switch { value, cases, .. } => {
            v.visit_expression(program, *value)
                || cases.iter().any(|case| {
                    case.value.is_some_and(|e| v.visit_expression(program, e))
                        || case.stmts.iter().any(|&s| v.visit_statement(program, s))
                })
        }
        StmtKind::Return(expr) => expr.is_some_and(|e| v.visit_expression(program, e)),
        StmtKind::Break
        | StmtKind::Continue
        | StmtKind::Discard
        | StmtKind::InlineMarker(_)
        | StmtKind::Nop => false,
    }
}

/// Descends into every child of `id`. Returns `true` as soon as any
/// callback does.
pub fn walk_expression<V: Visitor>(v: &mut V, program: &Program, id: ExprId) -> bool {
    match &program.expr(id).kind {
        ExprKind::BoolLiteral(_)
        | ExprKind::IntLiteral(_)
        | ExprKind::FloatLiteral(_)
        | ExprKind::VariableRef { .. }
        | ExprKind::FunctionRef(_)
        | ExprKind::TypeRef(_)
        | ExprKind::ExternalValueRef(_)
        | ExprKind::SettingRef(_) => false,
        ExprKind::FieldAccess { base, .. } | ExprKind::Swizzle { base, .. } => {
            v.visit_expression(program, *base)
        }
        ExprKind::Index { base, index } => {
            v.visit_expression(program, *base) || v.visit_expression(program, *index)
        }
        ExprKind::Prefix { operand, .. } | ExprKind::Postfix { operand, .. } => {
            v.visit_expression(program, *operand)
        }
        ExprKind::Binary { left, right, .. } => {
            v.visit_expression(program, *left) || v.visit_expression(program, *right)
        }
        ExprKind::Ternary {
            test,
            if_true,
            if_false,
        } => {
            v.visit_expression(program, *test)
                || v.visit_expression(program, *if_true)
                || v.visit_expression(program, *if_false)
        }
        ExprKind::Constructor { args }
        | ExprKind::Call { args, .. }
        | ExprKind::ExternalCall { args, .. } => {
            args.iter().any(|&a| v.visit_expression(program, a))
        }
    }
}
