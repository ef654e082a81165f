//! Materialisation of a single inlined call.
//!
//! Produces the statements that perform the call's work ahead of the
//! enclosing statement, plus the expression that stands in for the call:
//!
//! 1. an inline marker naming the callee;
//! 2. scratch variables binding each argument, unless the argument can be
//!    aliased directly;
//! 3. a result variable (non-void callees);
//! 4. the callee body, cloned with parameters remapped, locals renamed,
//!    and returns rewritten into result assignments;
//! 5. a `do { .. } while (false)` wrapper when the body returns early, so
//!    the rewritten returns can `break` to the end;
//! 6. write-backs copying scratch values into `out` arguments.

use std::collections::HashMap;

use crate::analysis;
use crate::intern::{ExprId, ScopeId, StmtId, TypeId, VarId};
use crate::ir::symbols::{Modifiers, Storage, Variable};
use crate::ir::{
    ExprKind, Expression, Operator, Program, RefKind, Statement, StmtKind, SwitchCase,
};

use super::candidates::InlineCandidate;
use super::{eligibility, Inliner};

/// The materialised form of one call: a scope-less block of statements
/// that must run before the enclosing statement, and the expression that
/// replaces the call itself.
pub(crate) struct InlinedCall {
    pub(crate) inlined_body: Statement,
    pub(crate) replacement_expr: Expression,
}

impl Inliner<'_> {
    pub(crate) fn inline_call(
        &mut self,
        program: &mut Program,
        candidate: &InlineCandidate,
    ) -> InlinedCall {
        let call = program.expr(candidate.call_expr).clone();
        let ExprKind::Call { function, args } = call.kind else {
            unreachable!("materialising a non-call expression");
        };
        let offset = call.offset;
        let decl = program.function(function);
        let return_type = decl.return_type;
        let base_name = decl.name;
        let params = decl.params.clone();
        let Some(body) = decl.definition else {
            unreachable!("materialising a call with no definition");
        };
        let has_early_return = eligibility::has_early_return(program, function);
        let scope = candidate.scope;

        let mut prelude: Vec<StmtId> = Vec::new();
        prelude.push(program.alloc_stmt(Statement {
            offset,
            kind: StmtKind::InlineMarker(function),
        }));

        // Bind each argument to its parameter.
        let mut var_map: HashMap<VarId, VarId> = HashMap::new();
        for (i, &param) in params.iter().enumerate() {
            let arg = args[i];

            // Alias shortcut: a bare variable argument can stand in for a
            // parameter the callee never writes. Writes through an `out`
            // parameter then land on the argument directly, so no
            // write-back is needed either.
            if let Some(arg_var) = program.expr(arg).as_variable_ref() {
                if !analysis::statement_writes_to(program, body, param) {
                    var_map.insert(param, arg_var);
                    continue;
                }
            }

            let param_var = program.symbols.var(param);
            let param_is_out = param_var.modifiers.is_out;
            let param_name = param_var.name;
            let arg_ty = program.expr(arg).ty;
            // The write-back needs the original argument expression; an
            // out parameter's scratch variable is initialised from a clone
            // so the original survives.
            let init = if param_is_out {
                clone_expression(program, arg)
            } else {
                arg
            };
            let scratch = self.make_scratch_var(
                program,
                scope,
                param_name.as_str(),
                arg_ty,
                Some(init),
                offset,
                &mut prelude,
            );
            var_map.insert(param, scratch);
        }

        let result_var = if return_type != self.context.types.void() {
            Some(self.make_scratch_var(
                program,
                scope,
                base_name.as_str(),
                return_type,
                None,
                offset,
                &mut prelude,
            ))
        } else {
            None
        };

        // Clone the body with parameters remapped and locals renamed.
        let StmtKind::Block {
            stmts: body_stmts, ..
        } = program.stmt(body).kind.clone()
        else {
            unreachable!("function body is always a block");
        };
        let mut cloned = Vec::with_capacity(body_stmts.len());
        for stmt in body_stmts {
            cloned.push(self.inline_statement(
                program,
                offset,
                &mut var_map,
                scope,
                result_var,
                has_early_return,
                stmt,
            ));
        }
        let inline_block = Statement {
            offset,
            kind: StmtKind::Block {
                stmts: cloned,
                scope: None,
                is_scope: true,
            },
        };
        if has_early_return {
            // There is no goto to jump past the rest of the body, so fake
            // one: run the body in a loop that executes once and let the
            // rewritten returns break out of it.
            let test = program.alloc_expr(Expression::bool_literal(
                offset,
                self.context.types.boolean(),
                false,
            ));
            let block = program.alloc_stmt(inline_block);
            prelude.push(program.alloc_stmt(Statement {
                offset,
                kind: StmtKind::DoWhile { body: block, test },
            }));
        } else {
            prelude.push(program.alloc_stmt(inline_block));
        }

        // Copy scratch values back into `out` arguments, in parameter
        // order.
        for (i, &param) in params.iter().enumerate() {
            if !program.symbols.var(param).modifiers.is_out {
                continue;
            }
            let Some(&mapped) = var_map.get(&param) else {
                debug_assert!(false, "out parameter missing from the rewrite map");
                continue;
            };
            if program.expr(args[i]).as_variable_ref() == Some(mapped) {
                // The aliasing shortcut bound the argument itself; the
                // body already wrote through it.
                continue;
            }
            let target = clone_expression(program, args[i]);
            let mapped_ty = program.symbols.var(mapped).ty;
            let value =
                program.alloc_expr(Expression::variable_ref(offset, mapped_ty, mapped, RefKind::Read));
            let arg_ty = program.expr(args[i]).ty;
            let assign = program.alloc_expr(Expression {
                offset,
                ty: arg_ty,
                kind: ExprKind::Binary {
                    left: target,
                    op: Operator::Assign,
                    right: value,
                },
            });
            prelude.push(program.alloc_stmt(Statement::expression(offset, assign)));
        }

        let replacement_expr = match result_var {
            Some(var) => Expression::variable_ref(offset, return_type, var, RefKind::Read),
            // A void call yields nothing; the stand-in literal exists only
            // to fill the expression slot and is never evaluated for its
            // value.
            None => Expression::bool_literal(offset, self.context.types.boolean(), false),
        };

        InlinedCall {
            inlined_body: Statement {
                offset,
                kind: StmtKind::Block {
                    stmts: prelude,
                    scope: None,
                    is_scope: false,
                },
            },
            replacement_expr,
        }
    }

    /// Declares a fresh local in `scope` and appends its declaration
    /// statement to `out`.
    fn make_scratch_var(
        &mut self,
        program: &mut Program,
        scope: ScopeId,
        base_name: &str,
        ty: TypeId,
        init: Option<ExprId>,
        offset: u32,
        out: &mut Vec<StmtId>,
    ) -> VarId {
        // The literal placeholders are not real types; one reaching a
        // scratch variable means a coercion was missed during type
        // checking.
        debug_assert!(
            !self.context.types.is_literal_placeholder(ty),
            "found a literal placeholder type while inlining"
        );
        let ty = self.context.types.concrete(ty);
        let name = self.unique_name_for_inline_var(program, scope, base_name);
        let var = program.symbols.declare_variable(
            scope,
            Variable {
                offset,
                modifiers: Modifiers::default(),
                name,
                ty,
                storage: Storage::Local,
                initial_value: init,
            },
        );
        out.push(program.alloc_stmt(Statement {
            offset,
            kind: StmtKind::VarDeclaration { var, init },
        }));
        var
    }

    /// Clones one statement of the callee body. Declarations are renamed
    /// into `scope` (extending `var_map` as they go) and returns become
    /// result assignments, breaks, or nops depending on the callee shape.
    #[allow(clippy::too_many_arguments)]
    fn inline_statement(
        &mut self,
        program: &mut Program,
        offset: u32,
        var_map: &mut HashMap<VarId, VarId>,
        scope: ScopeId,
        result_var: Option<VarId>,
        has_early_return: bool,
        id: StmtId,
    ) -> StmtId {
        let kind = program.stmt(id).kind.clone();
        let new_kind = match kind {
            StmtKind::Block {
                stmts,
                scope: block_scope,
                is_scope,
            } => StmtKind::Block {
                stmts: stmts
                    .into_iter()
                    .map(|stmt| {
                        self.inline_statement(
                            program,
                            offset,
                            var_map,
                            scope,
                            result_var,
                            has_early_return,
                            stmt,
                        )
                    })
                    .collect(),
                scope: block_scope,
                is_scope,
            },

            kind @ (StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Discard
            | StmtKind::InlineMarker(_)
            | StmtKind::Nop) => kind,

            StmtKind::DoWhile { body, test } => StmtKind::DoWhile {
                body: self.inline_statement(
                    program,
                    offset,
                    var_map,
                    scope,
                    result_var,
                    has_early_return,
                    body,
                ),
                test: inline_expression(program, offset, var_map, test),
            },
            StmtKind::Expression(expr) => {
                StmtKind::Expression(inline_expression(program, offset, var_map, expr))
            }
            StmtKind::For {
                init,
                test,
                next,
                body,
                scope: for_scope,
            } => {
                // The initializer is cloned first so its declarations are
                // already remapped when the test and increment are
                // rewritten.
                let init = init.map(|stmt| {
                    self.inline_statement(
                        program,
                        offset,
                        var_map,
                        scope,
                        result_var,
                        has_early_return,
                        stmt,
                    )
                });
                let test = test.map(|expr| inline_expression(program, offset, var_map, expr));
                let next = next.map(|expr| inline_expression(program, offset, var_map, expr));
                let body = self.inline_statement(
                    program,
                    offset,
                    var_map,
                    scope,
                    result_var,
                    has_early_return,
                    body,
                );
                StmtKind::For {
                    init,
                    test,
                    next,
                    body,
                    scope: for_scope,
                }
            }
            StmtKind::If {
                test,
                if_true,
                if_false,
            } => StmtKind::If {
                test: inline_expression(program, offset, var_map, test),
                if_true: self.inline_statement(
                    program,
                    offset,
                    var_map,
                    scope,
                    result_var,
                    has_early_return,
                    if_true,
                ),
                if_false: if_false.map(|stmt| {
                    self.inline_statement(
                        program,
                        offset,
                        var_map,
                        scope,
                        result_var,
                        has_early_return,
                        stmt,
                    )
                }),
            },
            StmtKind::Return(expr) => {
                let expr = expr.map(|e| inline_expression(program, offset, var_map, e));
                match (expr, result_var) {
                    (Some(expr), Some(result)) => {
                        let result_ty = program.symbols.var(result).ty;
                        let target = program.alloc_expr(Expression::variable_ref(
                            offset,
                            result_ty,
                            result,
                            RefKind::Write,
                        ));
                        let assign = program.alloc_expr(Expression {
                            offset,
                            ty: result_ty,
                            kind: ExprKind::Binary {
                                left: target,
                                op: Operator::Assign,
                                right: expr,
                            },
                        });
                        if has_early_return {
                            let assign_stmt =
                                program.alloc_stmt(Statement::expression(offset, assign));
                            let break_stmt = program.alloc_stmt(Statement {
                                offset,
                                kind: StmtKind::Break,
                            });
                            StmtKind::Block {
                                stmts: vec![assign_stmt, break_stmt],
                                scope: None,
                                is_scope: true,
                            }
                        } else {
                            StmtKind::Expression(assign)
                        }
                    }
                    (Some(expr), None) => {
                        // A value-carrying return in a void function is a
                        // type-checker bug; keep the side effects and drop
                        // the value.
                        debug_assert!(false, "non-void return while inlining a void function");
                        StmtKind::Expression(expr)
                    }
                    (None, _) => {
                        if has_early_return {
                            StmtKind::Break
                        } else {
                            StmtKind::Nop
                        }
                    }
                }
            }
            StmtKind::Switch {
                value,
                cases,
                scope: switch_scope,
            } => StmtKind::Switch {
                value: inline_expression(program, offset, var_map, value),
                cases: cases
                    .into_iter()
                    .map(|case| SwitchCase {
                        value: case
                            .value
                            .map(|expr| inline_expression(program, offset, var_map, expr)),
                        stmts: case
                            .stmts
                            .into_iter()
                            .map(|stmt| {
                                self.inline_statement(
                                    program,
                                    offset,
                                    var_map,
                                    scope,
                                    result_var,
                                    has_early_return,
                                    stmt,
                                )
                            })
                            .collect(),
                    })
                    .collect(),
                scope: switch_scope,
            },
            StmtKind::VarDeclaration { var, init } => {
                let init = init.map(|expr| inline_expression(program, offset, var_map, expr));
                let old = program.symbols.var(var).clone();
                // Renaming sidesteps collisions between the callee's
                // locals and anything visible at the call site; scopes
                // hide most such collisions, but not all of them once the
                // body has been spliced inline.
                let name = self.unique_name_for_inline_var(program, scope, old.name.as_str());
                let renamed = program.symbols.declare_variable(
                    scope,
                    Variable {
                        offset,
                        modifiers: old.modifiers,
                        name,
                        ty: self.context.types.concrete(old.ty),
                        storage: old.storage,
                        initial_value: init,
                    },
                );
                var_map.insert(var, renamed);
                StmtKind::VarDeclaration { var: renamed, init }
            }
            StmtKind::DeclarationGroup { base_type, decls } => StmtKind::DeclarationGroup {
                base_type: self.context.types.concrete(base_type),
                decls: decls
                    .into_iter()
                    .map(|decl| {
                        self.inline_statement(
                            program,
                            offset,
                            var_map,
                            scope,
                            result_var,
                            has_early_return,
                            decl,
                        )
                    })
                    .collect(),
            },
            StmtKind::While { test, body } => StmtKind::While {
                test: inline_expression(program, offset, var_map, test),
                body: self.inline_statement(
                    program,
                    offset,
                    var_map,
                    scope,
                    result_var,
                    has_early_return,
                    body,
                ),
            },
        };
        program.alloc_stmt(Statement {
            offset,
            kind: new_kind,
        })
    }
}

/// Clones an expression subtree, replacing references to mapped variables
/// and stamping every node with the call site's offset.
fn inline_expression(
    program: &mut Program,
    offset: u32,
    var_map: &HashMap<VarId, VarId>,
    id: ExprId,
) -> ExprId {
    let expr = program.expr(id).clone();
    let kind = match expr.kind {
        kind @ (ExprKind::BoolLiteral(_)
        | ExprKind::IntLiteral(_)
        | ExprKind::FloatLiteral(_)
        | ExprKind::FunctionRef(_)
        | ExprKind::TypeRef(_)
        | ExprKind::ExternalValueRef(_)
        | ExprKind::SettingRef(_)) => kind,

        ExprKind::VariableRef { var, ref_kind } => ExprKind::VariableRef {
            var: var_map.get(&var).copied().unwrap_or(var),
            ref_kind,
        },
        ExprKind::FieldAccess { base, field_index } => ExprKind::FieldAccess {
            base: inline_expression(program, offset, var_map, base),
            field_index,
        },
        ExprKind::Swizzle { base, components } => ExprKind::Swizzle {
            base: inline_expression(program, offset, var_map, base),
            components,
        },
        ExprKind::Index { base, index } => ExprKind::Index {
            base: inline_expression(program, offset, var_map, base),
            index: inline_expression(program, offset, var_map, index),
        },
        ExprKind::Prefix { op, operand } => ExprKind::Prefix {
            op,
            operand: inline_expression(program, offset, var_map, operand),
        },
        ExprKind::Postfix { operand, op } => ExprKind::Postfix {
            operand: inline_expression(program, offset, var_map, operand),
            op,
        },
        ExprKind::Binary { left, op, right } => ExprKind::Binary {
            left: inline_expression(program, offset, var_map, left),
            op,
            right: inline_expression(program, offset, var_map, right),
        },
        ExprKind::Ternary {
            test,
            if_true,
            if_false,
        } => ExprKind::Ternary {
            test: inline_expression(program, offset, var_map, test),
            if_true: inline_expression(program, offset, var_map, if_true),
            if_false: inline_expression(program, offset, var_map, if_false),
        },
        ExprKind::Constructor { args } => ExprKind::Constructor {
            args: args
                .into_iter()
                .map(|arg| inline_expression(program, offset, var_map, arg))
                .collect(),
        },
        ExprKind::Call { function, args } => ExprKind::Call {
            function,
            args: args
                .into_iter()
                .map(|arg| inline_expression(program, offset, var_map, arg))
                .collect(),
        },
        ExprKind::ExternalCall { name, args } => ExprKind::ExternalCall {
            name,
            args: args
                .into_iter()
                .map(|arg| inline_expression(program, offset, var_map, arg))
                .collect(),
        },
    };
    program.alloc_expr(Expression {
        offset,
        ty: expr.ty,
        kind,
    })
}

/// Structural deep clone of an expression subtree, offsets preserved.
fn clone_expression(program: &mut Program, id: ExprId) -> ExprId {
    let expr = program.expr(id).clone();
    let kind = match expr.kind {
        kind @ (ExprKind::BoolLiteral(_)
        | ExprKind::IntLiteral(_)
        | ExprKind::FloatLiteral(_)
        | ExprKind::VariableRef { .. }
        | ExprKind::FunctionRef(_)
        | ExprKind::TypeRef(_)
        | ExprKind::ExternalValueRef(_)
        | ExprKind::SettingRef(_)) => kind,

        ExprKind::FieldAccess { base, field_index } => ExprKind::FieldAccess {
            base: clone_expression(program, base),
            field_index,
        },
        ExprKind::Swizzle { base, components } => ExprKind::Swizzle {
            base: clone_expression(program, base),
            components,
        },
        ExprKind::Index { base, index } => ExprKind::Index {
            base: clone_expression(program, base),
            index: clone_expression(program, index),
        },
        ExprKind::Prefix { op, operand } => ExprKind::Prefix {
            op,
            operand: clone_expression(program, operand),
        },
        ExprKind::Postfix { operand, op } => ExprKind::Postfix {
            operand: clone_expression(program, operand),
            op,
        },
        ExprKind::Binary { left, op, right } => ExprKind::Binary {
            left: clone_expression(program, left),
            op,
            right: clone_expression(program, right),
        },
        ExprKind::Ternary {
            test,
            if_true,
            if_false,
        } => ExprKind::Ternary {
            test: clone_expression(program, test),
            if_true: clone_expression(program, if_true),
            if_false: clone_expression(program, if_false),
        },
        ExprKind::Constructor { args } => ExprKind::Constructor {
            args: args
                .into_iter()
                .map(|arg| clone_expression(program, arg))
                .collect(),
        },
        ExprKind::Call { function, args } => ExprKind::Call {
            function,
            args: args
                .into_iter()
                .map(|arg| clone_expression(program, arg))
                .collect(),
        },
        ExprKind::ExternalCall { name, args } => ExprKind::ExternalCall {
            name,
            args: args
                .into_iter()
                .map(|arg| clone_expression(program, arg))
                .collect(),
        },
    };
    program.alloc_expr(Expression {
        offset: expr.offset,
        ty: expr.ty,
        kind,
    })
}
