//! GLSL-like textual emission of IR nodes.
//!
//! Produces the single-line source form used by debug tracing and by
//! tests asserting on rewriter output. The emitter is where a block's
//! `is_scope` flag becomes observable: scope-carrying blocks emit braces,
//! scope-less blocks flatten into the surrounding statement list.

use crate::context::Context;
use crate::intern::{ExprId, FunctionId, StmtId};
use crate::ir::types::TypeKind;
use crate::ir::{ExprKind, Program, StmtKind};

pub fn expr_description(program: &Program, context: &Context, id: ExprId) -> String {
    let expr = program.expr(id);
    match &expr.kind {
        ExprKind::BoolLiteral(value) => value.to_string(),
        ExprKind::IntLiteral(value) => value.to_string(),
        ExprKind::FloatLiteral(value) => format!("{value:?}"),
        ExprKind::VariableRef { var, .. } => program.symbols.var(*var).name.as_str().to_owned(),
        ExprKind::FieldAccess { base, field_index } => {
            let base_ty = program.expr(*base).ty;
            let field = match &context.types.get(base_ty).kind {
                TypeKind::Struct { fields } => fields[*field_index].0.as_str().to_owned(),
                _ => format!("<{field_index}>"),
            };
            format!(
                "{}.{field}",
                expr_description(program, context, *base)
            )
        }
        ExprKind::Swizzle { base, components } => {
            let mut text = expr_description(program, context, *base);
            text.push('.');
            for &component in components {
                text.push(match component {
                    0 => 'x',
                    1 => 'y',
                    2 => 'z',
                    _ => 'w',
                });
            }
            text
        }
        ExprKind::Index { base, index } => format!(
            "{}[{}]",
            expr_description(program, context, *base),
            expr_description(program, context, *index)
        ),
        ExprKind::Prefix { op, operand } => format!(
            "{}{}",
            op.token(),
            expr_description(program, context, *operand)
        ),
        ExprKind::Postfix { operand, op } => format!(
            "{}{}",
            expr_description(program, context, *operand),
            op.token()
        ),
        ExprKind::Binary { left, op, right } => format!(
            "({} {} {})",
            expr_description(program, context, *left),
            op.token(),
            expr_description(program, context, *right)
        ),
        ExprKind::Ternary {
            test,
            if_true,
            if_false,
        } => format!(
            "({} ? {} : {})",
            expr_description(program, context, *test),
            expr_description(program, context, *if_true),
            expr_description(program, context, *if_false)
        ),
        ExprKind::Constructor { args } => format!(
            "{}({})",
            context.types.get(expr.ty).name,
            arg_list(program, context, args)
        ),
        ExprKind::Call { function, args } => format!(
            "{}({})",
            program.function(*function).name,
            arg_list(program, context, args)
        ),
        ExprKind::ExternalCall { name, args } => {
            format!("{}({})", name, arg_list(program, context, args))
        }
        ExprKind::FunctionRef(function) => program.function(*function).name.as_str().to_owned(),
        ExprKind::TypeRef(ty) => context.types.get(*ty).name.as_str().to_owned(),
        ExprKind::ExternalValueRef(name) | ExprKind::SettingRef(name) => {
            name.as_str().to_owned()
        }
    }
}

fn arg_list(program: &Program, context: &Context, args: &[ExprId]) -> String {
    args.iter()
        .map(|&arg| expr_description(program, context, arg))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn stmt_description(program: &Program, context: &Context, id: StmtId) -> String {
    match &program.stmt(id).kind {
        StmtKind::Block {
            stmts, is_scope, ..
        } => {
            let body = join_statements(program, context, stmts);
            if *is_scope {
                if body.is_empty() {
                    "{ }".to_owned()
                } else {
                    format!("{{ {body} }}")
                }
            } else {
                body
            }
        }
        StmtKind::Expression(expr) => {
            format!("{};", expr_description(program, context, *expr))
        }
        StmtKind::VarDeclaration { var, init } => {
            let var = program.symbols.var(*var);
            let ty = context.types.get(var.ty).name;
            match init {
                Some(init) => format!(
                    "{ty} {} = {};",
                    var.name,
                    expr_description(program, context, *init)
                ),
                None => format!("{ty} {};", var.name),
            }
        }
        StmtKind::DeclarationGroup { base_type, decls } => {
            let mut parts = Vec::new();
            for &decl in decls {
                if let StmtKind::VarDeclaration { var, init } = &program.stmt(decl).kind {
                    let var = program.symbols.var(*var);
                    parts.push(match init {
                        Some(init) => format!(
                            "{} = {}",
                            var.name,
                            expr_description(program, context, *init)
                        ),
                        None => var.name.as_str().to_owned(),
                    });
                }
            }
            format!("{} {};", context.types.get(*base_type).name, parts.join(", "))
        }
        StmtKind::If {
            test,
            if_true,
            if_false,
        } => {
            let mut text = format!(
                "if ({}) {}",
                expr_description(program, context, *test),
                stmt_description(program, context, *if_true)
            );
            if let Some(if_false) = if_false {
                text.push_str(&format!(
                    " else {}",
                    stmt_description(program, context, *if_false)
                ));
            }
            text
        }
        StmtKind::For {
            init,
            test,
            next,
            body,
            ..
        } => format!(
            "for ({} {}; {}) {}",
            init.map_or(";".to_owned(), |s| stmt_description(program, context, s)),
            test.map_or(String::new(), |e| expr_description(program, context, e)),
            next.map_or(String::new(), |e| expr_description(program, context, e)),
            stmt_description(program, context, *body)
        ),
        StmtKind::While { test, body } => format!(
            "while ({}) {}",
            expr_description(program, context, *test),
            stmt_description(program, context, *body)
        ),
        StmtKind::DoWhile { body, test } => format!(
            "do {} while ({});",
            stmt_description(program, context, *body),
            expr_description(program, context, *test)
        ),
        StmtKind::Switch { value, cases, .. } => {
            let mut text = format!("switch ({}) {{", expr_description(program, context, *value));
            for case in cases {
                match case.value {
                    Some(value) => text.push_str(&format!(
                        " case {}:",
                        expr_description(program, context, value)
                    )),
                    None => text.push_str(" default:"),
                }
                let body = join_statements(program, context, &case.stmts);
                if !body.is_empty() {
                    text.push(' ');
                    text.push_str(&body);
                }
            }
            text.push_str(" }");
            text
        }
        StmtKind::Return(expr) => match expr {
            Some(expr) => format!("return {};", expr_description(program, context, *expr)),
            None => "return;".to_owned(),
        },
        StmtKind::Break => "break;".to_owned(),
        StmtKind::Continue => "continue;".to_owned(),
        StmtKind::Discard => "discard;".to_owned(),
        StmtKind::InlineMarker(function) => {
            format!("/* inlined: {} */", program.function(*function).name)
        }
        StmtKind::Nop => ";".to_owned(),
    }
}

fn join_statements(program: &Program, context: &Context, stmts: &[StmtId]) -> String {
    stmts
        .iter()
        .map(|&stmt| stmt_description(program, context, stmt))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn function_description(program: &Program, context: &Context, id: FunctionId) -> String {
    let decl = program.function(id);
    let params = decl
        .params
        .iter()
        .map(|&param| {
            let var = program.symbols.var(param);
            let mut text = String::new();
            if var.modifiers.is_out {
                text.push_str("out ");
            }
            text.push_str(context.types.get(var.ty).name.as_str());
            text.push(' ');
            text.push_str(var.name.as_str());
            text
        })
        .collect::<Vec<_>>()
        .join(", ");
    let mut text = format!(
        "{} {}({})",
        context.types.get(decl.return_type).name,
        decl.name,
        params
    );
    match decl.definition {
        Some(body) => {
            text.push(' ');
            text.push_str(&stmt_description(program, context, body));
        }
        None => text.push(';'),
    }
    text
}

/// The whole program as one line per element.
pub fn program_description(program: &Program, context: &Context) -> String {
    program
        .elements
        .iter()
        .map(|element| match *element {
            crate::ir::ProgramElement::Function { function, .. } => {
                function_description(program, context, function)
            }
            crate::ir::ProgramElement::GlobalVars(decls) => {
                stmt_description(program, context, decls)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
