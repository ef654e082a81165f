#![cfg(feature = "proptest")]

//! Property tests for the inliner's convergence and freshness guarantees.

use glint::analysis::update_call_counts;
use glint::display::{function_description, program_description};
use glint::intern::{ExprId, FunctionId, Name, ScopeId, TypeId, VarId};
use glint::ir::symbols::{Modifiers, Storage, Variable};
use glint::ir::{
    ExprKind, Expression, FunctionDeclaration, Operator, Program, ProgramElement, RefKind,
    Statement, StmtKind,
};
use glint::{Context, Inliner, Settings};
use proptest::prelude::*;

fn int_lit(program: &mut Program, context: &Context, value: i64) -> ExprId {
    program.alloc_expr(Expression {
        offset: 0,
        ty: context.types.int(),
        kind: ExprKind::IntLiteral(value),
    })
}

fn define_add_one(program: &mut Program, context: &Context) -> FunctionId {
    let int = context.types.int();
    let root = program.root_scope;
    let scope = program.symbols.alloc_scope(Some(root));
    let x = program.symbols.declare_variable(
        scope,
        Variable {
            offset: 0,
            modifiers: Modifiers::default(),
            name: Name::new("x"),
            ty: int,
            storage: Storage::Parameter,
            initial_value: None,
        },
    );
    let x_ref = program.alloc_expr(Expression::variable_ref(0, int, x, RefKind::Read));
    let one = int_lit(program, context, 1);
    let sum = program.alloc_expr(Expression {
        offset: 0,
        ty: int,
        kind: ExprKind::Binary {
            left: x_ref,
            op: Operator::Plus,
            right: one,
        },
    });
    let ret = program.alloc_stmt(Statement {
        offset: 0,
        kind: StmtKind::Return(Some(sum)),
    });
    let body = program.alloc_stmt(Statement {
        offset: 0,
        kind: StmtKind::Block {
            stmts: vec![ret],
            scope: Some(scope),
            is_scope: true,
        },
    });
    let function = program.add_function(FunctionDeclaration {
        offset: 0,
        modifiers: Modifiers::default(),
        name: Name::new("f"),
        params: vec![x],
        return_type: int,
        call_count: Default::default(),
        definition: Some(body),
    });
    program.elements.push(ProgramElement::Function { function, body });
    function
}

fn declare_var(
    program: &mut Program,
    scope: ScopeId,
    name: &str,
    ty: TypeId,
    init: Option<ExprId>,
) -> VarId {
    program.symbols.declare_variable(
        scope,
        Variable {
            offset: 0,
            modifiers: Modifiers::default(),
            name: Name::new(name),
            ty,
            storage: Storage::Local,
            initial_value: init,
        },
    )
}

/// `void main() { int acc = (..((f(v0) + f(v1)) + f(v2)) ..); }` -- every
/// call shares the accumulator's declaration as its enclosing statement.
fn build_sibling_chain(values: &[i64]) -> (Context, Program, FunctionId) {
    let context = Context::new();
    let mut program = Program::new();
    let int = context.types.int();
    let f = define_add_one(&mut program, &context);

    let root = program.root_scope;
    let main_scope = program.symbols.alloc_scope(Some(root));
    let mut chain: Option<ExprId> = None;
    for &value in values {
        let arg = int_lit(&mut program, &context, value);
        let call = program.alloc_expr(Expression {
            offset: 0,
            ty: int,
            kind: ExprKind::Call {
                function: f,
                args: vec![arg],
            },
        });
        chain = Some(match chain {
            None => call,
            Some(left) => program.alloc_expr(Expression {
                offset: 0,
                ty: int,
                kind: ExprKind::Binary {
                    left,
                    op: Operator::Plus,
                    right: call,
                },
            }),
        });
    }
    let acc = declare_var(&mut program, main_scope, "acc", int, chain);
    let acc_decl = program.alloc_stmt(Statement {
        offset: 0,
        kind: StmtKind::VarDeclaration {
            var: acc,
            init: chain,
        },
    });
    let body = program.alloc_stmt(Statement {
        offset: 0,
        kind: StmtKind::Block {
            stmts: vec![acc_decl],
            scope: Some(main_scope),
            is_scope: true,
        },
    });
    let main = program.add_function(FunctionDeclaration {
        offset: 0,
        modifiers: Modifiers::default(),
        name: Name::new("main"),
        params: vec![],
        return_type: context.types.void(),
        call_count: Default::default(),
        definition: Some(body),
    });
    program.elements.push(ProgramElement::Function {
        function: main,
        body,
    });
    (context, program, main)
}

proptest! {
    /// Calls sharing one enclosing statement are rewritten one per pass,
    /// and the whole chain always converges with no call left behind.
    #[test]
    fn sibling_call_chains_converge(values in prop::collection::vec(-100i64..100, 1..6)) {
        let (context, mut program, main) = build_sibling_chain(&values);
        update_call_counts(&mut program);

        let settings = Settings::default();
        let mut inliner = Inliner::new(&context, &settings);
        let mut passes = 0;
        while inliner.analyze(&mut program) {
            passes += 1;
            prop_assert!(passes <= values.len(), "pass budget exceeded");
        }
        prop_assert_eq!(passes, values.len());

        let text = function_description(&program, &context, main);
        prop_assert!(!text.contains("f("), "call survived inlining: {}", text);
    }

    /// Once `analyze` reports no change, the program text is stable: a
    /// false return means structurally untouched.
    #[test]
    fn a_no_change_pass_leaves_the_program_intact(values in prop::collection::vec(-100i64..100, 1..4)) {
        let (context, mut program, _main) = build_sibling_chain(&values);
        update_call_counts(&mut program);

        let settings = Settings::default();
        let mut inliner = Inliner::new(&context, &settings);
        while inliner.analyze(&mut program) {}

        let settled = program_description(&program, &context);
        prop_assert!(!inliner.analyze(&mut program));
        prop_assert_eq!(settled, program_description(&program, &context));
    }

    /// Every scratch variable minted across all passes is distinct: the
    /// number of declarations grows by exactly two per inlined call (one
    /// argument binding, one result), which could not hold if a name were
    /// ever reused within the same symbol table.
    #[test]
    fn scratch_names_stay_distinct_across_passes(values in prop::collection::vec(-100i64..100, 1..6)) {
        let (context, mut program, main) = build_sibling_chain(&values);
        update_call_counts(&mut program);

        let settings = Settings::default();
        let mut inliner = Inliner::new(&context, &settings);
        while inliner.analyze(&mut program) {}

        let text = function_description(&program, &context, main);
        let scratch_decls = text.matches("int _").count();
        prop_assert_eq!(scratch_decls, values.len() * 2, "{}", text);
    }
}
