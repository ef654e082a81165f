//! Discovery of inlinable call sites.
//!
//! One preorder walk over every function body, carrying two stacks: the
//! symbol tables currently in scope, and the chain of statements that
//! could legally have a block of new statements spliced in front of them.
//! The walk records *slots* (arena indices), because the driver will
//! overwrite them later.

use crate::intern::{ExprId, ScopeId, StmtId};
use crate::ir::{ExprKind, Program, ProgramElement, StmtKind};

/// Everything the driver needs to rewrite one call site.
#[derive(Debug, Clone, Copy)]
pub struct InlineCandidate {
    /// Symbol table in scope at the call; new names are interred here.
    pub scope: ScopeId,
    /// Nearest enclosing statement that is not a scope-less block, above
    /// the enclosing statement itself. Used to decide whether the spliced
    /// block needs to become a scope.
    pub parent_stmt: Option<StmtId>,
    /// The statement slot the inlined block will replace.
    pub enclosing_stmt: StmtId,
    /// The function-call expression slot.
    pub call_expr: ExprId,
}

/// Walks `program` and returns all candidates in discovery (preorder)
/// order.
pub fn find_candidates(program: &Program) -> Vec<InlineCandidate> {
    let mut analyzer = CandidateAnalyzer {
        program,
        scope_stack: vec![program.root_scope],
        enclosing_stack: Vec::new(),
        candidates: Vec::new(),
    };
    for element in &program.elements {
        // Calls can only be rewritten inside a function's body; global
        // initializers have no statement list to splice into.
        if let ProgramElement::Function { body, .. } = *element {
            analyzer.visit_statement(body, true);
        }
    }
    analyzer.candidates
}

struct CandidateAnalyzer<'a> {
    program: &'a Program,
    scope_stack: Vec<ScopeId>,
    enclosing_stack: Vec<StmtId>,
    candidates: Vec<InlineCandidate>,
}

impl CandidateAnalyzer<'_> {
    /// `viable` is false for statements that do not live directly in a
    /// statement list (a for-loop initializer, one declaration of a
    /// group): the splicer could not replace those slots with a block.
    fn visit_statement(&mut self, id: StmtId, viable: bool) {
        let scope_depth = self.scope_stack.len();
        let enclosing_depth = self.enclosing_stack.len();
        if viable {
            self.enclosing_stack.push(id);
        }

        match &self.program.stmt(id).kind {
            StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Discard
            | StmtKind::InlineMarker(_)
            | StmtKind::Nop => {}

            StmtKind::Block { stmts, scope, .. } => {
                if let Some(scope) = scope {
                    self.scope_stack.push(*scope);
                }
                for &stmt in stmts {
                    self.visit_statement(stmt, true);
                }
            }
            StmtKind::Expression(expr) => self.visit_expression(*expr),
            StmtKind::VarDeclaration { init, .. } => {
                if let Some(init) = init {
                    self.visit_expression(*init);
                }
            }
            StmtKind::DeclarationGroup { decls, .. } => {
                for &decl in decls {
                    self.visit_statement(decl, false);
                }
            }
            StmtKind::If {
                test,
                if_true,
                if_false,
            } => {
                self.visit_expression(*test);
                self.visit_statement(*if_true, true);
                if let Some(if_false) = if_false {
                    self.visit_statement(*if_false, true);
                }
            }
            StmtKind::For {
                init,
                body,
                scope,
                ..
            } => {
                if let Some(scope) = scope {
                    self.scope_stack.push(*scope);
                }
                if let Some(init) = init {
                    self.visit_statement(*init, false);
                }
                // The test and increment expressions are skipped: a block
                // materialised for a call inside them would have nowhere
                // to go that executes on every iteration.
                self.visit_statement(*body, true);
            }
            StmtKind::While { body, .. } => {
                // As with `for`, the test expression is skipped.
                self.visit_statement(*body, true);
            }
            StmtKind::DoWhile { body, .. } => {
                self.visit_statement(*body, true);
            }
            StmtKind::Switch { value, cases, scope } => {
                if let Some(scope) = scope {
                    self.scope_stack.push(*scope);
                }
                self.visit_expression(*value);
                for case in cases {
                    // Case labels are constant expressions; nothing to
                    // find there.
                    for &stmt in &case.stmts {
                        self.visit_statement(stmt, true);
                    }
                }
            }
            StmtKind::Return(expr) => {
                if let Some(expr) = expr {
                    self.visit_expression(*expr);
                }
            }
        }

        self.scope_stack.truncate(scope_depth);
        self.enclosing_stack.truncate(enclosing_depth);
    }

    fn visit_expression(&mut self, id: ExprId) {
        match &self.program.expr(id).kind {
            ExprKind::BoolLiteral(_)
            | ExprKind::IntLiteral(_)
            | ExprKind::FloatLiteral(_)
            | ExprKind::VariableRef { .. }
            | ExprKind::FunctionRef(_)
            | ExprKind::TypeRef(_)
            | ExprKind::ExternalValueRef(_)
            | ExprKind::SettingRef(_) => {}

            ExprKind::FieldAccess { base, .. } | ExprKind::Swizzle { base, .. } => {
                self.visit_expression(*base);
            }
            ExprKind::Index { base, index } => {
                self.visit_expression(*base);
                self.visit_expression(*index);
            }
            ExprKind::Prefix { operand, .. } | ExprKind::Postfix { operand, .. } => {
                self.visit_expression(*operand);
            }
            ExprKind::Binary { left, op, right } => {
                self.visit_expression(*left);
                // The right side of `&&` / `||` only runs conditionally;
                // hoisting a call out of it would execute its side effects
                // unconditionally.
                if !op.is_short_circuit() {
                    self.visit_expression(*right);
                }
            }
            ExprKind::Ternary { test, .. } => {
                // Only one arm of a ternary is evaluated; neither can be
                // hoisted. The test always runs.
                self.visit_expression(*test);
            }
            ExprKind::Constructor { args } | ExprKind::ExternalCall { args, .. } => {
                for &arg in args {
                    self.visit_expression(arg);
                }
            }
            ExprKind::Call { args, .. } => {
                for &arg in args {
                    self.visit_expression(arg);
                }
                self.add_candidate(id);
            }
        }
    }

    fn add_candidate(&mut self, call_expr: ExprId) {
        let (Some(&scope), Some(&enclosing_stmt)) =
            (self.scope_stack.last(), self.enclosing_stack.last())
        else {
            debug_assert!(false, "call expression outside any statement");
            return;
        };
        self.candidates.push(InlineCandidate {
            scope,
            parent_stmt: find_parent_statement(self.program, &self.enclosing_stack),
            enclosing_stmt,
            call_expr,
        });
    }
}

/// Nearest enclosing statement, above the top of `stack`, that is not a
/// scope-less block.
fn find_parent_statement(program: &Program, stack: &[StmtId]) -> Option<StmtId> {
    stack
        .iter()
        .rev()
        .skip(1)
        .find(|&&stmt| match program.stmt(stmt).kind {
            StmtKind::Block { is_scope, .. } => is_scope,
            _ => true,
        })
        .copied()
}
