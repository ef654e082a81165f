//! Pure predicates over a function definition that decide whether its
//! body can be spliced into a caller.
//!
//! The interesting classification is *where* a function returns from. A
//! return at the textual end of control flow can be rewritten as a plain
//! assignment; any other return needs the do-while/break emulation; a
//! return inside a breakable construct cannot be emulated at all, because
//! its `break` would bind to the wrong construct.

use crate::intern::{ExprId, FunctionId, StmtId};
use crate::ir::visit::{walk_expression, walk_statement, Visitor};
use crate::ir::{ExprKind, Program, StmtKind};

struct ReturnCounter {
    count: usize,
}

impl Visitor for ReturnCounter {
    fn visit_statement(&mut self, program: &Program, id: StmtId) -> bool {
        if matches!(program.stmt(id).kind, StmtKind::Return(_)) {
            self.count += 1;
        }
        walk_statement(self, program, id)
    }
}

/// Total number of return statements anywhere in `function`'s body.
pub fn count_all_returns(program: &Program, function: FunctionId) -> usize {
    let Some(body) = program.function(function).definition else {
        return 0;
    };
    let mut counter = ReturnCounter { count: 0 };
    counter.visit_statement(program, body);
    counter.count
}

fn tail_returns(program: &Program, id: StmtId) -> usize {
    match &program.stmt(id).kind {
        StmtKind::Return(_) => 1,
        // Only the last statement of a block can be at the end of control
        // flow.
        StmtKind::Block { stmts, .. } => stmts
            .last()
            .map_or(0, |&last| tail_returns(program, last)),
        // Loops, switches, and everything else are opaque to this
        // classification; their returns are counted as early.
        _ => 0,
    }
}

/// Number of returns reachable only at the textual end of the function.
pub fn count_tail_returns(program: &Program, function: FunctionId) -> usize {
    let Some(body) = program.function(function).definition else {
        return 0;
    };
    tail_returns(program, body)
}

struct BreakableReturnCounter {
    count: usize,
    breakable_depth: usize,
}

impl Visitor for BreakableReturnCounter {
    fn visit_statement(&mut self, program: &Program, id: StmtId) -> bool {
        match program.stmt(id).kind {
            StmtKind::Switch { .. }
            | StmtKind::For { .. }
            | StmtKind::While { .. }
            | StmtKind::DoWhile { .. } => {
                self.breakable_depth += 1;
                let stop = walk_statement(self, program, id);
                self.breakable_depth -= 1;
                stop
            }
            StmtKind::Return(_) => {
                if self.breakable_depth > 0 {
                    self.count += 1;
                }
                walk_statement(self, program, id)
            }
            _ => walk_statement(self, program, id),
        }
    }
}

/// Number of returns sitting inside a `switch`, `for`, `while` or
/// `do-while`.
pub fn count_returns_in_breakable(program: &Program, function: FunctionId) -> usize {
    let Some(body) = program.function(function).definition else {
        return 0;
    };
    let mut counter = BreakableReturnCounter {
        count: 0,
        breakable_depth: 0,
    };
    counter.visit_statement(program, body);
    counter.count
}

/// Whether `function` contains a return that is not at the textual end of
/// its control flow.
pub fn has_early_return(program: &Program, function: FunctionId) -> bool {
    let all = count_all_returns(program, function);
    if all == 0 {
        return false;
    }
    all > count_tail_returns(program, function)
}

struct RecursiveCallFinder {
    target: FunctionId,
}

impl Visitor for RecursiveCallFinder {
    fn visit_statement(&mut self, program: &Program, id: StmtId) -> bool {
        // An inline marker means the named function's body has already
        // been spliced here; treat it like a call so partially inlined
        // recursion is still detected.
        if let StmtKind::InlineMarker(function) = program.stmt(id).kind {
            if program.decls_match(function, self.target) {
                return true;
            }
        }
        walk_statement(self, program, id)
    }

    fn visit_expression(&mut self, program: &Program, id: ExprId) -> bool {
        if let ExprKind::Call { function, .. } = program.expr(id).kind {
            if program.decls_match(function, self.target) {
                return true;
            }
        }
        walk_expression(self, program, id)
    }
}

/// Whether `function`'s body calls a function with a matching signature,
/// directly or through an inline marker.
pub fn contains_recursive_call(program: &Program, function: FunctionId) -> bool {
    let Some(body) = program.function(function).definition else {
        return false;
    };
    let mut finder = RecursiveCallFinder { target: function };
    finder.visit_statement(program, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::{Name, TypeId};
    use crate::ir::symbols::Modifiers;
    use crate::ir::{Expression, FunctionDeclaration, Statement};

    fn int_ty() -> TypeId {
        TypeId::new(2)
    }

    fn ret(program: &mut Program, expr: Option<ExprId>) -> StmtId {
        program.alloc_stmt(Statement {
            offset: 0,
            kind: StmtKind::Return(expr),
        })
    }

    fn int_lit(program: &mut Program, value: i64) -> ExprId {
        program.alloc_expr(Expression {
            offset: 0,
            ty: int_ty(),
            kind: ExprKind::IntLiteral(value),
        })
    }

    fn block(program: &mut Program, stmts: Vec<StmtId>) -> StmtId {
        program.alloc_stmt(Statement {
            offset: 0,
            kind: StmtKind::Block {
                stmts,
                scope: None,
                is_scope: true,
            },
        })
    }

    fn function(program: &mut Program, name: &str, body: StmtId) -> FunctionId {
        program.add_function(FunctionDeclaration {
            offset: 0,
            modifiers: Modifiers::default(),
            name: Name::new(name),
            params: Vec::new(),
            return_type: int_ty(),
            call_count: Default::default(),
            definition: Some(body),
        })
    }

    #[test]
    fn single_trailing_return_is_a_tail_return() {
        let mut program = Program::new();
        let value = int_lit(&mut program, 1);
        let ret = ret(&mut program, Some(value));
        let body = block(&mut program, vec![ret]);
        let f = function(&mut program, "f", body);

        assert_eq!(count_all_returns(&program, f), 1);
        assert_eq!(count_tail_returns(&program, f), 1);
        assert!(!has_early_return(&program, f));
    }

    #[test]
    fn return_before_end_is_early() {
        let mut program = Program::new();
        let value = int_lit(&mut program, 1);
        let early = ret(&mut program, Some(value));
        let value = int_lit(&mut program, 2);
        let tail = ret(&mut program, Some(value));
        let body = block(&mut program, vec![early, tail]);
        let f = function(&mut program, "f", body);

        assert_eq!(count_all_returns(&program, f), 2);
        assert_eq!(count_tail_returns(&program, f), 1);
        assert!(has_early_return(&program, f));
    }

    #[test]
    fn return_under_trailing_if_counts_as_early() {
        // if (true) return 1;  -- the classification does not look inside
        // branch statements.
        let mut program = Program::new();
        let test = program.alloc_expr(Expression {
            offset: 0,
            ty: TypeId::new(1),
            kind: ExprKind::BoolLiteral(true),
        });
        let value = int_lit(&mut program, 1);
        let ret = ret(&mut program, Some(value));
        let if_stmt = program.alloc_stmt(Statement {
            offset: 0,
            kind: StmtKind::If {
                test,
                if_true: ret,
                if_false: None,
            },
        });
        let body = block(&mut program, vec![if_stmt]);
        let f = function(&mut program, "f", body);

        assert_eq!(count_tail_returns(&program, f), 0);
        assert!(has_early_return(&program, f));
    }

    #[test]
    fn nested_trailing_blocks_chain_to_the_tail() {
        let mut program = Program::new();
        let value = int_lit(&mut program, 1);
        let ret = ret(&mut program, Some(value));
        let inner = block(&mut program, vec![ret]);
        let body = block(&mut program, vec![inner]);
        let f = function(&mut program, "f", body);

        assert_eq!(count_tail_returns(&program, f), 1);
        assert!(!has_early_return(&program, f));
    }

    #[test]
    fn return_inside_loop_is_in_breakable_construct() {
        let mut program = Program::new();
        let value = int_lit(&mut program, 1);
        let early_ret = ret(&mut program, Some(value));
        let loop_body = block(&mut program, vec![early_ret]);
        let test = program.alloc_expr(Expression {
            offset: 0,
            ty: TypeId::new(1),
            kind: ExprKind::BoolLiteral(true),
        });
        let while_stmt = program.alloc_stmt(Statement {
            offset: 0,
            kind: StmtKind::While {
                test,
                body: loop_body,
            },
        });
        let tail_value = int_lit(&mut program, 2);
        let tail = ret(&mut program, Some(tail_value));
        let body = block(&mut program, vec![while_stmt, tail]);
        let f = function(&mut program, "f", body);

        assert_eq!(count_returns_in_breakable(&program, f), 1);
        assert_eq!(count_all_returns(&program, f), 2);
        assert_eq!(count_tail_returns(&program, f), 1);
    }

    #[test]
    fn return_after_loop_is_not_in_breakable_construct() {
        let mut program = Program::new();
        let test = program.alloc_expr(Expression {
            offset: 0,
            ty: TypeId::new(1),
            kind: ExprKind::BoolLiteral(false),
        });
        let loop_body = block(&mut program, vec![]);
        let while_stmt = program.alloc_stmt(Statement {
            offset: 0,
            kind: StmtKind::While {
                test,
                body: loop_body,
            },
        });
        let value = int_lit(&mut program, 1);
        let tail = ret(&mut program, Some(value));
        let body = block(&mut program, vec![while_stmt, tail]);
        let f = function(&mut program, "f", body);

        assert_eq!(count_returns_in_breakable(&program, f), 0);
    }

    #[test]
    fn direct_recursion_is_detected() {
        let mut program = Program::new();
        // Allocate the function first so its body can call it.
        let placeholder = block(&mut program, vec![]);
        let f = function(&mut program, "f", placeholder);
        let call = program.alloc_expr(Expression {
            offset: 0,
            ty: int_ty(),
            kind: ExprKind::Call {
                function: f,
                args: Vec::new(),
            },
        });
        let call_stmt = ret(&mut program, Some(call));
        let body = block(&mut program, vec![call_stmt]);
        program.function_mut(f).definition = Some(body);

        assert!(contains_recursive_call(&program, f));
    }

    #[test]
    fn inline_marker_counts_as_recursion() {
        let mut program = Program::new();
        let placeholder = block(&mut program, vec![]);
        let f = function(&mut program, "f", placeholder);
        let marker = program.alloc_stmt(Statement {
            offset: 0,
            kind: StmtKind::InlineMarker(f),
        });
        let body = block(&mut program, vec![marker]);
        program.function_mut(f).definition = Some(body);

        assert!(contains_recursive_call(&program, f));
    }

    #[test]
    fn calls_to_other_functions_are_not_recursion() {
        let mut program = Program::new();
        let g_body = block(&mut program, vec![]);
        let g = function(&mut program, "g", g_body);
        let call = program.alloc_expr(Expression {
            offset: 0,
            ty: int_ty(),
            kind: ExprKind::Call {
                function: g,
                args: Vec::new(),
            },
        });
        let call_stmt = program.alloc_stmt(Statement::expression(0, call));
        let body = block(&mut program, vec![call_stmt]);
        let f = function(&mut program, "f", body);

        assert!(!contains_recursive_call(&program, f));
    }
}
