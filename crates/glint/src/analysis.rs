//! Usage analysis over the IR.
//!
//! Small queries consumed by rewriting passes: how big a function is,
//! whether a statement subtree writes to a variable, and how many call
//! sites reference each function. All three are conservative full walks;
//! none of them mutates the tree.

use std::collections::HashMap;
use std::sync::atomic::Ordering;

use crate::intern::{ExprId, FunctionId, StmtId, VarId};
use crate::ir::visit::{walk_expression, walk_statement, Visitor};
use crate::ir::{ExprKind, Program, RefKind};

struct NodeCounter {
    count: usize,
}

impl Visitor for NodeCounter {
    fn visit_statement(&mut self, program: &Program, id: StmtId) -> bool {
        self.count += 1;
        walk_statement(self, program, id)
    }

    fn visit_expression(&mut self, program: &Program, id: ExprId) -> bool {
        self.count += 1;
        walk_expression(self, program, id)
    }
}

/// Number of IR nodes in `function`'s body, a proxy for generated code
/// size. Zero when the function has no definition.
pub fn node_count(program: &Program, function: FunctionId) -> usize {
    let Some(body) = program.function(function).definition else {
        return 0;
    };
    let mut counter = NodeCounter { count: 0 };
    counter.visit_statement(program, body);
    counter.count
}

struct WritesToVariable {
    var: VarId,
}

impl Visitor for WritesToVariable {
    fn visit_expression(&mut self, program: &Program, id: ExprId) -> bool {
        if let ExprKind::VariableRef { var, ref_kind } = program.expr(id).kind {
            if var == self.var && matches!(ref_kind, RefKind::Write | RefKind::ReadWrite) {
                return true;
            }
        }
        walk_expression(self, program, id)
    }
}

/// Whether any reference inside `stmt` writes to `var`. Reads do not
/// count; `++`/`--` and compound assignments are read-write references
/// and do.
pub fn statement_writes_to(program: &Program, stmt: StmtId, var: VarId) -> bool {
    let mut visitor = WritesToVariable { var };
    visitor.visit_statement(program, stmt)
}

struct CallCounter {
    counts: HashMap<FunctionId, u32>,
}

impl Visitor for CallCounter {
    fn visit_expression(&mut self, program: &Program, id: ExprId) -> bool {
        if let ExprKind::Call { function, .. } = program.expr(id).kind {
            *self.counts.entry(function).or_insert(0) += 1;
        }
        walk_expression(self, program, id)
    }
}

/// Recomputes every function declaration's `call_count` from the program.
pub fn update_call_counts(program: &mut Program) {
    let mut counter = CallCounter {
        counts: HashMap::new(),
    };
    for element in &program.elements {
        match *element {
            crate::ir::ProgramElement::Function { body, .. } => {
                counter.visit_statement(program, body);
            }
            crate::ir::ProgramElement::GlobalVars(decls) => {
                counter.visit_statement(program, decls);
            }
        }
    }
    for (index, decl) in program.functions.iter().enumerate() {
        let count = counter
            .counts
            .get(&FunctionId::new(index))
            .copied()
            .unwrap_or(0);
        decl.call_count.store(count, Ordering::Relaxed);
    }
}
