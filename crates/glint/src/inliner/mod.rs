//! Function-call inlining over the Glint IR.
//!
//! Inlining is more complicated here than in a typical compiler, because
//! the IR is high-level: there is no way to drop statements into the
//! middle of an expression, and no `goto`. The materialised call
//! therefore runs as extra statements *before* the statement containing
//! the call (legal because the language makes no execution-order
//! guarantees between them), and early returns are emulated by wrapping
//! the body in `do { .. } while (false)` and rewriting each return into a
//! `break`.
//!
//! One [`Inliner::analyze`] pass rewrites every eligible call site it can
//! without two rewrites fighting over the same statement slot; the host
//! driver re-runs passes until no change is made, which is also how calls
//! that became newly visible through inlining get handled.
//!
//! Set `GLINT_TRACE_INLINER=1` to log per-candidate decisions to stderr.

mod candidates;
mod eligibility;
mod materialize;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::Ordering;

use crate::context::{Context, Settings};
use crate::intern::{ExprId, FunctionId, Name, ScopeId, StmtId};
use crate::ir::{ExprKind, Program, Statement, StmtKind};

pub use candidates::InlineCandidate;

fn trace_enabled() -> bool {
    std::env::var("GLINT_TRACE_INLINER").is_ok_and(|v| v == "1")
}

/// The inlining pass. One instance may be reused across passes and
/// programs; its name counter never repeats, so two passes can never mint
/// the same scratch-variable name.
pub struct Inliner<'a> {
    context: &'a Context,
    settings: &'a Settings,
    var_counter: u32,
}

impl<'a> Inliner<'a> {
    pub fn new(context: &'a Context, settings: &'a Settings) -> Self {
        Self {
            context,
            settings,
            var_counter: 0,
        }
    }

    /// Re-binds the context/settings references and restarts the name
    /// counter.
    pub fn reset(&mut self, context: &'a Context, settings: &'a Settings) {
        self.context = context;
        self.settings = settings;
        self.var_counter = 0;
    }

    /// Mints a variable name that does not collide with anything visible
    /// from `scope`. The numeric prefix keeps names from different
    /// inlined calls apart; the splitter underscore is dropped when the
    /// base name already starts with one, because the target languages
    /// reject identifiers containing consecutive underscores.
    fn unique_name_for_inline_var(
        &mut self,
        program: &Program,
        scope: ScopeId,
        base_name: &str,
    ) -> Name {
        let splitter = if base_name.starts_with('_') { "" } else { "_" };
        loop {
            let text = format!("_{}{}{}", self.var_counter, splitter, base_name);
            self.var_counter += 1;
            let name = Name::new(&text);
            if program.symbols.lookup(scope, name).is_none() {
                return name;
            }
        }
    }

    /// Whether the call's target can be inlined at all, given the node
    /// budget `threshold` (`usize::MAX` disables the size check).
    pub fn is_safe_to_inline(&self, program: &Program, call: ExprId, threshold: usize) -> bool {
        let ExprKind::Call { function, .. } = &program.expr(call).kind else {
            return false;
        };
        self.function_is_safe_to_inline(program, *function, threshold)
    }

    fn function_is_safe_to_inline(
        &self,
        program: &Program,
        function: FunctionId,
        threshold: usize,
    ) -> bool {
        let decl = program.function(function);
        if decl.definition.is_none() {
            // Can't inline something we don't have the body of.
            return false;
        }
        if threshold < usize::MAX
            && !decl.modifiers.is_inline
            && crate::analysis::node_count(program, function) >= threshold
        {
            return false;
        }
        if !self.settings.caps.can_use_do_loops {
            // Without do-while loops there is no way to emulate an early
            // return; only functions whose returns are all at the end of
            // control flow survive.
            let early = eligibility::has_early_return(program, function);
            // A return inside a loop or switch is never at the end of
            // control flow.
            debug_assert!(
                early || eligibility::count_returns_in_breakable(program, function) == 0
            );
            return !early;
        }
        // Early returns become breaks out of the do-while wrapper, but a
        // return already inside a breakable construct would need its break
        // to jump two levels. No emulation for that.
        let in_breakable = eligibility::count_returns_in_breakable(program, function) > 0;
        debug_assert!(!in_breakable || eligibility::has_early_return(program, function));
        !in_breakable
    }

    /// Runs one inlining pass over `program`. Returns `true` if anything
    /// was rewritten.
    pub fn analyze(&mut self, program: &mut Program) -> bool {
        let candidates = candidates::find_candidates(program);
        let trace = trace_enabled();

        // Eligibility is a property of the callee, not the call site;
        // decide once per function.
        let mut inlinable: HashMap<FunctionId, bool> = HashMap::new();
        for candidate in &candidates {
            let ExprKind::Call { function, .. } = &program.expr(candidate.call_expr).kind else {
                debug_assert!(false, "candidate slot does not hold a function call");
                continue;
            };
            let function = *function;
            inlinable.entry(function).or_insert_with(|| {
                // Single-use functions are always worth inlining; only
                // multi-use functions answer to the size threshold.
                let threshold =
                    if program.function(function).call_count.load(Ordering::Relaxed) > 1 {
                        self.settings.inline_threshold
                    } else {
                        usize::MAX
                    };
                let safe = self.function_is_safe_to_inline(program, function, threshold)
                    && !eligibility::contains_recursive_call(program, function);
                if trace {
                    eprintln!(
                        "glint: inliner: {} is {}",
                        program.function(function).name,
                        if safe { "inlinable" } else { "not inlinable" }
                    );
                }
                safe
            });
        }

        // Two rewrites may not share one enclosing slot: the second would
        // operate on a statement the first has already moved. Deferred
        // candidates are rediscovered on the next pass.
        let mut touched: HashSet<StmtId> = HashSet::new();
        let mut made_changes = false;
        for candidate in &candidates {
            let ExprKind::Call { function, .. } = &program.expr(candidate.call_expr).kind else {
                continue;
            };
            let function = *function;
            if !inlinable[&function] {
                continue;
            }
            // A rewritten parent slot no longer holds the statement the
            // analyser saw, so the scoping decision below would be made
            // against the wrong node. Wait for the next pass.
            if candidate
                .parent_stmt
                .is_some_and(|parent| touched.contains(&parent))
            {
                if trace {
                    eprintln!(
                        "glint: inliner: deferring call to {} (parent statement already rewritten)",
                        program.function(function).name
                    );
                }
                continue;
            }
            if !touched.insert(candidate.enclosing_stmt) {
                if trace {
                    eprintln!(
                        "glint: inliner: deferring call to {} (enclosing statement already rewritten)",
                        program.function(function).name
                    );
                }
                continue;
            }

            let inlined = self.inline_call(program, candidate);
            let mut body = inlined.inlined_body;
            ensure_scoped_blocks(program, &mut body, candidate.parent_stmt);

            // Move the enclosing statement to the end of the materialised
            // block, then drop the block into the enclosing slot:
            //   before:  enclosing = stmt
            //   after:   enclosing = { marker, decls, body.., stmt }
            let displaced =
                std::mem::replace(program.stmt_mut(candidate.enclosing_stmt), Statement::nop());
            let displaced = program.alloc_stmt(displaced);
            match &mut body.kind {
                StmtKind::Block { stmts, .. } => stmts.push(displaced),
                _ => unreachable!("materialised body is always a block"),
            }
            *program.stmt_mut(candidate.enclosing_stmt) = body;

            // The call expression is the only node destroyed by the
            // rewrite.
            *program.expr_mut(candidate.call_expr) = inlined.replacement_expr;
            made_changes = true;
        }

        made_changes
    }
}

/// Single-statement contexts (`if` arms, loop bodies) fuse textually with
/// whatever statement follows them unless the statement they hold is
/// braced. If the materialised block ends up in such a position and no
/// block along its single-statement spine carries a scope, mark the
/// outermost block as one.
fn ensure_scoped_blocks(program: &Program, inlined_body: &mut Statement, parent: Option<StmtId>) {
    let Some(parent) = parent else {
        return;
    };
    if !matches!(
        program.stmt(parent).kind,
        StmtKind::If { .. } | StmtKind::For { .. } | StmtKind::While { .. } | StmtKind::DoWhile { .. }
    ) {
        return;
    }

    let StmtKind::Block {
        stmts, is_scope, ..
    } = &mut inlined_body.kind
    else {
        return;
    };
    if *is_scope {
        return;
    }
    if stmts.len() != 1 {
        // Multiple (or zero) statements with no braces would fuse with the
        // parent construct; scope the outermost block.
        *is_scope = true;
        return;
    }
    let mut cursor = stmts[0];
    loop {
        match &program.stmt(cursor).kind {
            StmtKind::Block {
                stmts: nested,
                is_scope: nested_scope,
                ..
            } => {
                if *nested_scope {
                    // An explicit scope on the spine; all is well.
                    return;
                }
                if nested.len() != 1 {
                    *is_scope = true;
                    return;
                }
                if !program.stmt(nested[0]).is_block() {
                    return;
                }
                cursor = nested[0];
            }
            // A single non-block statement needs no braces.
            _ => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::TypeId;
    use crate::ir::symbols::Modifiers;
    use crate::ir::{Expression, FunctionDeclaration};

    fn fixture() -> (Context, Settings) {
        (Context::new(), Settings::default())
    }

    #[test]
    fn unique_names_have_numeric_prefixes() {
        let (context, settings) = fixture();
        let mut inliner = Inliner::new(&context, &settings);
        let program = Program::new();
        let scope = program.root_scope;

        let a = inliner.unique_name_for_inline_var(&program, scope, "x");
        let b = inliner.unique_name_for_inline_var(&program, scope, "x");
        assert_eq!(a, "_0_x");
        assert_eq!(b, "_1_x");
    }

    #[test]
    fn leading_underscore_skips_the_splitter() {
        // "_coords" must not become "_0__coords": the target languages
        // reject consecutive underscores.
        let (context, settings) = fixture();
        let mut inliner = Inliner::new(&context, &settings);
        let program = Program::new();

        let name = inliner.unique_name_for_inline_var(&program, program.root_scope, "_coords");
        assert_eq!(name, "_0_coords");
    }

    #[test]
    fn name_counter_skips_taken_names() {
        use crate::ir::symbols::{Storage, Variable};

        let (context, settings) = fixture();
        let mut inliner = Inliner::new(&context, &settings);
        let mut program = Program::new();
        let scope = program.root_scope;
        program.symbols.declare_variable(
            scope,
            Variable {
                offset: 0,
                modifiers: Modifiers::default(),
                name: Name::new("_0_x"),
                ty: TypeId::new(0),
                storage: Storage::Local,
                initial_value: None,
            },
        );

        let name = inliner.unique_name_for_inline_var(&program, scope, "x");
        assert_eq!(name, "_1_x");
    }

    #[test]
    fn reset_restarts_the_name_counter() {
        let (context, settings) = fixture();
        let mut inliner = Inliner::new(&context, &settings);
        let program = Program::new();

        let _ = inliner.unique_name_for_inline_var(&program, program.root_scope, "x");
        inliner.reset(&context, &settings);
        let name = inliner.unique_name_for_inline_var(&program, program.root_scope, "x");
        assert_eq!(name, "_0_x");
    }

    #[test]
    fn functions_without_definitions_are_not_inlinable() {
        let (context, settings) = fixture();
        let inliner = Inliner::new(&context, &settings);
        let mut program = Program::new();
        let f = program.add_function(FunctionDeclaration {
            offset: 0,
            modifiers: Modifiers::default(),
            name: Name::new("f"),
            params: Vec::new(),
            return_type: context.types.void(),
            call_count: Default::default(),
            definition: None,
        });
        let call = program.alloc_expr(Expression {
            offset: 0,
            ty: context.types.void(),
            kind: ExprKind::Call {
                function: f,
                args: Vec::new(),
            },
        });

        assert!(!inliner.is_safe_to_inline(&program, call, usize::MAX));
    }

    #[test]
    fn non_call_expressions_are_never_safe() {
        let (context, settings) = fixture();
        let inliner = Inliner::new(&context, &settings);
        let mut program = Program::new();
        let literal = program.alloc_expr(Expression::bool_literal(
            0,
            context.types.boolean(),
            true,
        ));

        assert!(!inliner.is_safe_to_inline(&program, literal, usize::MAX));
    }
}
