//! Variable declaration placement.
//!
//! Earlier stages leave every local as an uninitialized single-binding
//! declaration at the top of the block that owns it. This pass strips those
//! declarations and re-emits each one at the narrowest enclosing block that
//! still covers every use, folding it into a leading `name = value` where it
//! can and marking it `final` when it is assigned exactly once.
//!
//! Per block and per variable the search has two outcomes:
//! - declare here, before the first statement that uses the variable;
//! - push the declaration down into each child block independently.
//!
//! All tree edits are queued and applied once the walk is finished.

use tracing::{debug, trace};

use crate::analysis::{DefiniteAssignment, FlowAnalysis};
use crate::ast::{AstType, NodeId, NodeKind, SyntaxTree, VariableId};
use crate::error::CoreError;
use crate::pipeline::{AstTransform, PassConfig};

use super::util::{plain_assignment_to, statement_assignment, uses_variable};
use super::variable_edits::{DeclarationSite, EditQueue, EditStats, VariableToDeclare};

/// Policies the placement honours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclareOptions {
    pub allow_pass_into_loops: bool,
    pub mark_effectively_final: bool,
    pub fold_initializers: bool,
}

impl Default for DeclareOptions {
    fn default() -> Self {
        Self {
            allow_pass_into_loops: true,
            mark_effectively_final: true,
            fold_initializers: true,
        }
    }
}

impl From<&PassConfig> for DeclareOptions {
    fn from(config: &PassConfig) -> Self {
        Self {
            allow_pass_into_loops: config.allow_pass_into_loops,
            mark_effectively_final: config.mark_effectively_final,
            fold_initializers: config.fold_initializers,
        }
    }
}

/// Result of searching one block for a variable's declaration point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclarationSearch {
    /// First statement of the block that uses the variable.
    pub declaration_point: Option<NodeId>,
    /// Every use is confined to child blocks, so the declaration can move there.
    pub can_move_into_sub_blocks: bool,
}

/// Find where `name` must be declared within `block`.
///
/// The first using statement is the declaration point. Each using statement
/// must keep its uses inside child blocks, and the rest of the block after it
/// must not read anything unassigned; otherwise the declaration stays here.
pub fn find_declaration_point<A: DefiniteAssignment + ?Sized>(
    analysis: &mut A,
    tree: &SyntaxTree,
    name: &str,
    allow_pass_into_loops: bool,
    block: NodeId,
) -> DeclarationSearch {
    let mut declaration_point = None;

    for &stmt in tree.statements(block) {
        if !uses_variable(tree, stmt, name) {
            continue;
        }
        declaration_point.get_or_insert(stmt);

        if !can_move_variable_into_sub_block(tree, stmt, name, allow_pass_into_loops) {
            return DeclarationSearch {
                declaration_point,
                can_move_into_sub_blocks: false,
            };
        }

        if let Some(next) = tree.next_statement(stmt) {
            analysis.set_analyzed_range(tree, next, block);
            analysis.analyze(tree, name);
            let unassigned = analysis.unassigned_variable_uses();
            trace!(variable = name, from = %next, %block, unassigned = unassigned.len(), "checked suffix");
            // Any unassigned read at all, not just of `name`.
            if !unassigned.is_empty() {
                return DeclarationSearch {
                    declaration_point,
                    can_move_into_sub_blocks: false,
                };
            }
        }
    }

    DeclarationSearch {
        declaration_point,
        can_move_into_sub_blocks: true,
    }
}

/// [`find_declaration_point`] for the single binding of `declaration`,
/// with loops allowed. `None` if `declaration` is not a declaration.
pub fn find_declaration_point_for<A: DefiniteAssignment + ?Sized>(
    analysis: &mut A,
    tree: &SyntaxTree,
    declaration: NodeId,
    block: NodeId,
) -> Option<DeclarationSearch> {
    let NodeKind::VariableDeclaration { variables, .. } = tree.kind(declaration) else {
        return None;
    };
    let NodeKind::VariableInitializer { name, .. } = tree.kind(*variables.first()?) else {
        return None;
    };
    Some(find_declaration_point(analysis, tree, name, true, block))
}

/// Whether every use of `name` in `stmt` sits inside one of its child blocks.
pub fn can_move_variable_into_sub_block(
    tree: &SyntaxTree,
    stmt: NodeId,
    name: &str,
    allow_pass_into_loops: bool,
) -> bool {
    let kind = tree.kind(stmt);
    if !allow_pass_into_loops && kind.is_loop() {
        return false;
    }

    if let NodeKind::For { init, .. } = kind {
        if let [only] = init.as_slice() {
            let assignment = statement_assignment(tree, *only);
            if let Some((_, value)) = assignment.and_then(|a| plain_assignment_to(tree, a, name)) {
                return !uses_variable(tree, value, name);
            }
        }
    }

    kind.children()
        .into_iter()
        .filter(|&child| !tree.is_block(child))
        .all(|child| {
            if !uses_variable(tree, child, name) {
                return true;
            }
            tree.kind(child).has_nested_blocks()
                && tree
                    .children(child)
                    .into_iter()
                    .filter(|&nested| !tree.is_block(nested))
                    .all(|nested| !uses_variable(tree, nested, name))
        })
}

/// The assignment in `stmt` that a declaration of `name` can absorb:
/// exactly `name = value` with `value` not reading `name`.
fn foldable_assignment(tree: &SyntaxTree, stmt: NodeId, name: &str) -> Option<(NodeId, NodeId)> {
    let assignment = statement_assignment(tree, stmt)?;
    let (target, value) = plain_assignment_to(tree, assignment, name)?;
    if uses_variable(tree, value, name) {
        return None;
    }
    Some((assignment, target))
}

/// The single `for` initializer in `stmt` that assigns `name`, if any.
fn for_initializer(tree: &SyntaxTree, stmt: NodeId, name: &str) -> Option<(NodeId, NodeId)> {
    match tree.kind(stmt) {
        NodeKind::For { init, .. } if init.len() == 1 => foldable_assignment(tree, init[0], name),
        _ => None,
    }
}

/// A declaration stripped from its block, waiting to be placed.
#[derive(Debug, Clone)]
struct StrippedVariable {
    ty: AstType,
    name: String,
    variable: Option<VariableId>,
}

/// The variable `stmt` declares, if it is a declaration.
///
/// Declarations must have one binding and no initializer.
fn stripped_variable(tree: &SyntaxTree, block: NodeId, stmt: NodeId) -> Result<Option<StrippedVariable>, CoreError> {
    let NodeKind::VariableDeclaration { ty, variables, .. } = tree.kind(stmt) else {
        return Ok(None);
    };
    let [binding] = variables.as_slice() else {
        return Err(CoreError::InvariantViolation {
            block,
            message: format!("declaration {stmt} has {} bindings", variables.len()),
        });
    };
    let NodeKind::VariableInitializer { name, init } = tree.kind(*binding) else {
        return Err(CoreError::InvariantViolation {
            block,
            message: format!("declaration {stmt} binds a non-variable {binding}"),
        });
    };
    if init.is_some() {
        return Err(CoreError::InvariantViolation {
            block,
            message: format!("`{name}` in {stmt} already has an initializer"),
        });
    }
    Ok(Some(StrippedVariable {
        ty: ty.clone(),
        name: name.clone(),
        variable: tree.meta(*binding).variable,
    }))
}

/// Remove every declaration directly in `block`.
///
/// The block is left untouched if any declaration is malformed.
fn strip_declarations(tree: &mut SyntaxTree, block: NodeId) -> Result<Vec<StrippedVariable>, CoreError> {
    let mut declarations = Vec::new();
    let mut stripped = Vec::new();
    for &stmt in tree.statements(block) {
        if let Some(var) = stripped_variable(tree, block, stmt)? {
            declarations.push(stmt);
            stripped.push(var);
        }
    }
    for stmt in declarations {
        tree.remove(stmt)?;
    }
    Ok(stripped)
}

/// Check that every block under `root` holds only declarations this pass
/// can strip, reporting the first that is not.
pub fn check_declarations(tree: &SyntaxTree, root: NodeId) -> Result<usize, CoreError> {
    let mut count = 0;
    for block in tree.descendants_and_self(root) {
        if !tree.is_block(block) {
            continue;
        }
        for &stmt in tree.statements(block) {
            if stripped_variable(tree, block, stmt)?.is_some() {
                count += 1;
            }
        }
    }
    Ok(count)
}

/// Records placements for one block's stripped variables.
struct Placer<'a, A: DefiniteAssignment + ?Sized> {
    tree: &'a SyntaxTree,
    analysis: &'a mut A,
    edits: &'a mut EditQueue,
    options: DeclareOptions,
}

impl<A: DefiniteAssignment + ?Sized> Placer<'_, A> {
    fn declare_variable_in_block(&mut self, block: NodeId, var: &StrippedVariable, allow_pass_into_loops: bool) {
        let tree = self.tree;
        let search = find_declaration_point(self.analysis, tree, &var.name, allow_pass_into_loops, block);

        let Some(point) = search.declaration_point else {
            debug!(variable = %var.name, %block, "unused in block, dropped");
            return;
        };

        // Without folding, a `for` header assignment would be left undeclared.
        let can_move = search.can_move_into_sub_blocks
            && (self.options.fold_initializers
                || !tree
                    .statements(block)
                    .iter()
                    .any(|&stmt| for_initializer(tree, stmt, &var.name).is_some()));

        if can_move {
            debug!(variable = %var.name, %block, "migrating into child blocks");
            for &stmt in tree.statements(block) {
                if self.options.fold_initializers {
                    if let Some((assignment, target)) = for_initializer(tree, stmt, &var.name) {
                        self.record_fold(var, assignment, target);
                        continue;
                    }
                }
                for child in tree.children(stmt) {
                    if tree.is_block(child) {
                        self.declare_variable_in_block(child, var, allow_pass_into_loops);
                    } else if tree.kind(child).has_nested_blocks() {
                        for nested in tree.children(child) {
                            if tree.is_block(nested) {
                                self.declare_variable_in_block(nested, var, allow_pass_into_loops);
                            }
                        }
                    }
                }
            }
            return;
        }

        if self.options.fold_initializers {
            if let Some((assignment, target)) = foldable_assignment(tree, point, &var.name) {
                self.record_fold(var, assignment, target);
                return;
            }
        }

        debug!(variable = %var.name, %block, at = %point, "declaring before first use");
        self.edits.push(VariableToDeclare {
            ty: var.ty.clone(),
            name: var.name.clone(),
            variable: var.variable,
            site: DeclarationSite::InsertBefore(point),
        });
    }

    fn record_fold(&mut self, var: &StrippedVariable, assignment: NodeId, target: NodeId) {
        debug!(variable = %var.name, %assignment, "folding into initializer");
        self.edits.push(VariableToDeclare {
            ty: var.ty.clone(),
            name: var.name.clone(),
            variable: self.tree.meta(target).variable,
            site: DeclarationSite::ReplaceAssignment(assignment),
        });
    }
}

/// Places every local declaration of a method body at its narrowest scope.
///
/// Not reentrant: one instance owns its edit queue for the duration of a run.
#[derive(Debug, Default)]
pub struct DeclareVariables {
    options: DeclareOptions,
    edits: EditQueue,
    last_stats: EditStats,
}

impl DeclareVariables {
    pub fn new(options: DeclareOptions) -> Self {
        Self {
            options,
            edits: EditQueue::new(),
            last_stats: EditStats::default(),
        }
    }

    /// What the last successful run changed.
    pub fn last_stats(&self) -> EditStats {
        self.last_stats
    }

    fn visit(&mut self, tree: &mut SyntaxTree, node: NodeId) -> Result<(), CoreError> {
        if tree.is_block(node) {
            let stripped = strip_declarations(tree, node)?;
            if !stripped.is_empty() {
                let mut analysis = FlowAnalysis::new(node);
                let mut placer = Placer {
                    tree: &*tree,
                    analysis: &mut analysis,
                    edits: &mut self.edits,
                    options: self.options,
                };
                for var in &stripped {
                    placer.declare_variable_in_block(node, var, self.options.allow_pass_into_loops);
                }
            }
        }
        for child in tree.children(node) {
            self.visit(tree, child)?;
        }
        Ok(())
    }
}

impl AstTransform for DeclareVariables {
    fn name(&self) -> &str {
        "declare-variables"
    }

    fn run(&mut self, tree: &mut SyntaxTree, root: NodeId) -> Result<(), CoreError> {
        if let Err(e) = self.visit(tree, root) {
            self.edits.clear();
            return Err(e);
        }
        self.last_stats = self.edits.apply(tree, self.options.mark_effectively_final)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::ast::NodeMeta;
    use crate::entity::EntityRef;

    fn var(tree: &mut SyntaxTree, name: &str) -> NodeId {
        tree.ident(name)
    }

    fn use_stmt(tree: &mut SyntaxTree, method: &str, name: &str) -> NodeId {
        let arg = var(tree, name);
        tree.call_stmt(method, vec![arg])
    }

    fn assign(tree: &mut SyntaxTree, name: &str, n: i64) -> NodeId {
        let value = tree.int(n);
        tree.assign_stmt(name, value)
    }

    fn run_with(tree: &mut SyntaxTree, root: NodeId, options: DeclareOptions) {
        DeclareVariables::new(options).run(tree, root).unwrap();
    }

    fn run(tree: &mut SyntaxTree, root: NodeId) {
        run_with(tree, root, DeclareOptions::default());
    }

    /// (name, has initializer, is final) of a declaration statement.
    fn decl(tree: &SyntaxTree, stmt: NodeId) -> (String, Option<NodeId>, bool) {
        match tree.kind(stmt) {
            NodeKind::VariableDeclaration {
                variables, is_final, ..
            } => match tree.kind(variables[0]) {
                NodeKind::VariableInitializer { name, init } => (name.clone(), *init, *is_final),
                other => panic!("Expected VariableInitializer, got: {other:?}"),
            },
            other => panic!("Expected VariableDeclaration, got: {other:?}"),
        }
    }

    fn is_decl(tree: &SyntaxTree, stmt: NodeId) -> bool {
        matches!(tree.kind(stmt), NodeKind::VariableDeclaration { .. })
    }

    fn count_decls(tree: &SyntaxTree, root: NodeId) -> usize {
        tree.descendants_and_self(root)
            .into_iter()
            .filter(|&id| is_decl(tree, id))
            .count()
    }

    #[test]
    fn unused_variable_is_dropped() {
        let mut tree = SyntaxTree::new();
        let d = tree.declare(AstType::int(), "v");
        let u = use_stmt(&mut tree, "use", "w");
        let root = tree.block(vec![d, u]);
        run(&mut tree, root);
        assert_eq!(tree.statements(root), &[u]);
    }

    #[test]
    fn single_assignment_folds_and_is_final() {
        // { int v; v = 1; use(v); }
        let mut tree = SyntaxTree::new();
        let d = tree.declare(AstType::int(), "v");
        let a = assign(&mut tree, "v", 1);
        let u = use_stmt(&mut tree, "use", "v");
        let root = tree.block(vec![d, a, u]);
        run(&mut tree, root);

        let stmts = tree.statements(root).to_vec();
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[1], u);
        let (name, init, is_final) = decl(&tree, stmts[0]);
        assert_eq!(name, "v");
        assert!(matches!(tree.kind(init.unwrap()), NodeKind::Literal(c) if c.to_string() == "1"));
        assert!(is_final);
    }

    #[test]
    fn disjoint_branches_each_get_a_declaration() {
        // { int v; if (c) { v = 1; use(v); } else { v = 2; use(v); } }
        let mut tree = SyntaxTree::new();
        let d = tree.declare(AstType::int(), "v");
        let a1 = assign(&mut tree, "v", 1);
        let u1 = use_stmt(&mut tree, "use", "v");
        let then_block = tree.block(vec![a1, u1]);
        let a2 = assign(&mut tree, "v", 2);
        let u2 = use_stmt(&mut tree, "use", "v");
        let else_block = tree.block(vec![a2, u2]);
        let c = var(&mut tree, "c");
        let branch = tree.if_stmt(c, then_block, Some(else_block));
        let root = tree.block(vec![d, branch]);
        run(&mut tree, root);

        assert_eq!(tree.statements(root), &[branch]);
        for block in [then_block, else_block] {
            let stmts = tree.statements(block).to_vec();
            assert_eq!(stmts.len(), 2);
            let (name, init, is_final) = decl(&tree, stmts[0]);
            assert_eq!(name, "v");
            assert!(init.is_some());
            assert!(is_final);
        }
    }

    #[test]
    fn for_initializer_absorbs_declaration() {
        // { int i; for (i = 0; i < n; i++) { use(i); } }
        let mut tree = SyntaxTree::new();
        let d = tree.declare(AstType::int(), "i");
        let init = assign(&mut tree, "i", 0);
        let i = var(&mut tree, "i");
        let n = var(&mut tree, "n");
        let cond = tree.binary(crate::ast::BinOp::Lt, i, n);
        let operand = var(&mut tree, "i");
        let step = tree.unary(crate::ast::UnaryOp::PostIncrement, operand);
        let u = use_stmt(&mut tree, "use", "i");
        let body = tree.block(vec![u]);
        let lp = tree.for_loop(vec![init], Some(cond), vec![step], body);
        let root = tree.block(vec![d, lp]);
        run(&mut tree, root);

        assert_eq!(tree.statements(root), &[lp]);
        let NodeKind::For { init: slots, .. } = tree.kind(lp) else {
            panic!("Expected For");
        };
        let (name, value, is_final) = decl(&tree, slots[0]);
        assert_eq!(name, "i");
        assert!(value.is_some());
        assert!(!is_final);
        assert_eq!(tree.statements(body), &[u]);
    }

    #[test]
    fn reassignment_after_branch_keeps_declaration_hoisted() {
        // { int v; v = 1; if (c) { use(v); } v = 2; use2(v); }
        let mut tree = SyntaxTree::new();
        let d = tree.declare(AstType::int(), "v");
        let a1 = assign(&mut tree, "v", 1);
        let u1 = use_stmt(&mut tree, "use", "v");
        let then_block = tree.block(vec![u1]);
        let c = var(&mut tree, "c");
        let branch = tree.if_stmt(c, then_block, None);
        let a2 = assign(&mut tree, "v", 2);
        let u2 = use_stmt(&mut tree, "use2", "v");
        let root = tree.block(vec![d, a1, branch, a2, u2]);
        run(&mut tree, root);

        let stmts = tree.statements(root).to_vec();
        assert_eq!(stmts.len(), 4);
        assert_eq!(&stmts[1..], &[branch, a2, u2]);
        let (name, init, is_final) = decl(&tree, stmts[0]);
        assert_eq!(name, "v");
        assert!(init.is_some());
        assert!(!is_final);
        assert_eq!(tree.statements(then_block), &[u1]);
    }

    #[test]
    fn declaration_stays_above_branch_reassigned_later() {
        // { int v; if (c) { v = 1; use(v); } v = 2; use2(v); }
        let mut tree = SyntaxTree::new();
        let d = tree.declare(AstType::int(), "v");
        let a1 = assign(&mut tree, "v", 1);
        let u1 = use_stmt(&mut tree, "use", "v");
        let then_block = tree.block(vec![a1, u1]);
        let c = var(&mut tree, "c");
        let branch = tree.if_stmt(c, then_block, None);
        let a2 = assign(&mut tree, "v", 2);
        let u2 = use_stmt(&mut tree, "use2", "v");
        let root = tree.block(vec![d, branch, a2, u2]);
        run(&mut tree, root);

        let stmts = tree.statements(root).to_vec();
        assert_eq!(&stmts[1..], &[branch, a2, u2]);
        let (name, init, is_final) = decl(&tree, stmts[0]);
        assert_eq!(name, "v");
        assert_eq!(init, None);
        assert!(!is_final);
        assert_eq!(count_decls(&tree, root), 1);
    }

    #[test]
    fn unassigned_read_after_branch_blocks_migration() {
        // { int v; if (c) { v = 1; use(v); } use2(v); }
        let mut tree = SyntaxTree::new();
        let d = tree.declare(AstType::int(), "v");
        let a1 = assign(&mut tree, "v", 1);
        let u1 = use_stmt(&mut tree, "use", "v");
        let then_block = tree.block(vec![a1, u1]);
        let c = var(&mut tree, "c");
        let branch = tree.if_stmt(c, then_block, None);
        let u2 = use_stmt(&mut tree, "use2", "v");
        let root = tree.block(vec![d, branch, u2]);
        run(&mut tree, root);

        let stmts = tree.statements(root).to_vec();
        assert_eq!(&stmts[1..], &[branch, u2]);
        assert_eq!(decl(&tree, stmts[0]).1, None);
    }

    #[test]
    fn loops_can_be_closed_to_migration() {
        // { int v; while (c) { v = 1; use(v); } }
        let build = |tree: &mut SyntaxTree| {
            let d = tree.declare(AstType::int(), "v");
            let a = assign(tree, "v", 1);
            let u = use_stmt(tree, "use", "v");
            let body = tree.block(vec![a, u]);
            let c = var(tree, "c");
            let lp = tree.while_loop(c, body);
            (tree.block(vec![d, lp]), lp, body)
        };

        let mut tree = SyntaxTree::new();
        let (root, lp, body) = build(&mut tree);
        let closed = DeclareOptions {
            allow_pass_into_loops: false,
            ..DeclareOptions::default()
        };
        run_with(&mut tree, root, closed);
        let stmts = tree.statements(root).to_vec();
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[1], lp);
        assert_eq!(decl(&tree, stmts[0]).0, "v");
        assert_eq!(tree.statements(body).len(), 2);

        let mut tree = SyntaxTree::new();
        let (root, lp, body) = build(&mut tree);
        run(&mut tree, root);
        assert_eq!(tree.statements(root), &[lp]);
        assert!(is_decl(&tree, tree.statements(body)[0]));
    }

    #[test]
    fn catch_body_is_reached_through_the_clause() {
        // { int v; try { f(); } catch (E e) { v = 1; use(v); } }
        let mut tree = SyntaxTree::new();
        let d = tree.declare(AstType::int(), "v");
        let f = tree.call_stmt("f", vec![]);
        let body = tree.block(vec![f]);
        let a = assign(&mut tree, "v", 1);
        let u = use_stmt(&mut tree, "use", "v");
        let handler = tree.block(vec![a, u]);
        let clause = tree.catch_clause(AstType::named("E"), "e", handler);
        let t = tree.try_stmt(body, vec![clause], None);
        let root = tree.block(vec![d, t]);
        run(&mut tree, root);

        assert_eq!(tree.statements(root), &[t]);
        let (name, init, is_final) = decl(&tree, tree.statements(handler)[0]);
        assert_eq!(name, "v");
        assert!(init.is_some());
        assert!(is_final);
    }

    #[test]
    fn switch_sections_receive_their_own_declarations() {
        // { int v; switch (k) { case 1: { v = 1; use(v); } default: { v = 2; use(v); } } }
        let mut tree = SyntaxTree::new();
        let d = tree.declare(AstType::int(), "v");
        let mut sections = Vec::new();
        let mut bodies = Vec::new();
        for n in [1, 2] {
            let a = assign(&mut tree, "v", n);
            let u = use_stmt(&mut tree, "use", "v");
            let body = tree.block(vec![a, u]);
            let label = tree.int(n);
            sections.push(tree.switch_section(vec![label], body));
            bodies.push(body);
        }
        let k = var(&mut tree, "k");
        let sw = tree.switch(k, sections);
        let root = tree.block(vec![d, sw]);
        run(&mut tree, root);

        assert_eq!(tree.statements(root), &[sw]);
        for body in bodies {
            assert!(decl(&tree, tree.statements(body)[0]).2);
        }
    }

    #[test]
    fn folding_can_be_disabled() {
        let mut tree = SyntaxTree::new();
        let d = tree.declare(AstType::int(), "v");
        let a = assign(&mut tree, "v", 1);
        let u = use_stmt(&mut tree, "use", "v");
        let root = tree.block(vec![d, a, u]);
        let options = DeclareOptions {
            fold_initializers: false,
            ..DeclareOptions::default()
        };
        run_with(&mut tree, root, options);

        let stmts = tree.statements(root).to_vec();
        assert_eq!(&stmts[1..], &[a, u]);
        let (_, init, is_final) = decl(&tree, stmts[0]);
        assert_eq!(init, None);
        assert!(is_final);
    }

    #[test]
    fn unfolded_for_header_keeps_declaration_outside() {
        let mut tree = SyntaxTree::new();
        let d = tree.declare(AstType::int(), "i");
        let init = assign(&mut tree, "i", 0);
        let u = use_stmt(&mut tree, "use", "i");
        let body = tree.block(vec![u]);
        let lp = tree.for_loop(vec![init], None, vec![], body);
        let root = tree.block(vec![d, lp]);
        let options = DeclareOptions {
            fold_initializers: false,
            ..DeclareOptions::default()
        };
        run_with(&mut tree, root, options);

        let stmts = tree.statements(root).to_vec();
        assert_eq!(stmts.len(), 2);
        assert_eq!(decl(&tree, stmts[0]).0, "i");
        assert_eq!(tree.statements(body), &[u]);
    }

    #[test]
    fn final_marking_can_be_disabled() {
        let mut tree = SyntaxTree::new();
        let d = tree.declare(AstType::int(), "v");
        let a = assign(&mut tree, "v", 1);
        let u = use_stmt(&mut tree, "use", "v");
        let root = tree.block(vec![d, a, u]);
        let options = DeclareOptions {
            mark_effectively_final: false,
            ..DeclareOptions::default()
        };
        run_with(&mut tree, root, options);
        assert!(!decl(&tree, tree.statements(root)[0]).2);
    }

    #[test]
    fn variable_binding_survives_placement() {
        let mut tree = SyntaxTree::new();
        let d = tree.declare(AstType::int(), "v");
        let NodeKind::VariableDeclaration { variables, .. } = tree.kind(d) else {
            panic!("Expected VariableDeclaration");
        };
        let binding = variables[0];
        tree.meta_mut(binding).variable = Some(VariableId::new(5));
        let c = var(&mut tree, "c");
        let inner = use_stmt(&mut tree, "use", "v");
        let then_block = tree.block(vec![inner]);
        let branch = tree.if_stmt(c, then_block, None);
        let root = tree.block(vec![d, branch]);
        let outer = use_stmt(&mut tree, "use", "v");
        if let NodeKind::Block { statements } = tree.kind_mut(root) {
            statements.push(outer);
        }
        tree.rebuild_parents(root);
        run(&mut tree, root);

        let placed = tree.statements(root)[0];
        let NodeKind::VariableDeclaration { variables, .. } = tree.kind(placed) else {
            panic!("Expected VariableDeclaration");
        };
        assert_eq!(tree.meta(variables[0]).variable, Some(VariableId::new(5)));
    }

    #[test]
    fn folded_initializer_takes_target_binding() {
        let mut tree = SyntaxTree::new();
        let d = tree.declare(AstType::int(), "v");
        let target = tree.ident_bound("v", VariableId::new(9));
        let one = tree.int(1);
        let store = tree.assign(target, one);
        let a = tree.expr_stmt(store);
        let u = use_stmt(&mut tree, "use", "v");
        let root = tree.block(vec![d, a, u]);
        run(&mut tree, root);

        assert_eq!(
            *tree.meta(one),
            NodeMeta {
                variable: Some(VariableId::new(9)),
                member_reference: None,
            }
        );
    }

    #[test]
    fn initialized_declaration_is_an_invariant_violation() {
        let mut tree = SyntaxTree::new();
        let one = tree.int(1);
        let d = tree.declaration(AstType::int(), "v", Some(one), false);
        let root = tree.block(vec![d]);
        let mut pass = DeclareVariables::default();
        match pass.run(&mut tree, root) {
            Err(CoreError::InvariantViolation { block, .. }) => assert_eq!(block, root),
            other => panic!("Expected InvariantViolation, got: {other:?}"),
        }
        assert_eq!(tree.statements(root), &[d]);
    }

    #[test]
    fn multiple_bindings_are_an_invariant_violation() {
        let mut tree = SyntaxTree::new();
        let a = tree.add(NodeKind::VariableInitializer {
            name: "a".into(),
            init: None,
        });
        let b = tree.add(NodeKind::VariableInitializer {
            name: "b".into(),
            init: None,
        });
        let d = tree.add(NodeKind::VariableDeclaration {
            ty: AstType::int(),
            variables: vec![a, b],
            is_final: false,
        });
        let inner = tree.block(vec![d]);
        let c = var(&mut tree, "c");
        let branch = tree.if_stmt(c, inner, None);
        let root = tree.block(vec![branch]);
        let result = DeclareVariables::default().run(&mut tree, root);
        assert!(matches!(result, Err(CoreError::InvariantViolation { block, .. }) if block == inner));
    }

    #[test]
    fn nested_blocks_are_processed_independently() {
        // { if (c) { int w; w = 1; use(w); } }
        let mut tree = SyntaxTree::new();
        let d = tree.declare(AstType::int(), "w");
        let a = assign(&mut tree, "w", 1);
        let u = use_stmt(&mut tree, "use", "w");
        let inner = tree.block(vec![d, a, u]);
        let c = var(&mut tree, "c");
        let branch = tree.if_stmt(c, inner, None);
        let root = tree.block(vec![branch]);
        let mut pass = DeclareVariables::default();
        pass.run(&mut tree, root).unwrap();

        assert_eq!(tree.statements(inner).len(), 2);
        assert!(decl(&tree, tree.statements(inner)[0]).2);
        assert_eq!(pass.last_stats().folded, 1);
    }

    #[test]
    fn check_counts_declarations_and_reports_violations() {
        let mut tree = SyntaxTree::new();
        let d = tree.declare(AstType::int(), "v");
        let inner_decl = tree.declare(AstType::int(), "w");
        let inner = tree.block(vec![inner_decl]);
        let c = var(&mut tree, "c");
        let branch = tree.if_stmt(c, inner, None);
        let root = tree.block(vec![d, branch]);
        assert_eq!(check_declarations(&tree, root).unwrap(), 2);

        let one = tree.int(1);
        let bad = tree.declaration(AstType::int(), "x", Some(one), false);
        if let NodeKind::Block { statements } = tree.kind_mut(inner) {
            statements.push(bad);
        }
        tree.rebuild_parents(root);
        assert!(matches!(
            check_declarations(&tree, root),
            Err(CoreError::InvariantViolation { block, .. }) if block == inner
        ));
    }

    /// Oracle that always reports the same answer and remembers its ranges.
    struct FixedOracle {
        answer: HashSet<String>,
        ranges: Vec<NodeId>,
    }

    impl DefiniteAssignment for FixedOracle {
        fn set_analyzed_range(&mut self, _tree: &SyntaxTree, start: NodeId, _block: NodeId) {
            self.ranges.push(start);
        }

        fn analyze(&mut self, _tree: &SyntaxTree, _name: &str) {}

        fn unassigned_variable_uses(&self) -> &HashSet<String> {
            &self.answer
        }
    }

    fn two_branches(tree: &mut SyntaxTree) -> (NodeId, NodeId, NodeId) {
        let mut branch = || {
            let u = use_stmt(tree, "use", "v");
            let body = tree.block(vec![u]);
            let c = var(tree, "c");
            tree.if_stmt(c, body, None)
        };
        let first = branch();
        let second = branch();
        (tree.block(vec![first, second]), first, second)
    }

    #[test]
    fn oracle_is_pointed_after_each_confined_use() {
        let mut tree = SyntaxTree::new();
        let (root, first, second) = two_branches(&mut tree);
        let mut oracle = FixedOracle {
            answer: HashSet::new(),
            ranges: Vec::new(),
        };
        let search = find_declaration_point(&mut oracle, &tree, "v", true, root);
        assert_eq!(search.declaration_point, Some(first));
        assert!(search.can_move_into_sub_blocks);
        assert_eq!(oracle.ranges, vec![second]);
    }

    #[test]
    fn any_unassigned_name_rejects_migration() {
        let mut tree = SyntaxTree::new();
        let (root, first, _) = two_branches(&mut tree);
        let mut oracle = FixedOracle {
            answer: HashSet::from(["unrelated".to_string()]),
            ranges: Vec::new(),
        };
        let search = find_declaration_point(&mut oracle, &tree, "v", true, root);
        assert_eq!(search.declaration_point, Some(first));
        assert!(!search.can_move_into_sub_blocks);
    }

    #[test]
    fn search_from_declaration_statement() {
        let mut tree = SyntaxTree::new();
        let d = tree.declare(AstType::int(), "v");
        let (root, first, _) = two_branches(&mut tree);
        let mut analysis = FlowAnalysis::new(root);
        let search = find_declaration_point_for(&mut analysis, &tree, d, root).unwrap();
        assert_eq!(search.declaration_point, Some(first));
        // The second branch reads `v` unassigned.
        assert!(!search.can_move_into_sub_blocks);

        let not_decl = tree.statements(root)[0];
        assert!(find_declaration_point_for(&mut analysis, &tree, not_decl, root).is_none());
    }

    #[test]
    fn for_header_reading_the_variable_is_not_confining() {
        let mut tree = SyntaxTree::new();
        let i = var(&mut tree, "i");
        let one = tree.int(1);
        let sum = tree.binary(crate::ast::BinOp::Add, i, one);
        let init = tree.assign_stmt("i", sum);
        let body = tree.block(vec![]);
        let lp = tree.for_loop(vec![init], None, vec![], body);
        assert!(!can_move_variable_into_sub_block(&tree, lp, "i", true));

        let c = var(&mut tree, "i");
        let u = use_stmt(&mut tree, "use", "i");
        let loop_body = tree.block(vec![u]);
        let wl = tree.while_loop(c, loop_body);
        assert!(!can_move_variable_into_sub_block(&tree, wl, "i", true));

        let c = var(&mut tree, "c");
        let u = use_stmt(&mut tree, "use", "i");
        let loop_body = tree.block(vec![u]);
        let wl = tree.while_loop(c, loop_body);
        assert!(can_move_variable_into_sub_block(&tree, wl, "i", true));
        assert!(!can_move_variable_into_sub_block(&tree, wl, "i", false));
    }

    #[test]
    fn switch_label_reading_the_variable_keeps_it_outside() {
        // { int v; switch (k) { case v: { use(v); } } }
        let mut tree = SyntaxTree::new();
        let d = tree.declare(AstType::int(), "v");
        let u = use_stmt(&mut tree, "use", "v");
        let body = tree.block(vec![u]);
        let label = var(&mut tree, "v");
        let section = tree.switch_section(vec![label], body);
        let k = var(&mut tree, "k");
        let sw = tree.switch(k, vec![section]);
        let root = tree.block(vec![d, sw]);
        assert!(!can_move_variable_into_sub_block(&tree, sw, "v", true));
        run(&mut tree, root);

        let stmts = tree.statements(root).to_vec();
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[1], sw);
        assert_eq!(decl(&tree, stmts[0]), ("v".to_string(), None, false));
        assert_eq!(tree.statements(body), &[u]);
    }

    #[test]
    fn switch_value_reading_the_variable_keeps_it_outside() {
        let mut tree = SyntaxTree::new();
        let one = tree.int(1);
        let write = tree.assign_stmt("v", one);
        let body = tree.block(vec![write]);
        let label = tree.int(1);
        let section = tree.switch_section(vec![label], body);
        let value = var(&mut tree, "v");
        let sw = tree.switch(value, vec![section]);
        assert!(!can_move_variable_into_sub_block(&tree, sw, "v", true));
        assert!(can_move_variable_into_sub_block(&tree, sw, "w", true));
    }

    #[test]
    fn finally_assignment_does_not_license_later_read() {
        // { int v; if (c) { v = 1; use(v); } try { f(); } finally { v = 2; } use(v); }
        let mut tree = SyntaxTree::new();
        let d = tree.declare(AstType::int(), "v");
        let a1 = assign(&mut tree, "v", 1);
        let u1 = use_stmt(&mut tree, "use", "v");
        let then_block = tree.block(vec![a1, u1]);
        let c = var(&mut tree, "c");
        let branch = tree.if_stmt(c, then_block, None);
        let f = tree.call_stmt("f", vec![]);
        let try_body = tree.block(vec![f]);
        let a2 = assign(&mut tree, "v", 2);
        let finally = tree.block(vec![a2]);
        let t = tree.try_stmt(try_body, vec![], Some(finally));
        let u2 = use_stmt(&mut tree, "use", "v");
        let root = tree.block(vec![d, branch, t, u2]);
        run(&mut tree, root);

        let stmts = tree.statements(root).to_vec();
        assert_eq!(&stmts[1..], &[branch, t, u2]);
        assert_eq!(decl(&tree, stmts[0]), ("v".to_string(), None, false));
        assert_eq!(count_decls(&tree, root), 1);
    }

    #[test]
    fn increment_prevents_final() {
        // { int i; i = 0; i++; use(i); }
        let mut tree = SyntaxTree::new();
        let d = tree.declare(AstType::int(), "i");
        let a = assign(&mut tree, "i", 0);
        let operand = var(&mut tree, "i");
        let inc = tree.unary(crate::ast::UnaryOp::PostIncrement, operand);
        let step = tree.expr_stmt(inc);
        let u = use_stmt(&mut tree, "use", "i");
        let root = tree.block(vec![d, a, step, u]);
        run(&mut tree, root);

        let stmts = tree.statements(root).to_vec();
        assert_eq!(&stmts[1..], &[step, u]);
        let (name, init, is_final) = decl(&tree, stmts[0]);
        assert_eq!(name, "i");
        assert!(init.is_some());
        assert!(!is_final);
    }

    #[test]
    fn self_reading_assignment_is_not_folded() {
        // { int v; v = v + 1; use(v); }
        let mut tree = SyntaxTree::new();
        let d = tree.declare(AstType::int(), "v");
        let v = var(&mut tree, "v");
        let one = tree.int(1);
        let sum = tree.binary(crate::ast::BinOp::Add, v, one);
        let a = tree.assign_stmt("v", sum);
        let u = use_stmt(&mut tree, "use", "v");
        let root = tree.block(vec![d, a, u]);
        run(&mut tree, root);

        let stmts = tree.statements(root).to_vec();
        assert_eq!(&stmts[1..], &[a, u]);
        assert_eq!(decl(&tree, stmts[0]), ("v".to_string(), None, true));
    }
}
