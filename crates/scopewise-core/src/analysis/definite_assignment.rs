//! Definite-assignment queries over a statement range.
//!
//! The declaration pass asks one question over and over: starting at some
//! statement and running to the end of its block, can the variable be read
//! before something assigns it? [`DefiniteAssignment`] is that contract;
//! [`FlowAnalysis`] answers it with a structural forward walk.

use std::collections::HashSet;

use tracing::trace;

use crate::ast::{AssignOp, NodeId, NodeKind, SyntaxTree};

/// Range-restricted definite-assignment oracle.
///
/// Callers re-point the range and re-run [`DefiniteAssignment::analyze`] as
/// often as they like; every call starts from scratch.
pub trait DefiniteAssignment {
    /// Restrict analysis to `start` and the statements after it in `block`.
    fn set_analyzed_range(&mut self, tree: &SyntaxTree, start: NodeId, block: NodeId);

    /// Recompute the result for `name` over the current range.
    fn analyze(&mut self, tree: &SyntaxTree, name: &str);

    /// Names that may be read while still unassigned at the range start.
    fn unassigned_variable_uses(&self) -> &HashSet<String>;
}

#[derive(Debug, Clone, Copy)]
struct AnalyzedRange {
    start: NodeId,
    block: NodeId,
}

/// Structural forward definite-assignment analysis.
///
/// The variable is unassigned on entry to the range. Loops are analysed with
/// a single pass over the body: on a reducible structured body the state at
/// the loop head can only be the entry state, so one visit sees every read.
/// Any statement that leaves normal flow (`return`, `throw`, `break`,
/// `continue`) makes the state vacuously assigned.
#[derive(Debug, Clone)]
pub struct FlowAnalysis {
    root: NodeId,
    range: Option<AnalyzedRange>,
    unassigned: HashSet<String>,
}

impl FlowAnalysis {
    /// Analysis over `root`. Until a range is set, the whole block is analysed.
    pub fn new(root: NodeId) -> Self {
        Self {
            root,
            range: None,
            unassigned: HashSet::new(),
        }
    }

    fn range_statements<'t>(&self, tree: &'t SyntaxTree) -> &'t [NodeId] {
        match self.range {
            Some(AnalyzedRange { start, block }) => {
                let statements = tree.statements(block);
                match statements.iter().position(|&s| s == start) {
                    Some(pos) => &statements[pos..],
                    None => {
                        trace!(%start, %block, "range start is not in its block");
                        &[]
                    }
                }
            }
            None => tree.statements(self.root),
        }
    }
}

impl DefiniteAssignment for FlowAnalysis {
    fn set_analyzed_range(&mut self, _tree: &SyntaxTree, start: NodeId, block: NodeId) {
        self.range = Some(AnalyzedRange { start, block });
    }

    fn analyze(&mut self, tree: &SyntaxTree, name: &str) {
        self.unassigned.clear();
        let mut walker = Walker {
            tree,
            name,
            uses: Vec::new(),
        };
        let mut assigned = false;
        for &stmt in self.range_statements(tree) {
            assigned = walker.stmt(stmt, assigned);
        }
        trace!(variable = name, uses = walker.uses.len(), "definite assignment");
        if !walker.uses.is_empty() {
            self.unassigned.insert(name.to_string());
        }
    }

    fn unassigned_variable_uses(&self) -> &HashSet<String> {
        &self.unassigned
    }
}

/// One forward walk for one name. States are "definitely assigned".
struct Walker<'a> {
    tree: &'a SyntaxTree,
    name: &'a str,
    uses: Vec<NodeId>,
}

impl Walker<'_> {
    fn is_target(&self, id: NodeId) -> bool {
        matches!(self.tree.kind(id), NodeKind::Identifier { name } if name == self.name)
    }

    fn read(&mut self, id: NodeId, assigned: bool) {
        if !assigned {
            self.uses.push(id);
        }
    }

    fn stmts(&mut self, ids: &[NodeId], mut assigned: bool) -> bool {
        for &id in ids {
            assigned = self.stmt(id, assigned);
        }
        assigned
    }

    fn stmt(&mut self, id: NodeId, assigned: bool) -> bool {
        let tree = self.tree;
        match tree.kind(id) {
            NodeKind::Block { statements } => self.stmts(statements, assigned),
            NodeKind::VariableDeclaration { variables, .. } => {
                let mut state = assigned;
                for &binding in variables {
                    if let NodeKind::VariableInitializer { name, init } = tree.kind(binding) {
                        if let Some(init) = init {
                            state = self.expr(*init, state);
                        }
                        // A same-named initialized local shadows from here on.
                        if name == self.name && init.is_some() {
                            state = true;
                        }
                    }
                }
                state
            }
            NodeKind::ExpressionStatement { expr } => self.expr(*expr, assigned),
            NodeKind::If {
                cond,
                then_block,
                else_block,
            } => {
                let after_cond = self.expr(*cond, assigned);
                let after_then = self.stmt(*then_block, after_cond);
                let after_else = match else_block {
                    Some(else_block) => self.stmt(*else_block, after_cond),
                    None => after_cond,
                };
                after_then && after_else
            }
            NodeKind::While { cond, body } => {
                let after_cond = self.expr(*cond, assigned);
                self.stmt(*body, after_cond);
                after_cond
            }
            NodeKind::DoWhile { body, cond } => {
                let after_body = self.stmt(*body, assigned);
                let after_cond = self.expr(*cond, after_body);
                if breaks_out(tree, *body) {
                    assigned
                } else {
                    after_cond
                }
            }
            NodeKind::For {
                init,
                cond,
                update,
                body,
            } => {
                let after_init = self.stmts(init, assigned);
                let after_cond = match cond {
                    Some(cond) => self.expr(*cond, after_init),
                    None => after_init,
                };
                let after_body = self.stmt(*body, after_cond);
                self.stmts(update, after_body);
                after_cond
            }
            NodeKind::ForEach {
                variable,
                iterable,
                body,
                ..
            } => {
                let after_iterable = self.expr(*iterable, assigned);
                if variable != self.name {
                    self.stmt(*body, after_iterable);
                }
                after_iterable
            }
            NodeKind::Try {
                body,
                catches,
                finally,
            } => {
                let mut merged = self.stmt(*body, assigned);
                for &catch in catches {
                    merged &= self.stmt(catch, assigned);
                }
                match finally {
                    Some(finally) => {
                        let after_finally = self.stmt(*finally, assigned);
                        merged || after_finally
                    }
                    None => merged,
                }
            }
            NodeKind::CatchClause { variable, body, .. } => {
                if variable == self.name {
                    assigned
                } else {
                    self.stmt(*body, assigned)
                }
            }
            NodeKind::Switch { value, sections } => {
                let after_value = self.expr(*value, assigned);
                for &section in sections {
                    self.stmt(section, after_value);
                }
                after_value
            }
            NodeKind::SwitchSection { labels, body } => {
                for &label in labels {
                    self.expr(label, assigned);
                }
                self.stmt(*body, assigned)
            }
            NodeKind::Synchronized { lock, body } => {
                let after_lock = self.expr(*lock, assigned);
                self.stmt(*body, after_lock)
            }
            NodeKind::Return { value } => {
                if let Some(value) = value {
                    self.expr(*value, assigned);
                }
                true
            }
            NodeKind::Throw { expr } => {
                self.expr(*expr, assigned);
                true
            }
            NodeKind::Break | NodeKind::Continue => true,
            NodeKind::Empty => assigned,
            // Bare expressions in statement position (for-loop init/update).
            _ => self.expr(id, assigned),
        }
    }

    fn expr(&mut self, id: NodeId, assigned: bool) -> bool {
        let tree = self.tree;
        match tree.kind(id) {
            NodeKind::Identifier { name } => {
                if name == self.name {
                    self.read(id, assigned);
                }
                assigned
            }
            NodeKind::Assignment { op, left, right } => {
                if self.is_target(*left) {
                    if *op != AssignOp::Assign {
                        self.read(*left, assigned);
                    }
                    self.expr(*right, assigned);
                    true
                } else {
                    let after_left = self.expr(*left, assigned);
                    self.expr(*right, after_left)
                }
            }
            NodeKind::Unary { op, operand } => {
                let after = self.expr(*operand, assigned);
                if op.is_increment() && self.is_target(*operand) {
                    true
                } else {
                    after
                }
            }
            NodeKind::Binary { op, left, right } if op.is_short_circuit() => {
                let after_left = self.expr(*left, assigned);
                self.expr(*right, after_left);
                after_left
            }
            NodeKind::Conditional {
                cond,
                then_value,
                else_value,
            } => {
                let after_cond = self.expr(*cond, assigned);
                let after_then = self.expr(*then_value, after_cond);
                let after_else = self.expr(*else_value, after_cond);
                after_then && after_else
            }
            _ => {
                let mut state = assigned;
                for child in tree.children(id) {
                    state = self.expr(child, state);
                }
                state
            }
        }
    }
}

/// Whether `body` contains a `break` that leaves the loop owning it.
fn breaks_out(tree: &SyntaxTree, body: NodeId) -> bool {
    let mut stack = vec![body];
    while let Some(id) = stack.pop() {
        match tree.kind(id) {
            NodeKind::Break => return true,
            // Breaks below these target the nested construct.
            kind if kind.is_loop() || matches!(kind, NodeKind::Switch { .. }) => {}
            kind => stack.extend(kind.children()),
        }
    }
    false
}
