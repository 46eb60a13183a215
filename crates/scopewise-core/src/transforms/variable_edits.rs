//! Deferred declaration edits.
//!
//! The placement walk only records what it wants; nothing is inserted or
//! replaced until the whole tree has been visited, so node ids recorded as
//! anchors stay valid for the duration of the walk.

use tracing::{debug, warn};

use crate::ast::{AstType, NodeId, NodeKind, NodeMeta, SyntaxTree, VariableId};
use crate::error::CoreError;

use super::util::assignment_count;

/// Where a new declaration goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationSite {
    /// Uninitialized declaration immediately before this statement.
    InsertBefore(NodeId),
    /// Declaration initialized with this assignment's right side, taking
    /// the place of the assignment (or of its expression statement).
    ReplaceAssignment(NodeId),
}

/// One declaration to emit.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableToDeclare {
    pub ty: AstType,
    pub name: String,
    pub variable: Option<VariableId>,
    pub site: DeclarationSite,
}

/// What [`EditQueue::apply`] did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EditStats {
    pub inserted: usize,
    pub folded: usize,
    /// Records whose anchor or assignment was no longer attached.
    pub skipped: usize,
}

#[derive(Debug, Default)]
pub struct EditQueue {
    pending: Vec<VariableToDeclare>,
}

impl EditQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, edit: VariableToDeclare) {
        self.pending.push(edit);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Apply every recorded edit and empty the queue.
    ///
    /// All insertions run before any replacement, across the whole queue.
    /// With `mark_final` off no declaration is marked final.
    pub fn apply(&mut self, tree: &mut SyntaxTree, mark_final: bool) -> Result<EditStats, CoreError> {
        let pending = std::mem::take(&mut self.pending);
        let mut stats = EditStats::default();

        for edit in &pending {
            if let DeclarationSite::InsertBefore(anchor) = edit.site {
                if insert_declaration(tree, edit, anchor, mark_final)? {
                    stats.inserted += 1;
                } else {
                    stats.skipped += 1;
                }
            }
        }

        for edit in &pending {
            if let DeclarationSite::ReplaceAssignment(assignment) = edit.site {
                if replace_assignment(tree, edit, assignment, mark_final)? {
                    stats.folded += 1;
                } else {
                    stats.skipped += 1;
                }
            }
        }

        debug!(
            inserted = stats.inserted,
            folded = stats.folded,
            skipped = stats.skipped,
            "applied declaration edits"
        );
        Ok(stats)
    }
}

fn insert_declaration(
    tree: &mut SyntaxTree,
    edit: &VariableToDeclare,
    anchor: NodeId,
    mark_final: bool,
) -> Result<bool, CoreError> {
    let Some(block) = tree.parent(anchor) else {
        warn!(variable = %edit.name, %anchor, "insertion anchor is detached");
        return Ok(false);
    };
    let is_final = mark_final && assignment_count(tree, block, &edit.name) == 1;

    let binding = tree.add_with_meta(
        NodeKind::VariableInitializer {
            name: edit.name.clone(),
            init: None,
        },
        NodeMeta {
            variable: edit.variable,
            member_reference: None,
        },
    );
    let declaration = tree.add(NodeKind::VariableDeclaration {
        ty: edit.ty.clone(),
        variables: vec![binding],
        is_final,
    });
    tree.insert_before(anchor, declaration)?;
    debug!(variable = %edit.name, %anchor, is_final, "declared before first use");
    Ok(true)
}

fn replace_assignment(
    tree: &mut SyntaxTree,
    edit: &VariableToDeclare,
    assignment: NodeId,
    mark_final: bool,
) -> Result<bool, CoreError> {
    let NodeKind::Assignment { right, .. } = *tree.kind(assignment) else {
        return Err(CoreError::Tree(format!("{assignment} is not an assignment")));
    };
    let Some(parent) = tree.parent(assignment) else {
        warn!(variable = %edit.name, %assignment, "folded assignment is detached");
        return Ok(false);
    };
    // Statement-level assignment: the expression statement is what goes.
    let statement_scope = match tree.kind(parent) {
        NodeKind::ExpressionStatement { .. } => match tree.parent(parent) {
            Some(scope) => Some(scope),
            None => {
                warn!(variable = %edit.name, statement = %parent, "folded statement is detached");
                return Ok(false);
            }
        },
        _ => None,
    };

    let member_reference = tree.meta(assignment).member_reference;
    tree.remove(right)?;
    *tree.meta_mut(right) = NodeMeta {
        variable: edit.variable,
        member_reference,
    };

    let (replaced, count_scope, meta) = match statement_scope {
        Some(scope) => (parent, scope, *tree.meta(parent)),
        None => (assignment, parent, NodeMeta::default()),
    };
    let is_final = mark_final && assignment_count(tree, count_scope, &edit.name) == 1;

    let binding = tree.add(NodeKind::VariableInitializer {
        name: edit.name.clone(),
        init: Some(right),
    });
    let declaration = tree.add_with_meta(
        NodeKind::VariableDeclaration {
            ty: edit.ty.clone(),
            variables: vec![binding],
            is_final,
        },
        meta,
    );
    tree.replace(replaced, declaration)?;
    debug!(variable = %edit.name, %assignment, is_final, "folded into initializer");
    Ok(true)
}
