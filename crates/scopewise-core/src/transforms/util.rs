use crate::ast::{AssignOp, NodeId, NodeKind, SyntaxTree};

/// Whether `node` references `name` anywhere below it.
///
/// A `for-each` or `catch` that declares `name` itself hides the whole
/// construct: a use there belongs to that binding, not ours.
pub fn uses_variable(tree: &SyntaxTree, node: NodeId, name: &str) -> bool {
    match tree.kind(node) {
        NodeKind::Identifier { name: n } => n == name,
        NodeKind::ForEach { variable, .. } | NodeKind::CatchClause { variable, .. }
            if variable == name =>
        {
            false
        }
        kind => kind
            .children()
            .into_iter()
            .any(|child| uses_variable(tree, child, name)),
    }
}

/// Number of writes to identifier `name` in `node` and its descendants.
///
/// Every assignment operator counts, as do `++`/`--`.
pub fn assignment_count(tree: &SyntaxTree, node: NodeId, name: &str) -> usize {
    tree.descendants_and_self(node)
        .into_iter()
        .filter(|&id| match tree.kind(id) {
            NodeKind::Assignment { left, .. } => is_identifier(tree, *left, name),
            // `i++` writes `i` as surely as `i = i + 1`; a final local cannot take either.
            NodeKind::Unary { op, operand } => op.is_increment() && is_identifier(tree, *operand, name),
            _ => false,
        })
        .count()
}

pub fn is_identifier(tree: &SyntaxTree, id: NodeId, name: &str) -> bool {
    matches!(tree.kind(id), NodeKind::Identifier { name: n } if n == name)
}

/// The assignment a statement slot holds: the expression of an expression
/// statement, or a bare assignment sitting directly in a `for` header.
pub fn statement_assignment(tree: &SyntaxTree, stmt: NodeId) -> Option<NodeId> {
    let expr = match tree.kind(stmt) {
        NodeKind::ExpressionStatement { expr } => *expr,
        NodeKind::Assignment { .. } => stmt,
        _ => return None,
    };
    matches!(tree.kind(expr), NodeKind::Assignment { .. }).then_some(expr)
}

/// Target and value of `assignment` when it is exactly `name = value`.
pub fn plain_assignment_to(tree: &SyntaxTree, assignment: NodeId, name: &str) -> Option<(NodeId, NodeId)> {
    match tree.kind(assignment) {
        NodeKind::Assignment {
            op: AssignOp::Assign,
            left,
            right,
        } if is_identifier(tree, *left, name) => Some((*left, *right)),
        _ => None,
    }
}
