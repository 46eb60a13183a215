//! Nested JSON form of a method body.
//!
//! The arena is convenient for rewriting but awkward to write by hand, so
//! tools exchange bodies as plain nested objects tagged by `"kind"`:
//!
//! ```json
//! { "kind": "block", "statements": [
//!     { "kind": "variable_declaration", "type": { "primitive": "int" },
//!       "variables": [{ "kind": "variable_initializer", "name": "v", "variable": 0 }] },
//!     { "kind": "expression_statement", "expr": {
//!         "kind": "assignment", "op": "assign",
//!         "left": { "kind": "identifier", "name": "v" },
//!         "right": { "kind": "literal", "value": { "int": 1 } } } }
//! ] }
//! ```

use serde::{Deserialize, Serialize};

use crate::entity::EntityRef;

use super::node::{AssignOp, BinOp, MemberRefId, NodeId, NodeKind, NodeMeta, UnaryOp, VariableId};
use super::tree::SyntaxTree;
use super::ty::{AstType, Constant};

/// One node with its optional metadata ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonNode {
    #[serde(flatten)]
    pub kind: JsonKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_reference: Option<u32>,
}

fn assign_op_default() -> AssignOp {
    AssignOp::Assign
}

type Child = Box<JsonNode>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JsonKind {
    Block {
        statements: Vec<JsonNode>,
    },
    VariableDeclaration {
        #[serde(rename = "type")]
        ty: AstType,
        variables: Vec<JsonNode>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_final: bool,
    },
    VariableInitializer {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        init: Option<Child>,
    },
    ExpressionStatement {
        expr: Child,
    },
    If {
        cond: Child,
        then_block: Child,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        else_block: Option<Child>,
    },
    While {
        cond: Child,
        body: Child,
    },
    DoWhile {
        body: Child,
        cond: Child,
    },
    For {
        #[serde(default)]
        init: Vec<JsonNode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cond: Option<Child>,
        #[serde(default)]
        update: Vec<JsonNode>,
        body: Child,
    },
    ForEach {
        #[serde(rename = "type")]
        ty: AstType,
        variable: String,
        iterable: Child,
        body: Child,
    },
    Try {
        body: Child,
        #[serde(default)]
        catches: Vec<JsonNode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        finally: Option<Child>,
    },
    CatchClause {
        #[serde(rename = "type")]
        ty: AstType,
        variable: String,
        body: Child,
    },
    Switch {
        value: Child,
        sections: Vec<JsonNode>,
    },
    SwitchSection {
        #[serde(default)]
        labels: Vec<JsonNode>,
        body: Child,
    },
    Synchronized {
        lock: Child,
        body: Child,
    },
    Return {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Child>,
    },
    Throw {
        expr: Child,
    },
    Break,
    Continue,
    Empty,
    Identifier {
        name: String,
    },
    Literal {
        value: Constant,
    },
    Assignment {
        #[serde(default = "assign_op_default")]
        op: AssignOp,
        left: Child,
        right: Child,
    },
    Binary {
        op: BinOp,
        left: Child,
        right: Child,
    },
    Unary {
        op: UnaryOp,
        operand: Child,
    },
    Invocation {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<Child>,
        method: String,
        #[serde(default)]
        args: Vec<JsonNode>,
    },
    MemberReference {
        target: Child,
        member: String,
    },
    Index {
        target: Child,
        index: Child,
    },
    Conditional {
        cond: Child,
        then_value: Child,
        else_value: Child,
    },
    Cast {
        #[serde(rename = "type")]
        ty: AstType,
        expr: Child,
    },
    ObjectCreation {
        #[serde(rename = "type")]
        ty: AstType,
        #[serde(default)]
        args: Vec<JsonNode>,
    },
    This,
    Super,
}

impl From<JsonKind> for JsonNode {
    fn from(kind: JsonKind) -> Self {
        JsonNode {
            kind,
            variable: None,
            member_reference: None,
        }
    }
}

/// Build a fresh tree from a JSON body. Returns the tree and its root.
pub fn lower_body(root: &JsonNode) -> (SyntaxTree, NodeId) {
    let mut tree = SyntaxTree::new();
    let id = lower(&mut tree, root);
    (tree, id)
}

/// Lower a JSON node (and everything below it) into `tree`.
pub fn lower(tree: &mut SyntaxTree, node: &JsonNode) -> NodeId {
    let many = |tree: &mut SyntaxTree, nodes: &[JsonNode]| -> Vec<NodeId> {
        nodes.iter().map(|n| lower(tree, n)).collect()
    };
    let kind = match &node.kind {
        JsonKind::Block { statements } => NodeKind::Block {
            statements: many(tree, statements),
        },
        JsonKind::VariableDeclaration {
            ty,
            variables,
            is_final,
        } => NodeKind::VariableDeclaration {
            ty: ty.clone(),
            variables: many(tree, variables),
            is_final: *is_final,
        },
        JsonKind::VariableInitializer { name, init } => NodeKind::VariableInitializer {
            name: name.clone(),
            init: init.as_deref().map(|n| lower(tree, n)),
        },
        JsonKind::ExpressionStatement { expr } => NodeKind::ExpressionStatement {
            expr: lower(tree, expr),
        },
        JsonKind::If {
            cond,
            then_block,
            else_block,
        } => NodeKind::If {
            cond: lower(tree, cond),
            then_block: lower(tree, then_block),
            else_block: else_block.as_deref().map(|n| lower(tree, n)),
        },
        JsonKind::While { cond, body } => NodeKind::While {
            cond: lower(tree, cond),
            body: lower(tree, body),
        },
        JsonKind::DoWhile { body, cond } => NodeKind::DoWhile {
            body: lower(tree, body),
            cond: lower(tree, cond),
        },
        JsonKind::For {
            init,
            cond,
            update,
            body,
        } => NodeKind::For {
            init: many(tree, init),
            cond: cond.as_deref().map(|n| lower(tree, n)),
            update: many(tree, update),
            body: lower(tree, body),
        },
        JsonKind::ForEach {
            ty,
            variable,
            iterable,
            body,
        } => NodeKind::ForEach {
            ty: ty.clone(),
            variable: variable.clone(),
            iterable: lower(tree, iterable),
            body: lower(tree, body),
        },
        JsonKind::Try {
            body,
            catches,
            finally,
        } => NodeKind::Try {
            body: lower(tree, body),
            catches: many(tree, catches),
            finally: finally.as_deref().map(|n| lower(tree, n)),
        },
        JsonKind::CatchClause { ty, variable, body } => NodeKind::CatchClause {
            ty: ty.clone(),
            variable: variable.clone(),
            body: lower(tree, body),
        },
        JsonKind::Switch { value, sections } => NodeKind::Switch {
            value: lower(tree, value),
            sections: many(tree, sections),
        },
        JsonKind::SwitchSection { labels, body } => NodeKind::SwitchSection {
            labels: many(tree, labels),
            body: lower(tree, body),
        },
        JsonKind::Synchronized { lock, body } => NodeKind::Synchronized {
            lock: lower(tree, lock),
            body: lower(tree, body),
        },
        JsonKind::Return { value } => NodeKind::Return {
            value: value.as_deref().map(|n| lower(tree, n)),
        },
        JsonKind::Throw { expr } => NodeKind::Throw {
            expr: lower(tree, expr),
        },
        JsonKind::Break => NodeKind::Break,
        JsonKind::Continue => NodeKind::Continue,
        JsonKind::Empty => NodeKind::Empty,
        JsonKind::Identifier { name } => NodeKind::Identifier { name: name.clone() },
        JsonKind::Literal { value } => NodeKind::Literal(value.clone()),
        JsonKind::Assignment { op, left, right } => NodeKind::Assignment {
            op: *op,
            left: lower(tree, left),
            right: lower(tree, right),
        },
        JsonKind::Binary { op, left, right } => NodeKind::Binary {
            op: *op,
            left: lower(tree, left),
            right: lower(tree, right),
        },
        JsonKind::Unary { op, operand } => NodeKind::Unary {
            op: *op,
            operand: lower(tree, operand),
        },
        JsonKind::Invocation {
            target,
            method,
            args,
        } => NodeKind::Invocation {
            target: target.as_deref().map(|n| lower(tree, n)),
            method: method.clone(),
            args: many(tree, args),
        },
        JsonKind::MemberReference { target, member } => NodeKind::MemberReference {
            target: lower(tree, target),
            member: member.clone(),
        },
        JsonKind::Index { target, index } => NodeKind::Index {
            target: lower(tree, target),
            index: lower(tree, index),
        },
        JsonKind::Conditional {
            cond,
            then_value,
            else_value,
        } => NodeKind::Conditional {
            cond: lower(tree, cond),
            then_value: lower(tree, then_value),
            else_value: lower(tree, else_value),
        },
        JsonKind::Cast { ty, expr } => NodeKind::Cast {
            ty: ty.clone(),
            expr: lower(tree, expr),
        },
        JsonKind::ObjectCreation { ty, args } => NodeKind::ObjectCreation {
            ty: ty.clone(),
            args: many(tree, args),
        },
        JsonKind::This => NodeKind::This,
        JsonKind::Super => NodeKind::Super,
    };
    let meta = NodeMeta {
        variable: node.variable.map(VariableId::new),
        member_reference: node.member_reference.map(MemberRefId::new),
    };
    tree.add_with_meta(kind, meta)
}

/// Convert the subtree at `id` back to its JSON form.
pub fn raise(tree: &SyntaxTree, id: NodeId) -> JsonNode {
    let one = |id: NodeId| Box::new(raise(tree, id));
    let opt = |id: Option<NodeId>| id.map(|id| Box::new(raise(tree, id)));
    let many = |ids: &[NodeId]| ids.iter().map(|&id| raise(tree, id)).collect::<Vec<_>>();
    let kind = match tree.kind(id) {
        NodeKind::Block { statements } => JsonKind::Block {
            statements: many(statements),
        },
        NodeKind::VariableDeclaration {
            ty,
            variables,
            is_final,
        } => JsonKind::VariableDeclaration {
            ty: ty.clone(),
            variables: many(variables),
            is_final: *is_final,
        },
        NodeKind::VariableInitializer { name, init } => JsonKind::VariableInitializer {
            name: name.clone(),
            init: opt(*init),
        },
        NodeKind::ExpressionStatement { expr } => JsonKind::ExpressionStatement { expr: one(*expr) },
        NodeKind::If {
            cond,
            then_block,
            else_block,
        } => JsonKind::If {
            cond: one(*cond),
            then_block: one(*then_block),
            else_block: opt(*else_block),
        },
        NodeKind::While { cond, body } => JsonKind::While {
            cond: one(*cond),
            body: one(*body),
        },
        NodeKind::DoWhile { body, cond } => JsonKind::DoWhile {
            body: one(*body),
            cond: one(*cond),
        },
        NodeKind::For {
            init,
            cond,
            update,
            body,
        } => JsonKind::For {
            init: many(init),
            cond: opt(*cond),
            update: many(update),
            body: one(*body),
        },
        NodeKind::ForEach {
            ty,
            variable,
            iterable,
            body,
        } => JsonKind::ForEach {
            ty: ty.clone(),
            variable: variable.clone(),
            iterable: one(*iterable),
            body: one(*body),
        },
        NodeKind::Try {
            body,
            catches,
            finally,
        } => JsonKind::Try {
            body: one(*body),
            catches: many(catches),
            finally: opt(*finally),
        },
        NodeKind::CatchClause { ty, variable, body } => JsonKind::CatchClause {
            ty: ty.clone(),
            variable: variable.clone(),
            body: one(*body),
        },
        NodeKind::Switch { value, sections } => JsonKind::Switch {
            value: one(*value),
            sections: many(sections),
        },
        NodeKind::SwitchSection { labels, body } => JsonKind::SwitchSection {
            labels: many(labels),
            body: one(*body),
        },
        NodeKind::Synchronized { lock, body } => JsonKind::Synchronized {
            lock: one(*lock),
            body: one(*body),
        },
        NodeKind::Return { value } => JsonKind::Return { value: opt(*value) },
        NodeKind::Throw { expr } => JsonKind::Throw { expr: one(*expr) },
        NodeKind::Break => JsonKind::Break,
        NodeKind::Continue => JsonKind::Continue,
        NodeKind::Empty => JsonKind::Empty,
        NodeKind::Identifier { name } => JsonKind::Identifier { name: name.clone() },
        NodeKind::Literal(value) => JsonKind::Literal {
            value: value.clone(),
        },
        NodeKind::Assignment { op, left, right } => JsonKind::Assignment {
            op: *op,
            left: one(*left),
            right: one(*right),
        },
        NodeKind::Binary { op, left, right } => JsonKind::Binary {
            op: *op,
            left: one(*left),
            right: one(*right),
        },
        NodeKind::Unary { op, operand } => JsonKind::Unary {
            op: *op,
            operand: one(*operand),
        },
        NodeKind::Invocation {
            target,
            method,
            args,
        } => JsonKind::Invocation {
            target: opt(*target),
            method: method.clone(),
            args: many(args),
        },
        NodeKind::MemberReference { target, member } => JsonKind::MemberReference {
            target: one(*target),
            member: member.clone(),
        },
        NodeKind::Index { target, index } => JsonKind::Index {
            target: one(*target),
            index: one(*index),
        },
        NodeKind::Conditional {
            cond,
            then_value,
            else_value,
        } => JsonKind::Conditional {
            cond: one(*cond),
            then_value: one(*then_value),
            else_value: one(*else_value),
        },
        NodeKind::Cast { ty, expr } => JsonKind::Cast {
            ty: ty.clone(),
            expr: one(*expr),
        },
        NodeKind::ObjectCreation { ty, args } => JsonKind::ObjectCreation {
            ty: ty.clone(),
            args: many(args),
        },
        NodeKind::This => JsonKind::This,
        NodeKind::Super => JsonKind::Super,
    };
    let meta = tree.meta(id);
    JsonNode {
        kind,
        variable: meta.variable.map(EntityRef::index),
        member_reference: meta.member_reference.map(EntityRef::index),
    }
}
