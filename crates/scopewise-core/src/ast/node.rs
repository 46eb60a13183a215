//! Node kinds of the method-body syntax tree.
//!
//! Every child link is a [`NodeId`] into the owning [`SyntaxTree`] arena.
//! Parent links live in a side table on the tree, never on the node.
//!
//! [`SyntaxTree`]: super::SyntaxTree

use crate::define_entity;

use super::ty::{AstType, Constant};

define_entity!(NodeId);
define_entity!(VariableId);
define_entity!(MemberRefId);

/// Metadata carried alongside a node and copied verbatim when a node is
/// rebuilt by a rewrite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeMeta {
    /// Variable descriptor this node binds or refers to.
    pub variable: Option<VariableId>,
    /// Member the node was decompiled from (field store, accessor call).
    pub member_reference: Option<MemberRefId>,
}

/// Assignment operators. Everything except `Assign` reads the target first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Short-circuit `&&`.
    And,
    /// Short-circuit `||`.
    Or,
}

impl BinOp {
    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

impl UnaryOp {
    /// `++`/`--` in either position: reads and writes the operand.
    pub fn is_increment(self) -> bool {
        matches!(
            self,
            UnaryOp::PreIncrement
                | UnaryOp::PreDecrement
                | UnaryOp::PostIncrement
                | UnaryOp::PostDecrement
        )
    }
}

/// Syntax node kinds. Statements first, then expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// `{ statements }`
    Block { statements: Vec<NodeId> },
    /// `[final] T a [= init], b [= init];`
    VariableDeclaration {
        ty: AstType,
        variables: Vec<NodeId>,
        is_final: bool,
    },
    /// One binding of a declaration: `name [= init]`.
    VariableInitializer { name: String, init: Option<NodeId> },
    ExpressionStatement { expr: NodeId },
    If {
        cond: NodeId,
        then_block: NodeId,
        else_block: Option<NodeId>,
    },
    While { cond: NodeId, body: NodeId },
    DoWhile { body: NodeId, cond: NodeId },
    /// `for (init; cond; update) body`. `init` holds statements, or bare
    /// assignment expressions where the decompiler emitted them directly.
    For {
        init: Vec<NodeId>,
        cond: Option<NodeId>,
        update: Vec<NodeId>,
        body: NodeId,
    },
    /// `for (T variable : iterable) body`
    ForEach {
        ty: AstType,
        variable: String,
        iterable: NodeId,
        body: NodeId,
    },
    Try {
        body: NodeId,
        catches: Vec<NodeId>,
        finally: Option<NodeId>,
    },
    /// `catch (T variable) body`
    CatchClause {
        ty: AstType,
        variable: String,
        body: NodeId,
    },
    Switch { value: NodeId, sections: Vec<NodeId> },
    /// `case labels: body`; no labels means `default:`.
    SwitchSection { labels: Vec<NodeId>, body: NodeId },
    Synchronized { lock: NodeId, body: NodeId },
    Return { value: Option<NodeId> },
    Throw { expr: NodeId },
    Break,
    Continue,
    Empty,

    Identifier { name: String },
    Literal(Constant),
    Assignment {
        op: AssignOp,
        left: NodeId,
        right: NodeId,
    },
    Binary {
        op: BinOp,
        left: NodeId,
        right: NodeId,
    },
    Unary { op: UnaryOp, operand: NodeId },
    Invocation {
        target: Option<NodeId>,
        method: String,
        args: Vec<NodeId>,
    },
    MemberReference { target: NodeId, member: String },
    Index { target: NodeId, index: NodeId },
    Conditional {
        cond: NodeId,
        then_value: NodeId,
        else_value: NodeId,
    },
    Cast { ty: AstType, expr: NodeId },
    ObjectCreation { ty: AstType, args: Vec<NodeId> },
    This,
    Super,
}

/// A borrowed child slot of a node.
pub(crate) enum Slot<'a> {
    Required(NodeId),
    Optional(Option<NodeId>),
    List(&'a [NodeId]),
}

/// A mutable child slot of a node.
pub(crate) enum SlotMut<'a> {
    Required(&'a mut NodeId),
    Optional(&'a mut Option<NodeId>),
    List(&'a mut Vec<NodeId>),
}

impl NodeKind {
    /// Child slots in source order.
    pub(crate) fn slots(&self) -> Vec<Slot<'_>> {
        use Slot::*;
        match self {
            NodeKind::Block { statements } => vec![List(statements)],
            NodeKind::VariableDeclaration { variables, .. } => vec![List(variables)],
            NodeKind::VariableInitializer { init, .. } => vec![Optional(*init)],
            NodeKind::ExpressionStatement { expr } => vec![Required(*expr)],
            NodeKind::If {
                cond,
                then_block,
                else_block,
            } => vec![Required(*cond), Required(*then_block), Optional(*else_block)],
            NodeKind::While { cond, body } => vec![Required(*cond), Required(*body)],
            NodeKind::DoWhile { body, cond } => vec![Required(*body), Required(*cond)],
            NodeKind::For {
                init,
                cond,
                update,
                body,
            } => vec![List(init), Optional(*cond), List(update), Required(*body)],
            NodeKind::ForEach { iterable, body, .. } => vec![Required(*iterable), Required(*body)],
            NodeKind::Try {
                body,
                catches,
                finally,
            } => vec![Required(*body), List(catches), Optional(*finally)],
            NodeKind::CatchClause { body, .. } => vec![Required(*body)],
            NodeKind::Switch { value, sections } => vec![Required(*value), List(sections)],
            NodeKind::SwitchSection { labels, body } => vec![List(labels), Required(*body)],
            NodeKind::Synchronized { lock, body } => vec![Required(*lock), Required(*body)],
            NodeKind::Return { value } => vec![Optional(*value)],
            NodeKind::Throw { expr } => vec![Required(*expr)],
            NodeKind::Assignment { left, right, .. } | NodeKind::Binary { left, right, .. } => {
                vec![Required(*left), Required(*right)]
            }
            NodeKind::Unary { operand, .. } => vec![Required(*operand)],
            NodeKind::Invocation { target, args, .. } => vec![Optional(*target), List(args)],
            NodeKind::MemberReference { target, .. } => vec![Required(*target)],
            NodeKind::Index { target, index } => vec![Required(*target), Required(*index)],
            NodeKind::Conditional {
                cond,
                then_value,
                else_value,
            } => vec![Required(*cond), Required(*then_value), Required(*else_value)],
            NodeKind::Cast { expr, .. } => vec![Required(*expr)],
            NodeKind::ObjectCreation { args, .. } => vec![List(args)],
            NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Empty
            | NodeKind::Identifier { .. }
            | NodeKind::Literal(_)
            | NodeKind::This
            | NodeKind::Super => Vec::new(),
        }
    }

    /// Mutable child slots, same order as [`NodeKind::slots`].
    pub(crate) fn slots_mut(&mut self) -> Vec<SlotMut<'_>> {
        use SlotMut::*;
        match self {
            NodeKind::Block { statements } => vec![List(statements)],
            NodeKind::VariableDeclaration { variables, .. } => vec![List(variables)],
            NodeKind::VariableInitializer { init, .. } => vec![Optional(init)],
            NodeKind::ExpressionStatement { expr } => vec![Required(expr)],
            NodeKind::If {
                cond,
                then_block,
                else_block,
            } => vec![Required(cond), Required(then_block), Optional(else_block)],
            NodeKind::While { cond, body } => vec![Required(cond), Required(body)],
            NodeKind::DoWhile { body, cond } => vec![Required(body), Required(cond)],
            NodeKind::For {
                init,
                cond,
                update,
                body,
            } => vec![List(init), Optional(cond), List(update), Required(body)],
            NodeKind::ForEach { iterable, body, .. } => vec![Required(iterable), Required(body)],
            NodeKind::Try {
                body,
                catches,
                finally,
            } => vec![Required(body), List(catches), Optional(finally)],
            NodeKind::CatchClause { body, .. } => vec![Required(body)],
            NodeKind::Switch { value, sections } => vec![Required(value), List(sections)],
            NodeKind::SwitchSection { labels, body } => vec![List(labels), Required(body)],
            NodeKind::Synchronized { lock, body } => vec![Required(lock), Required(body)],
            NodeKind::Return { value } => vec![Optional(value)],
            NodeKind::Throw { expr } => vec![Required(expr)],
            NodeKind::Assignment { left, right, .. } | NodeKind::Binary { left, right, .. } => {
                vec![Required(left), Required(right)]
            }
            NodeKind::Unary { operand, .. } => vec![Required(operand)],
            NodeKind::Invocation { target, args, .. } => vec![Optional(target), List(args)],
            NodeKind::MemberReference { target, .. } => vec![Required(target)],
            NodeKind::Index { target, index } => vec![Required(target), Required(index)],
            NodeKind::Conditional {
                cond,
                then_value,
                else_value,
            } => vec![Required(cond), Required(then_value), Required(else_value)],
            NodeKind::Cast { expr, .. } => vec![Required(expr)],
            NodeKind::ObjectCreation { args, .. } => vec![List(args)],
            NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Empty
            | NodeKind::Identifier { .. }
            | NodeKind::Literal(_)
            | NodeKind::This
            | NodeKind::Super => Vec::new(),
        }
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        for slot in self.slots() {
            match slot {
                Slot::Required(id) => out.push(id),
                Slot::Optional(id) => out.extend(id),
                Slot::List(ids) => out.extend_from_slice(ids),
            }
        }
        out
    }

    pub fn is_block(&self) -> bool {
        matches!(self, NodeKind::Block { .. })
    }

    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            NodeKind::For { .. }
                | NodeKind::ForEach { .. }
                | NodeKind::While { .. }
                | NodeKind::DoWhile { .. }
        )
    }

    /// Constructs whose blocks sit one level down, behind a non-block child
    /// (catch clauses under `try`, sections under `switch`).
    pub fn has_nested_blocks(&self) -> bool {
        matches!(self, NodeKind::CatchClause { .. } | NodeKind::SwitchSection { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRef;

    fn id(n: u32) -> NodeId {
        NodeId::new(n)
    }

    #[test]
    fn for_children_in_source_order() {
        let kind = NodeKind::For {
            init: vec![id(1)],
            cond: Some(id(2)),
            update: vec![id(3), id(4)],
            body: id(5),
        };
        assert_eq!(kind.children(), vec![id(1), id(2), id(3), id(4), id(5)]);
    }

    #[test]
    fn missing_optionals_are_skipped() {
        let kind = NodeKind::If {
            cond: id(1),
            then_block: id(2),
            else_block: None,
        };
        assert_eq!(kind.children(), vec![id(1), id(2)]);
        assert!(NodeKind::Return { value: None }.children().is_empty());
    }

    #[test]
    fn nested_block_holders() {
        let catch = NodeKind::CatchClause {
            ty: AstType::named("Exception"),
            variable: "e".into(),
            body: id(1),
        };
        assert!(catch.has_nested_blocks());
        assert!(!NodeKind::Block { statements: vec![] }.has_nested_blocks());
        assert!(NodeKind::DoWhile {
            body: id(1),
            cond: id(2)
        }
        .is_loop());
    }
}
