//! Construction helpers on [`SyntaxTree`].
//!
//! Each helper allocates one node (plus any trivial leaves it needs) and
//! returns its id. Children must be built first and passed in.

use super::node::{AssignOp, BinOp, NodeId, NodeKind, NodeMeta, UnaryOp, VariableId};
use super::tree::SyntaxTree;
use super::ty::{AstType, Constant};

impl SyntaxTree {
    pub fn block(&mut self, statements: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Block { statements })
    }

    pub fn ident(&mut self, name: impl Into<String>) -> NodeId {
        self.add(NodeKind::Identifier { name: name.into() })
    }

    /// Identifier bound to a variable descriptor.
    pub fn ident_bound(&mut self, name: impl Into<String>, variable: VariableId) -> NodeId {
        self.add_with_meta(
            NodeKind::Identifier { name: name.into() },
            NodeMeta {
                variable: Some(variable),
                member_reference: None,
            },
        )
    }

    pub fn literal(&mut self, value: Constant) -> NodeId {
        self.add(NodeKind::Literal(value))
    }

    pub fn int(&mut self, n: i64) -> NodeId {
        self.literal(Constant::Int(n))
    }

    pub fn assign(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.assign_op(AssignOp::Assign, left, right)
    }

    pub fn assign_op(&mut self, op: AssignOp, left: NodeId, right: NodeId) -> NodeId {
        self.add(NodeKind::Assignment { op, left, right })
    }

    pub fn binary(&mut self, op: BinOp, left: NodeId, right: NodeId) -> NodeId {
        self.add(NodeKind::Binary { op, left, right })
    }

    pub fn unary(&mut self, op: UnaryOp, operand: NodeId) -> NodeId {
        self.add(NodeKind::Unary { op, operand })
    }

    pub fn call(&mut self, method: impl Into<String>, args: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Invocation {
            target: None,
            method: method.into(),
            args,
        })
    }

    pub fn member(&mut self, target: NodeId, member: impl Into<String>) -> NodeId {
        self.add(NodeKind::MemberReference {
            target,
            member: member.into(),
        })
    }

    pub fn expr_stmt(&mut self, expr: NodeId) -> NodeId {
        self.add(NodeKind::ExpressionStatement { expr })
    }

    /// `name = value;` as a statement.
    pub fn assign_stmt(&mut self, name: &str, value: NodeId) -> NodeId {
        let target = self.ident(name);
        let assign = self.assign(target, value);
        self.expr_stmt(assign)
    }

    /// `method(args);` as a statement.
    pub fn call_stmt(&mut self, method: &str, args: Vec<NodeId>) -> NodeId {
        let call = self.call(method, args);
        self.expr_stmt(call)
    }

    /// `T name;`
    pub fn declare(&mut self, ty: AstType, name: impl Into<String>) -> NodeId {
        self.declaration(ty, name, None, false)
    }

    /// `[final] T name [= init];` with a single binding.
    pub fn declaration(
        &mut self,
        ty: AstType,
        name: impl Into<String>,
        init: Option<NodeId>,
        is_final: bool,
    ) -> NodeId {
        let binding = self.add(NodeKind::VariableInitializer {
            name: name.into(),
            init,
        });
        self.add(NodeKind::VariableDeclaration {
            ty,
            variables: vec![binding],
            is_final,
        })
    }

    pub fn if_stmt(&mut self, cond: NodeId, then_block: NodeId, else_block: Option<NodeId>) -> NodeId {
        self.add(NodeKind::If {
            cond,
            then_block,
            else_block,
        })
    }

    pub fn while_loop(&mut self, cond: NodeId, body: NodeId) -> NodeId {
        self.add(NodeKind::While { cond, body })
    }

    pub fn do_while(&mut self, body: NodeId, cond: NodeId) -> NodeId {
        self.add(NodeKind::DoWhile { body, cond })
    }

    pub fn for_loop(
        &mut self,
        init: Vec<NodeId>,
        cond: Option<NodeId>,
        update: Vec<NodeId>,
        body: NodeId,
    ) -> NodeId {
        self.add(NodeKind::For {
            init,
            cond,
            update,
            body,
        })
    }

    pub fn for_each(
        &mut self,
        ty: AstType,
        variable: impl Into<String>,
        iterable: NodeId,
        body: NodeId,
    ) -> NodeId {
        self.add(NodeKind::ForEach {
            ty,
            variable: variable.into(),
            iterable,
            body,
        })
    }

    pub fn try_stmt(&mut self, body: NodeId, catches: Vec<NodeId>, finally: Option<NodeId>) -> NodeId {
        self.add(NodeKind::Try {
            body,
            catches,
            finally,
        })
    }

    pub fn catch_clause(&mut self, ty: AstType, variable: impl Into<String>, body: NodeId) -> NodeId {
        self.add(NodeKind::CatchClause {
            ty,
            variable: variable.into(),
            body,
        })
    }

    pub fn switch(&mut self, value: NodeId, sections: Vec<NodeId>) -> NodeId {
        self.add(NodeKind::Switch { value, sections })
    }

    pub fn switch_section(&mut self, labels: Vec<NodeId>, body: NodeId) -> NodeId {
        self.add(NodeKind::SwitchSection { labels, body })
    }

    pub fn ret(&mut self, value: Option<NodeId>) -> NodeId {
        self.add(NodeKind::Return { value })
    }

    pub fn brk(&mut self) -> NodeId {
        self.add(NodeKind::Break)
    }
}
