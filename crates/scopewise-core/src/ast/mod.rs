//! Method-body syntax tree.
//!
//! An arena of [`Node`]s addressed by [`NodeId`], with parent links in a side
//! table and a fixed two-field metadata record per node.

mod builder;
pub mod json;
pub mod node;
pub mod tree;
pub mod ty;

pub use node::{AssignOp, BinOp, MemberRefId, NodeId, NodeKind, NodeMeta, UnaryOp, VariableId};
pub use tree::{Node, SyntaxTree};
pub use ty::{AstType, Constant, PrimitiveType};
