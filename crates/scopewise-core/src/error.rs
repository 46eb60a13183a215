use crate::ast::NodeId;

/// Core error type for the scopewise passes.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The tree handed to a pass breaks one of its entry invariants.
    /// Not recoverable; the caller should abandon the method body.
    #[error("invariant violation in {block}: {message}")]
    InvariantViolation { block: NodeId, message: String },

    #[error("malformed tree: {0}")]
    Tree(String),
}
