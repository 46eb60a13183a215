use tracing::debug;

use crate::ast::{NodeId, SyntaxTree};
use crate::error::CoreError;

/// A pass that rewrites a method body in place.
pub trait AstTransform {
    /// Name of this pass, as accepted by `PassConfig::from_skip_list`.
    fn name(&self) -> &str;

    /// Rewrite the body rooted at `root`.
    fn run(&mut self, tree: &mut SyntaxTree, root: NodeId) -> Result<(), CoreError>;
}

/// An ordered sequence of passes to run over one method body.
pub struct TransformPipeline {
    transforms: Vec<Box<dyn AstTransform>>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
        }
    }

    pub fn add(&mut self, transform: Box<dyn AstTransform>) {
        self.transforms.push(transform);
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    /// Run all passes in order, stopping at the first failure.
    pub fn run(&mut self, tree: &mut SyntaxTree, root: NodeId) -> Result<(), CoreError> {
        for transform in &mut self.transforms {
            debug!(pass = transform.name(), %root, "running pass");
            transform.run(tree, root)?;
        }
        Ok(())
    }
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self::new()
    }
}
