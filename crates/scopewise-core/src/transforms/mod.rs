pub mod declare_variables;
pub mod util;
pub mod variable_edits;

pub use declare_variables::{
    check_declarations, find_declaration_point, find_declaration_point_for, DeclarationSearch,
    DeclareOptions, DeclareVariables,
};
pub use variable_edits::{DeclarationSite, EditQueue, EditStats, VariableToDeclare};

use crate::pipeline::{PassConfig, TransformPipeline};

/// Build a transform pipeline based on the given pass configuration.
pub fn default_pipeline(config: &PassConfig) -> TransformPipeline {
    let mut pipeline = TransformPipeline::new();
    if config.declare_variables {
        pipeline.add(Box::new(DeclareVariables::new(DeclareOptions::from(config))));
    }
    pipeline
}
