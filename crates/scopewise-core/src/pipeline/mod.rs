pub mod config;
pub mod transform;

pub use config::PassConfig;
pub use transform::{AstTransform, TransformPipeline};
