pub mod definite_assignment;

pub use definite_assignment::{DefiniteAssignment, FlowAnalysis};
