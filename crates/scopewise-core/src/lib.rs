//! Local variable declaration placement for decompiled method bodies.
//!
//! A method body arrives as a [`ast::SyntaxTree`] with every local declared
//! uninitialized at the top of its block. [`transforms::DeclareVariables`]
//! moves each declaration to the narrowest scope that covers its uses, with
//! [`analysis::FlowAnalysis`] deciding when that is safe.

pub mod analysis;
pub mod ast;
pub mod entity;
pub mod error;
pub mod pipeline;
pub mod transforms;

pub use error::CoreError;
