//! Command execution functions.

mod build;

pub use build::execute_build;
