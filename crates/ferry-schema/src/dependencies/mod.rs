//! Table dependency analysis
//!
//! Builds the foreign-key dependency graph, flags circular reference chains
//! and assigns depth levels.

mod graph;

#[cfg(test)]
mod tests;

pub use graph::{DependencyGraph, DependencyNode};
