//! Federated operations across a collection of data nodes.
//!
//! The collection owns its nodes and fans transformations, queries and
//! training out to them without ever bypassing a node's access gate.

pub mod collection;
pub mod transformation;

pub use collection::{EvaluationSplit, FederatedCollection, NodeFailure};
pub use transformation::{FederatedTransformation, Normalize};
