//! The chunk graph.
//!
//! Nodes are stored in an arena and referred to by [`NodeId`]. Chunks hold
//! the ids of their two children, so a node may be shared by many chunks
//! without reference cycles.

pub mod distribution;
pub mod generalize;
pub mod model;
pub mod node;
pub mod params;
pub mod tree;

pub use distribution::{DistributionKind, EdgeSource};
pub use model::Graph;
pub use node::{Node, NodeId, Role};
pub use params::{EdgeKinds, Generalize, InitialAssociation, Params};
pub use tree::Tree;
