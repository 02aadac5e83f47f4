//! CPU-side scene hierarchy and detached subgraphs

pub mod graph;
pub mod node;
pub mod subgraph;

pub use graph::SceneGraph;
pub use node::{LocalTransform, NodeContent, SceneNode, SceneNodeId};
pub use subgraph::{Subgraph, SubgraphNodeId};
