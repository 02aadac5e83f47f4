//! Detached scene fragments built off the render thread.
//!
//! A [`Subgraph`] has no references into the live [`SceneGraph`](super::SceneGraph).
//! It is owned by whoever builds it (normally the model loader thread) until
//! [`SceneGraph::graft`](super::SceneGraph::graft) moves its content across.

use super::node::{LocalTransform, NodeContent};
use crate::resource::ResourceHandle;

/// Index of a node inside a [`Subgraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubgraphNodeId(usize);

#[derive(Clone, Debug)]
struct SubgraphNode {
    name: String,
    children: Vec<usize>,
    transform: LocalTransform,
    content: NodeContent,
}

impl SubgraphNode {
    fn new(name: &str, content: NodeContent) -> Self {
        Self {
            name: name.to_string(),
            children: Vec::new(),
            transform: LocalTransform::identity(),
            content,
        }
    }
}

/// A scene fragment under an implicit group root.
#[derive(Clone, Debug)]
pub struct Subgraph {
    nodes: Vec<SubgraphNode>,
}

impl Default for Subgraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Subgraph {
    pub fn new() -> Self {
        Self {
            nodes: vec![SubgraphNode::new("root", NodeContent::Group)],
        }
    }

    pub fn root(&self) -> SubgraphNodeId {
        SubgraphNodeId(0)
    }

    /// Add a node under `parent`. Returns `None` if `parent` does not exist.
    pub fn add_child(
        &mut self,
        parent: SubgraphNodeId,
        name: &str,
        content: NodeContent,
    ) -> Option<SubgraphNodeId> {
        if parent.0 >= self.nodes.len() {
            return None;
        }
        let index = self.nodes.len();
        self.nodes.push(SubgraphNode::new(name, content));
        self.nodes[parent.0].children.push(index);
        Some(SubgraphNodeId(index))
    }

    pub fn set_transform(&mut self, id: SubgraphNodeId, transform: LocalTransform) -> bool {
        match self.nodes.get_mut(id.0) {
            Some(node) => {
                node.transform = transform;
                true
            }
            None => false,
        }
    }

    pub fn children(&self, id: SubgraphNodeId) -> impl Iterator<Item = SubgraphNodeId> + '_ {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(|&i| SubgraphNodeId(i))
    }

    pub fn name(&self, id: SubgraphNodeId) -> Option<&str> {
        self.nodes.get(id.0).map(|n| n.name.as_str())
    }

    pub fn transform(&self, id: SubgraphNodeId) -> Option<&LocalTransform> {
        self.nodes.get(id.0).map(|n| &n.transform)
    }

    pub fn content(&self, id: SubgraphNodeId) -> Option<&NodeContent> {
        self.nodes.get(id.0).map(|n| &n.content)
    }

    /// Node count, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the root has no children.
    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    /// Drop every node but the root.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        self.nodes[0].children.clear();
    }

    /// Resources referenced by geometry nodes, in insertion order.
    pub fn resources(&self) -> Vec<ResourceHandle> {
        self.nodes
            .iter()
            .filter_map(|n| n.content.resource())
            .collect()
    }
}
