//! Scene graph: CPU-side hierarchy of nodes owned by the render thread.
//!
//! Content built elsewhere arrives as a detached [`Subgraph`] and is moved in
//! with [`SceneGraph::graft`].

use std::collections::{HashMap, VecDeque};

use glam::Mat4;

use super::node::{LocalTransform, NodeContent, SceneNode, SceneNodeId};
use super::subgraph::Subgraph;
use crate::resource::ResourceHandle;

/// The live scene hierarchy.
pub struct SceneGraph {
    nodes: HashMap<SceneNodeId, SceneNode>,
    root: SceneNodeId,
    next_id: u64,
    dirty: bool,
}

impl SceneGraph {
    /// Create a new scene graph with a root Group node.
    pub fn new() -> Self {
        let root_id = SceneNodeId(0);
        let root_node = SceneNode::new(root_id, "root", NodeContent::Group);

        let mut nodes = HashMap::new();
        nodes.insert(root_id, root_node);

        Self {
            nodes,
            root: root_id,
            next_id: 1,
            dirty: true,
        }
    }

    pub fn root(&self) -> SceneNodeId {
        self.root
    }

    fn alloc_id(&mut self) -> SceneNodeId {
        let id = SceneNodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add a child node under `parent`. Returns `None` if `parent` does not
    /// exist.
    pub fn add_child(
        &mut self,
        parent: SceneNodeId,
        name: impl Into<String>,
        content: NodeContent,
    ) -> Option<SceneNodeId> {
        if !self.nodes.contains_key(&parent) {
            return None;
        }

        let id = self.alloc_id();
        let mut node = SceneNode::new(id, name, content);
        node.parent = Some(parent);
        self.nodes.insert(id, node);

        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.push(id);
        }

        self.dirty = true;
        Some(id)
    }

    /// Remove a node and its entire subtree. Cannot remove the root.
    ///
    /// Returns the resources referenced by the removed geometry so the caller
    /// can release them.
    pub fn remove(&mut self, id: SceneNodeId) -> Vec<ResourceHandle> {
        if id == self.root || !self.nodes.contains_key(&id) {
            return Vec::new();
        }

        let subtree = self.subtree(id);

        if let Some(parent_id) = self.nodes.get(&id).and_then(|n| n.parent) {
            if let Some(parent) = self.nodes.get_mut(&parent_id) {
                parent.children.retain(|c| *c != id);
            }
        }

        let mut resources = Vec::new();
        for nid in subtree {
            if let Some(node) = self.nodes.remove(&nid) {
                resources.extend(node.content.resource());
            }
        }

        self.dirty = true;
        resources
    }

    /// Move a node to a new parent. Fails for the root, for missing nodes and
    /// when `new_parent` lies inside the moved subtree.
    pub fn reparent(&mut self, id: SceneNodeId, new_parent: SceneNodeId) -> bool {
        if id == self.root
            || !self.nodes.contains_key(&id)
            || !self.nodes.contains_key(&new_parent)
            || self.subtree(id).contains(&new_parent)
        {
            return false;
        }

        if let Some(old_parent_id) = self.nodes.get(&id).and_then(|n| n.parent) {
            if let Some(old_parent) = self.nodes.get_mut(&old_parent_id) {
                old_parent.children.retain(|c| *c != id);
            }
        }

        if let Some(new_parent_node) = self.nodes.get_mut(&new_parent) {
            new_parent_node.children.push(id);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = Some(new_parent);
        }

        self.dirty = true;
        true
    }

    /// Move every child of `subgraph`'s root under `target`, preserving order
    /// and transforms. Returns the ids of the new direct children of `target`.
    ///
    /// If `target` does not exist the subgraph is handed back untouched.
    pub fn graft(
        &mut self,
        target: SceneNodeId,
        subgraph: Subgraph,
    ) -> Result<Vec<SceneNodeId>, Subgraph> {
        if !self.nodes.contains_key(&target) {
            return Err(subgraph);
        }

        let mut grafted = Vec::new();
        let mut queue: VecDeque<_> = subgraph
            .children(subgraph.root())
            .map(|child| (child, target))
            .collect();

        while let Some((source, parent)) = queue.pop_front() {
            let name = subgraph.name(source).unwrap_or_default().to_string();
            let content = subgraph
                .content(source)
                .cloned()
                .unwrap_or(NodeContent::Group);

            let Some(id) = self.add_child(parent, name, content) else {
                continue;
            };
            if let Some(transform) = subgraph.transform(source) {
                self.set_transform(id, transform.clone());
            }
            if parent == target {
                grafted.push(id);
            }

            queue.extend(subgraph.children(source).map(|child| (child, id)));
        }

        Ok(grafted)
    }

    pub fn set_transform(&mut self, id: SceneNodeId, transform: LocalTransform) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.local_transform = transform;
            self.dirty = true;
        }
    }

    pub fn get(&self, id: SceneNodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: SceneNodeId) -> Option<&mut SceneNode> {
        self.dirty = true;
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: SceneNodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn children(&self, id: SceneNodeId) -> impl Iterator<Item = SceneNodeId> + '_ {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .copied()
    }

    /// First node named `name`, breadth first from the root.
    pub fn find(&self, name: &str) -> Option<SceneNodeId> {
        self.subtree(self.root)
            .into_iter()
            .find(|id| self.nodes.get(id).is_some_and(|n| n.name == name))
    }

    /// Every resource referenced by geometry in the graph.
    pub fn resources(&self) -> Vec<ResourceHandle> {
        self.subtree(self.root)
            .into_iter()
            .filter_map(|id| self.nodes.get(&id).and_then(|n| n.content.resource()))
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether transforms changed since the last propagation.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Propagate world transforms from the root downward if anything changed.
    pub fn update_world_transforms(&mut self) {
        if !self.dirty {
            return;
        }
        self.propagate_transforms(self.root, Mat4::IDENTITY);
        self.dirty = false;
    }

    /// `id` followed by all its descendants, breadth first.
    fn subtree(&self, id: SceneNodeId) -> Vec<SceneNodeId> {
        let mut out = vec![id];
        let mut i = 0;
        while i < out.len() {
            if let Some(node) = self.nodes.get(&out[i]) {
                out.extend_from_slice(&node.children);
            }
            i += 1;
        }
        out
    }

    fn propagate_transforms(&mut self, node_id: SceneNodeId, parent_world: Mat4) {
        let Some(node) = self.nodes.get_mut(&node_id) else {
            return;
        };
        let world = parent_world * node.local_transform.to_mat4();
        node.world_transform = world;
        let children = node.children.clone();

        for child_id in children {
            self.propagate_transforms(child_id, world);
        }
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Context, DeviceHandle, GpuResource};
    use glam::Vec3;

    struct Nop;

    impl GpuResource for Nop {
        fn create_gpu(&mut self, _device: DeviceHandle) {}
        fn destroy_gpu(&mut self, _device: DeviceHandle) {}
    }

    fn group(graph: &mut SceneGraph, parent: SceneNodeId, name: &str) -> SceneNodeId {
        graph.add_child(parent, name, NodeContent::Group).unwrap()
    }

    #[test]
    fn test_new_scene_graph() {
        let graph = SceneGraph::new();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.get(graph.root()).unwrap().name, "root");
    }

    #[test]
    fn test_add_child_to_missing_parent() {
        let mut graph = SceneGraph::new();
        assert_eq!(graph.add_child(SceneNodeId(42), "orphan", NodeContent::Group), None);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_remove_subtree_returns_resources() {
        let context = Context::new();
        let registrar = context.registrar();
        let mut graph = SceneGraph::new();
        let root = graph.root();

        let parent = group(&mut graph, root, "parent");
        let resource = registrar.register_resource(Nop);
        let mesh = graph
            .add_child(parent, "mesh", NodeContent::Geometry { resource })
            .unwrap();
        group(&mut graph, mesh, "socket");

        let released = graph.remove(parent);
        assert_eq!(released, vec![resource]);
        assert_eq!(graph.node_count(), 1);
        assert!(!graph.contains(mesh));
        assert_eq!(graph.children(root).count(), 0);
    }

    #[test]
    fn test_cannot_remove_root() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        assert!(graph.remove(root).is_empty());
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_reparent() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let a = group(&mut graph, root, "a");
        let b = group(&mut graph, root, "b");
        let c = group(&mut graph, a, "c");

        assert!(graph.reparent(c, b));
        assert_eq!(graph.children(a).count(), 0);
        assert_eq!(graph.get(c).unwrap().parent, Some(b));

        // Would create a cycle.
        assert!(!graph.reparent(b, c));
        assert!(!graph.reparent(root, a));
    }

    #[test]
    fn test_transform_propagation() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        let parent = group(&mut graph, root, "parent");
        graph.set_transform(parent, LocalTransform::from_position(Vec3::new(10.0, 0.0, 0.0)));
        let child = group(&mut graph, parent, "child");
        graph.set_transform(child, LocalTransform::from_position(Vec3::new(5.0, 0.0, 0.0)));

        assert!(graph.is_dirty());
        graph.update_world_transforms();
        assert!(!graph.is_dirty());

        let world = graph.get(child).unwrap().world_transform;
        let p = world.transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(15.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_graft_moves_children_in_order() {
        let mut sub = Subgraph::new();
        let sub_root = sub.root();
        let seat = sub.add_child(sub_root, "seat", NodeContent::Group).unwrap();
        sub.set_transform(seat, LocalTransform::from_position(Vec3::Y));
        sub.add_child(seat, "cushion", NodeContent::Group);
        sub.add_child(sub_root, "back", NodeContent::Group);

        let mut graph = SceneGraph::new();
        let root = graph.root();
        let target = group(&mut graph, root, "G");

        let grafted = graph.graft(target, sub).unwrap();
        assert_eq!(grafted.len(), 2);
        let names: Vec<_> = graph
            .children(target)
            .map(|id| graph.get(id).unwrap().name.clone())
            .collect();
        assert_eq!(names, vec!["seat", "back"]);

        let seat_id = graph.find("seat").unwrap();
        assert_eq!(graph.get(seat_id).unwrap().local_transform.position, Vec3::Y);
        let cushion = graph.find("cushion").unwrap();
        assert_eq!(graph.get(cushion).unwrap().parent, Some(seat_id));
        assert_eq!(graph.node_count(), 5);
    }

    #[test]
    fn test_graft_into_missing_target_returns_subgraph() {
        let mut sub = Subgraph::new();
        let sub_root = sub.root();
        sub.add_child(sub_root, "orphan", NodeContent::Group);

        let mut graph = SceneGraph::new();
        let returned = graph.graft(SceneNodeId(77), sub).unwrap_err();
        assert_eq!(returned.len(), 2);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_graft_empty_subgraph_is_noop() {
        let mut graph = SceneGraph::new();
        let root = graph.root();
        assert!(graph.graft(root, Subgraph::new()).unwrap().is_empty());
        assert_eq!(graph.node_count(), 1);
    }
}
