//! Asset parsing into detached subgraphs.
//!
//! Parsers never touch the live scene. They build through a [`NodeFactory`],
//! which the loader backs with a fresh [`Subgraph`] per request.

use glam::{Quat, Vec3};
use serde::Deserialize;

use super::platform::FileReader;
use crate::core::Error;
use crate::resource::{DeviceHandle, GpuResource, Registrar};
use crate::scene::{LocalTransform, NodeContent, Subgraph, SubgraphNodeId};

/// Node construction interface handed to parsers.
pub trait NodeFactory {
    /// Node that top-level parsed content should be attached to.
    fn root(&self) -> SubgraphNodeId;

    fn create_group(&mut self, parent: SubgraphNodeId, name: &str) -> Option<SubgraphNodeId>;

    /// Create a geometry node. `resource` is registered for activation on the
    /// render thread.
    fn create_geometry(
        &mut self,
        parent: SubgraphNodeId,
        name: &str,
        resource: Box<dyn GpuResource>,
    ) -> Option<SubgraphNodeId>;

    fn set_transform(&mut self, node: SubgraphNodeId, transform: LocalTransform) -> bool;
}

/// Parses one asset through a [`NodeFactory`].
///
/// On error the loader discards whatever was built, so parsers need not clean
/// up partial output.
pub trait AssetParser {
    fn parse(
        &mut self,
        asset: &str,
        reader: &dyn FileReader,
        factory: &mut dyn NodeFactory,
    ) -> Result<(), Error>;
}

/// [`NodeFactory`] writing into a [`Subgraph`] and registering geometry
/// resources through a [`Registrar`].
pub struct SubgraphBuilder<'a> {
    subgraph: &'a mut Subgraph,
    registrar: &'a Registrar,
}

impl<'a> SubgraphBuilder<'a> {
    pub fn new(subgraph: &'a mut Subgraph, registrar: &'a Registrar) -> Self {
        Self {
            subgraph,
            registrar,
        }
    }
}

impl NodeFactory for SubgraphBuilder<'_> {
    fn root(&self) -> SubgraphNodeId {
        self.subgraph.root()
    }

    fn create_group(&mut self, parent: SubgraphNodeId, name: &str) -> Option<SubgraphNodeId> {
        self.subgraph.add_child(parent, name, NodeContent::Group)
    }

    fn create_geometry(
        &mut self,
        parent: SubgraphNodeId,
        name: &str,
        resource: Box<dyn GpuResource>,
    ) -> Option<SubgraphNodeId> {
        // Check first so a bad parent never leaves an unowned registration.
        self.subgraph.name(parent)?;
        let resource = self.registrar.register_boxed_resource(resource);
        self.subgraph
            .add_child(parent, name, NodeContent::Geometry { resource })
    }

    fn set_transform(&mut self, node: SubgraphNodeId, transform: LocalTransform) -> bool {
        self.subgraph.set_transform(node, transform)
    }
}

/// Device-side vertex and index buffers for one mesh.
#[derive(Debug, Clone)]
pub struct GeometryResource {
    label: String,
    vertex_count: u32,
    index_count: u32,
    device: Option<DeviceHandle>,
}

impl GeometryResource {
    pub fn new(label: impl Into<String>, vertex_count: u32, index_count: u32) -> Self {
        Self {
            label: label.into(),
            vertex_count,
            index_count,
            device: None,
        }
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Device the buffers currently live on.
    pub fn device(&self) -> Option<DeviceHandle> {
        self.device
    }
}

impl GpuResource for GeometryResource {
    fn create_gpu(&mut self, device: DeviceHandle) {
        log::trace!(
            "Uploading '{}' ({} vertices, {} indices) to {device}",
            self.label,
            self.vertex_count,
            self.index_count
        );
        self.device = Some(device);
    }

    fn destroy_gpu(&mut self, device: DeviceHandle) {
        log::trace!("Releasing '{}' from {device}", self.label);
        self.device = None;
    }

    fn label(&self) -> &str {
        &self.label
    }
}

#[derive(Debug, Deserialize)]
struct SceneDescription {
    #[serde(default)]
    nodes: Vec<NodeDescription>,
}

#[derive(Debug, Deserialize)]
struct NodeDescription {
    name: String,
    #[serde(default)]
    position: Option<[f32; 3]>,
    /// Quaternion as `[x, y, z, w]`
    #[serde(default)]
    rotation: Option<[f32; 4]>,
    #[serde(default)]
    scale: Option<[f32; 3]>,
    #[serde(default)]
    geometry: Option<GeometryDescription>,
    #[serde(default)]
    children: Vec<NodeDescription>,
}

#[derive(Debug, Deserialize)]
struct GeometryDescription {
    vertices: u32,
    #[serde(default)]
    indices: u32,
}

impl NodeDescription {
    fn transform(&self) -> Option<LocalTransform> {
        if self.position.is_none() && self.rotation.is_none() && self.scale.is_none() {
            return None;
        }
        Some(LocalTransform {
            position: self.position.map(Vec3::from_array).unwrap_or(Vec3::ZERO),
            rotation: self
                .rotation
                .map(|r| Quat::from_array(r).normalize())
                .unwrap_or(Quat::IDENTITY),
            scale: self.scale.map(Vec3::from_array).unwrap_or(Vec3::ONE),
        })
    }
}

/// Parser for JSON node hierarchies:
///
/// ```json
/// { "nodes": [
///     { "name": "seat", "position": [0, 0.45, 0],
///       "geometry": { "vertices": 24, "indices": 36 },
///       "children": [] }
/// ] }
/// ```
#[derive(Debug, Default)]
pub struct JsonSceneParser;

impl JsonSceneParser {
    pub fn new() -> Self {
        Self
    }

    fn build(
        asset: &str,
        node: &NodeDescription,
        parent: SubgraphNodeId,
        factory: &mut dyn NodeFactory,
    ) -> Result<(), Error> {
        let id = match &node.geometry {
            Some(geometry) => factory.create_geometry(
                parent,
                &node.name,
                Box::new(GeometryResource::new(
                    format!("{asset}#{}", node.name),
                    geometry.vertices,
                    geometry.indices,
                )),
            ),
            None => factory.create_group(parent, &node.name),
        }
        .ok_or_else(|| Error::parse(asset, format!("factory rejected node '{}'", node.name)))?;

        if let Some(transform) = node.transform() {
            factory.set_transform(id, transform);
        }

        for child in &node.children {
            Self::build(asset, child, id, factory)?;
        }
        Ok(())
    }
}

impl AssetParser for JsonSceneParser {
    fn parse(
        &mut self,
        asset: &str,
        reader: &dyn FileReader,
        factory: &mut dyn NodeFactory,
    ) -> Result<(), Error> {
        let bytes = reader.read(asset)?;
        let description: SceneDescription =
            serde_json::from_slice(&bytes).map_err(|e| Error::parse(asset, e))?;

        let root = factory.root();
        for node in &description.nodes {
            Self::build(asset, node, root, factory)?;
        }

        log::debug!("Parsed {} top-level nodes from {asset}", description.nodes.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryReader;
    use crate::resource::Context;

    const CHAIR: &str = r#"{
        "nodes": [
            { "name": "seat", "position": [0, 0.45, 0],
              "geometry": { "vertices": 24, "indices": 36 },
              "children": [
                { "name": "cushion", "geometry": { "vertices": 8 } }
              ] },
            { "name": "legs", "children": [
                { "name": "leg0", "scale": [0.1, 1, 0.1], "geometry": { "vertices": 24, "indices": 36 } }
            ] }
        ]
    }"#;

    #[test]
    fn test_parse_chair() {
        let context = Context::new();
        let registrar = context.registrar();
        let reader = MemoryReader::new().with_asset("chair.model", CHAIR);
        let mut subgraph = Subgraph::new();

        let mut factory = SubgraphBuilder::new(&mut subgraph, &registrar);
        JsonSceneParser::new()
            .parse("chair.model", &reader, &mut factory)
            .unwrap();

        let root = subgraph.root();
        let top: Vec<_> = subgraph
            .children(root)
            .map(|id| subgraph.name(id).unwrap().to_string())
            .collect();
        assert_eq!(top, vec!["seat", "legs"]);
        assert_eq!(subgraph.len(), 6);
        assert_eq!(subgraph.resources().len(), 3);
        assert_eq!(context.pending_count(), 3);

        let seat = subgraph.children(root).next().unwrap();
        assert_eq!(
            subgraph.transform(seat).unwrap().position,
            Vec3::new(0.0, 0.45, 0.0)
        );
    }

    #[test]
    fn test_missing_asset() {
        let context = Context::new();
        let registrar = context.registrar();
        let mut subgraph = Subgraph::new();
        let mut factory = SubgraphBuilder::new(&mut subgraph, &registrar);

        let err = JsonSceneParser::new()
            .parse("missing.model", &MemoryReader::new(), &mut factory)
            .unwrap_err();
        assert!(matches!(err, Error::Asset(_)));
        assert!(subgraph.is_empty());
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let context = Context::new();
        let registrar = context.registrar();
        let reader = MemoryReader::new().with_asset("broken.model", "{ \"nodes\": [");
        let mut subgraph = Subgraph::new();
        let mut factory = SubgraphBuilder::new(&mut subgraph, &registrar);

        let err = JsonSceneParser::new()
            .parse("broken.model", &reader, &mut factory)
            .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(subgraph.is_empty());
        assert_eq!(context.pending_count(), 0);
    }

    #[test]
    fn test_geometry_resource_tracks_residency() {
        let device = DeviceHandle::new(5).unwrap();
        let mut geometry = GeometryResource::new("mesh", 3, 3);
        assert_eq!(geometry.device(), None);
        geometry.create_gpu(device);
        assert_eq!(geometry.device(), Some(device));
        geometry.destroy_gpu(device);
        assert_eq!(geometry.device(), None);
    }
}
