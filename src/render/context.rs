//! Per-frame driver tying the resource context, the synchronization barrier
//! and the live scene together on the render thread.

use std::sync::Arc;

use crate::resource::{Context, DeviceQuery, Registrar, ResourceHandle};
use crate::scene::{SceneGraph, SceneNodeId};
use crate::sync::SyncBarrier;

/// Render-thread state. Everything here is touched only by the render thread;
/// other threads go through the [`Registrar`] or the barrier, whose observers
/// receive the whole `RenderContext`.
pub struct RenderContext {
    context: Context,
    synchronizer: Arc<SyncBarrier<RenderContext>>,
    scene: SceneGraph,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new(Context::new())
    }
}

impl RenderContext {
    pub fn new(context: Context) -> Self {
        Self {
            context,
            synchronizer: Arc::new(SyncBarrier::new()),
            scene: SceneGraph::new(),
        }
    }

    /// One frame: tick the resource context, service any pending
    /// synchronization request, then refresh world transforms.
    ///
    /// Returns the number of resources activated by the tick.
    pub fn update(&mut self) -> usize {
        let promoted = self.context.tick();
        self.service_synchronize();
        self.scene.update_world_transforms();
        promoted
    }

    /// Run a barrier pass against this context if one was requested.
    pub fn service_synchronize(&mut self) -> bool {
        let synchronizer = self.synchronizer.clone();
        synchronizer.service_pending(self)
    }

    pub fn attach_to_device(&mut self, query: &dyn DeviceQuery) -> bool {
        self.context.attach_to_device(query)
    }

    pub fn detach_from_device(&mut self, query: &dyn DeviceQuery) -> usize {
        self.context.detach_from_device(query)
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    /// Remove a scene subtree and destroy the resources its geometry owned.
    pub fn remove_node(&mut self, node: SceneNodeId) -> usize {
        let resources = self.scene.remove(node);
        self.destroy_resources(resources)
    }

    /// Unregister resources that never made it into the scene, running destroy
    /// hooks for those already active. Returns how many were still registered.
    pub fn destroy_resources(
        &mut self,
        resources: impl IntoIterator<Item = ResourceHandle>,
    ) -> usize {
        resources
            .into_iter()
            .filter(|&handle| self.context.destroy_resource(handle))
            .count()
    }

    pub fn synchronizer(&self) -> Arc<SyncBarrier<RenderContext>> {
        self.synchronizer.clone()
    }

    pub fn registrar(&self) -> Registrar {
        self.context.registrar()
    }
}
