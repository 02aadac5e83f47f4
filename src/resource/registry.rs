//! Thread-safe registration of GPU-owning and per-frame objects.
//!
//! Resources registered from any thread land on the *pending* list. Only the
//! render thread promotes them: pending is spliced into a private staging list,
//! staging is walked calling each create hook, and staging is then spliced onto
//! the tail of the *active* list. Anything registered while that walk runs
//! lands on the (now empty) pending list and waits for the next tick.

use std::sync::{Arc, Mutex};

use super::device::DeviceHandle;
use super::list::{ListId, NodeArena, NodeHandle};
use crate::sync::lock;

/// An object that owns device-side resources.
///
/// Hooks are only ever called on the render thread, with the device context
/// current.
pub trait GpuResource: Send {
    /// (Re)create device objects. Called once on activation and again after
    /// every attach, so implementations must not assume prior state survived.
    fn create_gpu(&mut self, device: DeviceHandle);

    /// Release device objects before the context goes away.
    fn destroy_gpu(&mut self, device: DeviceHandle);

    fn label(&self) -> &str {
        "resource"
    }
}

/// Per-frame information passed to [`Updatable`] objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameInfo {
    /// Tick counter, starting at 1 for the first tick
    pub frame: u64,
    /// Device attached when the tick ran, if any
    pub device: Option<DeviceHandle>,
}

/// An object updated once per tick on the render thread.
pub trait Updatable: Send {
    fn update(&mut self, frame: &FrameInfo);
}

/// Owner's handle to a registered [`GpuResource`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceHandle(NodeHandle);

/// Owner's handle to a registered [`Updatable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UpdatableHandle(NodeHandle);

pub(crate) struct Registry {
    resources: Mutex<NodeArena<Box<dyn GpuResource>>>,
    pending: ListId,
    staging: ListId,
    active: ListId,
    updatables: Mutex<NodeArena<Box<dyn Updatable>>>,
    updatable_list: ListId,
}

impl Registry {
    pub(crate) fn new() -> Self {
        let mut resources = NodeArena::new();
        let pending = resources.new_list();
        let staging = resources.new_list();
        let active = resources.new_list();

        let mut updatables = NodeArena::new();
        let updatable_list = updatables.new_list();

        Self {
            resources: Mutex::new(resources),
            pending,
            staging,
            active,
            updatables: Mutex::new(updatables),
            updatable_list,
        }
    }

    pub(crate) fn register_resource(&self, resource: Box<dyn GpuResource>) -> ResourceHandle {
        log::trace!("Registering resource '{}' as pending", resource.label());
        ResourceHandle(lock(&self.resources).prepend(self.pending, resource))
    }

    /// Unlink a resource from whichever list holds it. Also reports whether it
    /// was active, so the caller can decide to run its destroy hook.
    pub(crate) fn remove_resource(
        &self,
        handle: ResourceHandle,
    ) -> Option<(Box<dyn GpuResource>, bool)> {
        let mut arena = lock(&self.resources);
        let was_active = arena.list_of(handle.0) == Some(self.active);
        arena.remove(handle.0).map(|resource| (resource, was_active))
    }

    pub(crate) fn contains_resource(&self, handle: ResourceHandle) -> bool {
        lock(&self.resources).contains(handle.0)
    }

    pub(crate) fn is_active(&self, handle: ResourceHandle) -> bool {
        lock(&self.resources).list_of(handle.0) == Some(self.active)
    }

    pub(crate) fn pending_count(&self) -> usize {
        lock(&self.resources).len(self.pending)
    }

    pub(crate) fn active_count(&self) -> usize {
        lock(&self.resources).len(self.active)
    }

    /// Promote everything pending to active, running create hooks. Returns the
    /// number of resources promoted.
    pub(crate) fn activate_pending(&self, device: DeviceHandle) -> usize {
        {
            let mut arena = lock(&self.resources);
            if arena.is_empty(self.pending) {
                return 0;
            }
            arena.prepend_and_adopt(self.staging, self.pending);
        }

        walk(&self.resources, self.staging, |resource| {
            resource.create_gpu(device)
        });

        let mut arena = lock(&self.resources);
        let promoted = arena.len(self.staging);
        arena.prepend_and_adopt(self.active, self.staging);
        promoted
    }

    pub(crate) fn create_active(&self, device: DeviceHandle) -> usize {
        walk(&self.resources, self.active, |resource| {
            resource.create_gpu(device)
        })
    }

    pub(crate) fn destroy_active(&self, device: DeviceHandle) -> usize {
        walk(&self.resources, self.active, |resource| {
            resource.destroy_gpu(device)
        })
    }

    pub(crate) fn register_updatable(&self, updatable: Box<dyn Updatable>) -> UpdatableHandle {
        UpdatableHandle(lock(&self.updatables).prepend(self.updatable_list, updatable))
    }

    pub(crate) fn release_updatable(&self, handle: UpdatableHandle) -> Option<Box<dyn Updatable>> {
        lock(&self.updatables).remove(handle.0)
    }

    pub(crate) fn updatable_count(&self) -> usize {
        lock(&self.updatables).len(self.updatable_list)
    }

    pub(crate) fn run_updatables(&self, frame: &FrameInfo) -> usize {
        walk(&self.updatables, self.updatable_list, |updatable| {
            updatable.update(frame)
        })
    }
}

/// Visit every node of `list`, calling `hook` with the arena unlocked.
///
/// The walk covers the nodes linked when it starts. A hook may remove any of
/// them, its own included, or register new ones: removed nodes are skipped and
/// new ones wait for the next walk. A value whose node was removed while the
/// hook held it is dropped afterwards.
fn walk<T>(arena: &Mutex<NodeArena<T>>, list: ListId, mut hook: impl FnMut(&mut T)) -> usize {
    let members = lock(arena).handles(list);
    let mut visited = 0;

    for handle in members {
        let Some(mut value) = lock(arena).take(handle) else {
            log::trace!("Node removed before its turn in the walk; skipping");
            continue;
        };

        hook(&mut value);
        visited += 1;
        if lock(arena).restore(handle, value).is_err() {
            log::trace!("Node released during its own hook; dropping value");
        }
    }

    visited
}

/// Cloneable, thread-safe handle for registering objects with a
/// [`Context`](super::Context) from any thread.
#[derive(Clone)]
pub struct Registrar {
    registry: Arc<Registry>,
}

impl Registrar {
    pub(crate) fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Register a resource. It stays pending until the next render-thread tick
    /// with a device attached.
    pub fn register_resource(&self, resource: impl GpuResource + 'static) -> ResourceHandle {
        self.register_boxed_resource(Box::new(resource))
    }

    pub fn register_boxed_resource(&self, resource: Box<dyn GpuResource>) -> ResourceHandle {
        self.registry.register_resource(resource)
    }

    /// Unlink a resource without running its destroy hook.
    ///
    /// Intended for resources that never became active, or for owners that
    /// have already released device objects on the render thread.
    pub fn release_resource(&self, handle: ResourceHandle) -> Option<Box<dyn GpuResource>> {
        self.registry
            .remove_resource(handle)
            .map(|(resource, _)| resource)
    }

    pub fn is_registered(&self, handle: ResourceHandle) -> bool {
        self.registry.contains_resource(handle)
    }

    pub fn is_active(&self, handle: ResourceHandle) -> bool {
        self.registry.is_active(handle)
    }

    /// Register an updatable. It runs from the very next tick.
    pub fn register_updatable(&self, updatable: impl Updatable + 'static) -> UpdatableHandle {
        self.registry.register_updatable(Box::new(updatable))
    }

    pub fn release_updatable(&self, handle: UpdatableHandle) -> Option<Box<dyn Updatable>> {
        self.registry.release_updatable(handle)
    }
}
