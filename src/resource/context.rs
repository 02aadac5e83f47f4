//! The render-thread authority over every registered GPU resource.

use std::sync::Arc;

use super::device::{CapabilityProbe, Capabilities, DeviceHandle, DeviceQuery, StaticCapabilities};
use super::registry::{
    FrameInfo, GpuResource, Registrar, Registry, ResourceHandle, Updatable, UpdatableHandle,
};
use crate::loader::FileReader;

/// Owns the device-context identity and the resource lists, and drives their
/// lifecycle. Lives on the render thread; other threads reach it through a
/// [`Registrar`].
pub struct Context {
    registry: Arc<Registry>,
    /// Device recorded at the last successful attach
    device: Option<DeviceHandle>,
    capabilities: Capabilities,
    probe: Box<dyn CapabilityProbe>,
    file_reader: Option<Arc<dyn FileReader>>,
    frame: u64,
}

/// Builder for a [`Context`] and its collaborators.
#[derive(Default)]
pub struct ContextBuilder {
    probe: Option<Box<dyn CapabilityProbe>>,
    file_reader: Option<Arc<dyn FileReader>>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe queried once per successful attach. Defaults to an empty
    /// extension set.
    pub fn capability_probe(mut self, probe: impl CapabilityProbe + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    /// Reader for render-thread asset access.
    pub fn file_reader(mut self, reader: Arc<dyn FileReader>) -> Self {
        self.file_reader = Some(reader);
        self
    }

    pub fn build(self) -> Context {
        Context {
            registry: Arc::new(Registry::new()),
            device: None,
            capabilities: Capabilities::default(),
            probe: self
                .probe
                .unwrap_or_else(|| Box::new(StaticCapabilities::default())),
            file_reader: self.file_reader,
            frame: 0,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        ContextBuilder::new().build()
    }

    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    /// Attach to the device context current on the calling thread and
    /// (re)create every active resource on it.
    ///
    /// Returns `false` without running any hooks when no context is current.
    /// Resources then stay untouched until the next successful attach.
    pub fn attach_to_device(&mut self, query: &dyn DeviceQuery) -> bool {
        let Some(current) = query.current_context() else {
            log::warn!("No device context is current; skipping resource creation");
            self.device = None;
            return false;
        };

        match self.device {
            Some(previous) if previous != current => {
                log::warn!("Device context changed from {previous} to {current}; recreating resources");
            }
            Some(_) => log::debug!("Re-attaching to device context {current}"),
            None => log::info!("Attaching to device context {current}"),
        }

        self.device = Some(current);
        self.capabilities = self.probe.probe(current);
        log::debug!(
            "Device {current} reports {} extensions",
            self.capabilities.len()
        );

        let created = self.registry.create_active(current);
        log::info!("Created {created} active resources on {current}");
        true
    }

    /// One per-frame lifecycle pass: promote pending resources (only while a
    /// device is attached), then update every updatable.
    ///
    /// Returns the number of resources promoted.
    pub fn tick(&mut self) -> usize {
        self.frame += 1;

        let promoted = match self.device {
            Some(device) => self.registry.activate_pending(device),
            None => 0,
        };
        if promoted > 0 {
            log::debug!("Frame {}: activated {promoted} resources", self.frame);
        }

        let frame = FrameInfo {
            frame: self.frame,
            device: self.device,
        };
        self.registry.run_updatables(&frame);
        promoted
    }

    /// Run every active resource's destroy hook and forget the device.
    ///
    /// Proceeds even when no context is current (the hooks receive the
    /// remembered handle). Returns the number of resources destroyed.
    pub fn detach_from_device(&mut self, query: &dyn DeviceQuery) -> usize {
        let current = query.current_context();
        if current.is_none() {
            log::warn!("No device context is current while detaching; destroying anyway");
        } else if self.device.is_some() && current != self.device {
            log::warn!("Detaching while a different device context is current");
        }

        let Some(device) = self.device.take().or(current) else {
            log::debug!("Detach without a known device context; nothing to destroy");
            return 0;
        };

        let destroyed = self.registry.destroy_active(device);
        self.capabilities = Capabilities::default();
        log::info!("Destroyed {destroyed} active resources on {device}");
        destroyed
    }

    /// Register a resource. It is activated at the next tick with a device
    /// attached.
    pub fn register_resource(&self, resource: impl GpuResource + 'static) -> ResourceHandle {
        self.registry.register_resource(Box::new(resource))
    }

    /// Unlink a resource, running its destroy hook first if it is active and
    /// a device is attached. Returns `false` for a stale handle.
    pub fn destroy_resource(&mut self, handle: ResourceHandle) -> bool {
        let Some((mut resource, was_active)) = self.registry.remove_resource(handle) else {
            return false;
        };
        if was_active {
            if let Some(device) = self.device {
                resource.destroy_gpu(device);
            }
        }
        true
    }

    pub fn register_updatable(&self, updatable: impl Updatable + 'static) -> UpdatableHandle {
        self.registry.register_updatable(Box::new(updatable))
    }

    pub fn release_updatable(&self, handle: UpdatableHandle) -> bool {
        self.registry.release_updatable(handle).is_some()
    }

    /// A cloneable registration handle for other threads.
    pub fn registrar(&self) -> Registrar {
        Registrar::new(self.registry.clone())
    }

    pub fn is_active(&self, handle: ResourceHandle) -> bool {
        self.registry.is_active(handle)
    }

    pub fn device(&self) -> Option<DeviceHandle> {
        self.device
    }

    /// Capabilities probed at the last attach. Empty while detached.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn file_reader(&self) -> Option<&Arc<dyn FileReader>> {
        self.file_reader.as_ref()
    }

    /// Number of ticks run so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn pending_count(&self) -> usize {
        self.registry.pending_count()
    }

    pub fn active_count(&self) -> usize {
        self.registry.active_count()
    }

    pub fn updatable_count(&self) -> usize {
        self.registry.updatable_count()
    }
}
