//! Resource lifecycle: device identity, registration lists and the
//! render-thread [`Context`] that drives them.

pub mod context;
pub mod device;
pub mod list;
pub mod registry;

pub use context::{Context, ContextBuilder};
pub use device::{
    CapabilityProbe, Capabilities, DeviceHandle, DeviceQuery, ManualDevice, StaticCapabilities,
};
pub use list::{ListId, NodeArena, NodeHandle};
pub use registry::{
    FrameInfo, GpuResource, Registrar, ResourceHandle, Updatable, UpdatableHandle,
};
