//! Device-context identity and capability probing.
//!
//! The runtime never talks to a graphics API directly. The render-loop driver
//! hands the [`Context`](super::Context) a [`DeviceQuery`] that reports which
//! device context is current on the calling thread, and a
//! [`CapabilityProbe`] that is queried once per attach.

use std::collections::BTreeSet;
use std::num::NonZeroU64;
use std::sync::Mutex;

use crate::sync::lock;

/// Opaque identity of a platform graphics context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceHandle(NonZeroU64);

impl DeviceHandle {
    /// Wrap a raw platform handle. Zero is the platform's "no context".
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// The raw platform value.
    pub fn raw(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0.get())
    }
}

/// Reports the device context current on the calling thread.
pub trait DeviceQuery {
    fn current_context(&self) -> Option<DeviceHandle>;
}

/// A device query whose current context is set explicitly.
///
/// Used by headless drivers and by hosts that track context switches
/// themselves (e.g. across an application pause/resume).
#[derive(Debug, Default)]
pub struct ManualDevice {
    current: Mutex<Option<DeviceHandle>>,
}

impl ManualDevice {
    /// Create a device query with no current context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a device query with `handle` already current.
    pub fn with_current(handle: DeviceHandle) -> Self {
        Self {
            current: Mutex::new(Some(handle)),
        }
    }

    /// Make `handle` the current context.
    pub fn make_current(&self, handle: DeviceHandle) {
        *lock(&self.current) = Some(handle);
    }

    /// Clear the current context, as after a context loss.
    pub fn clear_current(&self) {
        *lock(&self.current) = None;
    }
}

impl DeviceQuery for ManualDevice {
    fn current_context(&self) -> Option<DeviceHandle> {
        *lock(&self.current)
    }
}

/// Extension set reported by a [`CapabilityProbe`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    extensions: BTreeSet<String>,
}

impl Capabilities {
    /// Build from a list of extension names.
    pub fn from_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `extension` is supported.
    pub fn supports(&self, extension: &str) -> bool {
        self.extensions.contains(extension)
    }

    /// Iterate supported extension names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

/// Queries the capabilities of a device context. Called on the render thread
/// once per successful attach.
pub trait CapabilityProbe: Send {
    fn probe(&self, device: DeviceHandle) -> Capabilities;
}

/// A probe that reports a fixed extension set for every device.
#[derive(Clone, Debug, Default)]
pub struct StaticCapabilities {
    capabilities: Capabilities,
}

impl StaticCapabilities {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }
}

impl CapabilityProbe for StaticCapabilities {
    fn probe(&self, _device: DeviceHandle) -> Capabilities {
        self.capabilities.clone()
    }
}
