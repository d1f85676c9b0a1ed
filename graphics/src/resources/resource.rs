//! Device-owned resource wrapper shared by buffers, textures and samplers.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::backend::GpuHandle;
use crate::device::GraphicsDevice;

/// Descriptor a [`GpuResource`] was created from.
pub trait ResourceDescriptor: Clone + fmt::Debug + Send + Sync + 'static {
    /// Resource kind, used in logs and `Debug` output.
    const KIND: &'static str;

    fn label(&self) -> Option<&str>;
}

/// A backend object plus the descriptor it was created with.
///
/// Created by [`GraphicsDevice`] and shared as `Arc<GpuResource<_>>`. The
/// binding cache compares resources by `Arc` identity, never by handle. The
/// back-reference to the device is weak so dropping the device is not
/// blocked by resources still held in caches.
pub struct GpuResource<D> {
    device: Weak<GraphicsDevice>,
    descriptor: D,
    handle: GpuHandle,
}

impl<D: ResourceDescriptor> GpuResource<D> {
    pub(crate) fn new(device: Weak<GraphicsDevice>, descriptor: D, handle: GpuHandle) -> Self {
        Self {
            device,
            descriptor,
            handle,
        }
    }

    /// Owning device, if it is still alive.
    pub fn device(&self) -> Option<Arc<GraphicsDevice>> {
        self.device.upgrade()
    }

    pub fn handle(&self) -> GpuHandle {
        self.handle
    }

    pub fn descriptor(&self) -> &D {
        &self.descriptor
    }

    pub fn label(&self) -> Option<&str> {
        self.descriptor.label()
    }
}

impl<D: ResourceDescriptor> fmt::Debug for GpuResource<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(D::KIND)
            .field("handle", &self.handle)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}
