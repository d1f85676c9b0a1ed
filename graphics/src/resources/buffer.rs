//! GPU buffer resource.

use crate::types::{BufferDescriptor, BufferUsage};

use super::resource::{GpuResource, ResourceDescriptor};

/// A GPU buffer, created by [`GraphicsDevice::create_buffer`].
///
/// [`GraphicsDevice::create_buffer`]: crate::GraphicsDevice::create_buffer
pub type Buffer = GpuResource<BufferDescriptor>;

impl ResourceDescriptor for BufferDescriptor {
    const KIND: &'static str = "Buffer";

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl Buffer {
    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.descriptor().size
    }

    pub fn usage(&self) -> BufferUsage {
        self.descriptor().usage
    }

    /// Whether `offset..offset + len` lies inside the buffer.
    pub fn contains_range(&self, offset: u64, len: u64) -> bool {
        offset.checked_add(len).is_some_and(|end| end <= self.size())
    }
}

static_assertions::assert_impl_all!(Buffer: Send, Sync);
