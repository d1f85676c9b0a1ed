//! GPU texture resource.

use crate::types::{Extent2d, TextureDescriptor, TextureFormat};

use super::resource::{GpuResource, ResourceDescriptor};

/// A 2D GPU texture, created by [`GraphicsDevice::create_texture`].
///
/// [`GraphicsDevice::create_texture`]: crate::GraphicsDevice::create_texture
pub type Texture = GpuResource<TextureDescriptor>;

impl ResourceDescriptor for TextureDescriptor {
    const KIND: &'static str = "Texture";

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl Texture {
    pub fn size(&self) -> Extent2d {
        self.descriptor().size
    }

    pub fn width(&self) -> u32 {
        self.descriptor().size.width
    }

    pub fn height(&self) -> u32 {
        self.descriptor().size.height
    }

    pub fn format(&self) -> TextureFormat {
        self.descriptor().format
    }
}

static_assertions::assert_impl_all!(Texture: Send, Sync);
