//! Texture types and descriptors.

use super::Extent2d;
use bitflags::bitflags;

/// Texture formats the render state creates or samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFormat {
    /// Single channel, used for palette indices and lightmaps.
    R8Unorm,
    #[default]
    Rgba8Unorm,
    /// Typical swapchain-compatible color target.
    Bgra8Unorm,
    /// HDR color target.
    Rgba16Float,
    Depth32Float,
}

impl TextureFormat {
    /// Whether this is a depth format.
    pub fn is_depth(&self) -> bool {
        matches!(self, Self::Depth32Float)
    }

    /// Bytes per pixel.
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            Self::R8Unorm => 1,
            Self::Rgba8Unorm | Self::Bgra8Unorm | Self::Depth32Float => 4,
            Self::Rgba16Float => 8,
        }
    }
}

bitflags! {
    /// Usage flags for textures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Texture can be copied to.
        const COPY_DST = 1 << 0;
        /// Texture can be sampled in a shader.
        const TEXTURE_BINDING = 1 << 1;
        /// Texture can be used as a render attachment.
        const RENDER_ATTACHMENT = 1 << 2;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for creating a 2D texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TextureDescriptor {
    /// Debug label for the texture.
    pub label: Option<String>,
    pub size: Extent2d,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    /// Create a new 2D texture descriptor.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            label: None,
            size: Extent2d::new(width, height),
            format,
            usage,
        }
    }

    /// Descriptor of a frame render target.
    ///
    /// Color targets are also sampleable so post-processing can read them;
    /// depth targets are attachment-only.
    pub fn render_target(size: Extent2d, format: TextureFormat) -> Self {
        let usage = if format.is_depth() {
            TextureUsage::RENDER_ATTACHMENT
        } else {
            TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING
        };
        Self {
            label: None,
            size,
            format,
            usage,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Byte size of the base level.
    pub fn byte_size(&self) -> u64 {
        u64::from(self.size.width)
            * u64::from(self.size.height)
            * u64::from(self.format.bytes_per_pixel())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_target_usage() {
        let extent = Extent2d::new(640, 480);
        let color = TextureDescriptor::render_target(extent, TextureFormat::Bgra8Unorm);
        assert!(color.usage.contains(TextureUsage::TEXTURE_BINDING));
        assert_eq!(color.byte_size(), 640 * 480 * 4);

        let depth = TextureDescriptor::render_target(extent, TextureFormat::Depth32Float);
        assert_eq!(depth.usage, TextureUsage::RENDER_ATTACHMENT);
    }
}
