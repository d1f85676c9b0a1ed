//! Graphics device: capabilities, resource creation and live-resource counts.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::backend::{DeviceStatus, GpuBackend, GpuHandle};
use crate::error::GraphicsError;
use crate::resources::{Buffer, GpuResource, ResourceDescriptor, Sampler, Texture};
use crate::types::{BufferDescriptor, SamplerDescriptor, TextureDescriptor};

/// Capabilities of a graphics device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceCapabilities {
    /// Maximum texture dimension.
    pub max_texture_dimension: u32,
    /// Maximum buffer size.
    pub max_buffer_size: u64,
    /// Required alignment of vertex and index buffer offsets. Power of two.
    pub vertex_buffer_alignment: u64,
    /// Required alignment of uniform buffer offsets. Power of two.
    pub uniform_offset_alignment: u64,
    /// Maximum anisotropy level. 1 means anisotropic filtering is unsupported.
    pub max_anisotropy: u16,
}

impl DeviceCapabilities {
    /// Whether anisotropic filtering is available.
    pub fn supports_anisotropy(&self) -> bool {
        self.max_anisotropy > 1
    }
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            max_texture_dimension: 16384,
            max_buffer_size: 1 << 30, // 1 GB
            vertex_buffer_alignment: 16,
            uniform_offset_alignment: 256,
            max_anisotropy: 16,
        }
    }
}

/// Weak registry of the resources a device handed out.
struct LiveSet<T>(RwLock<Vec<Weak<T>>>);

impl<T> LiveSet<T> {
    fn new() -> Self {
        Self(RwLock::new(Vec::new()))
    }

    fn track(&self, resource: &Arc<T>) {
        let mut entries = self.0.write();
        // Drop released entries lazily so per-frame creation stays bounded
        if entries.len() >= 64 && entries.len().is_power_of_two() {
            entries.retain(|entry| entry.strong_count() > 0);
        }
        entries.push(Arc::downgrade(resource));
    }

    fn live(&self) -> usize {
        self.0.read().iter().filter(|entry| entry.strong_count() > 0).count()
    }

    fn prune(&self) {
        self.0.write().retain(|entry| entry.strong_count() > 0);
    }
}

/// Resource factory over a [`GpuBackend`].
///
/// Validates descriptors against [`DeviceCapabilities`] before they reach the
/// backend and keeps a weak count of live resources for leak checks.
/// `GraphicsDevice` is `Send + Sync`; the render state and the loader
/// threads share one `Arc<GraphicsDevice>`.
///
/// ```ignore
/// let device = GraphicsDevice::new(Arc::new(DummyBackend::new()))?;
/// let lightmap = device.create_texture(
///     &TextureDescriptor::new_2d(128, 128, TextureFormat::R8Unorm, TextureUsage::TEXTURE_BINDING),
/// )?;
/// ```
pub struct GraphicsDevice {
    backend: Arc<dyn GpuBackend>,
    name: String,
    capabilities: DeviceCapabilities,
    buffers: LiveSet<Buffer>,
    textures: LiveSet<Texture>,
    samplers: LiveSet<Sampler>,
}

impl GraphicsDevice {
    /// Create a device on top of `backend`.
    ///
    /// Fails with [`GraphicsError::InvalidParameter`] if the backend reports
    /// an offset alignment that is not a power of two.
    pub fn new(backend: Arc<dyn GpuBackend>) -> Result<Arc<Self>, GraphicsError> {
        let capabilities = backend.capabilities();
        check_alignment("vertex buffer", capabilities.vertex_buffer_alignment)?;
        check_alignment("uniform offset", capabilities.uniform_offset_alignment)?;

        let name = backend.name().to_string();
        log::info!(
            "GraphicsDevice: using {} (vertex alignment {}, uniform alignment {}, anisotropy {})",
            name,
            capabilities.vertex_buffer_alignment,
            capabilities.uniform_offset_alignment,
            capabilities.max_anisotropy
        );

        Ok(Arc::new(Self {
            backend,
            name,
            capabilities,
            buffers: LiveSet::new(),
            textures: LiveSet::new(),
            samplers: LiveSet::new(),
        }))
    }

    pub fn backend(&self) -> &Arc<dyn GpuBackend> {
        &self.backend
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    /// Health as last reported by the backend.
    pub fn status(&self) -> DeviceStatus {
        self.backend.status()
    }

    pub fn is_lost(&self) -> bool {
        self.status() == DeviceStatus::Lost
    }

    /// Create a GPU buffer of `descriptor.size` bytes.
    pub fn create_buffer(
        self: &Arc<Self>,
        descriptor: &BufferDescriptor,
    ) -> Result<Arc<Buffer>, GraphicsError> {
        let max = self.capabilities.max_buffer_size;
        if descriptor.size == 0 || descriptor.size > max {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer {:?}: size {} outside 1..={max}",
                descriptor.label, descriptor.size
            )));
        }

        let handle = self.backend.create_buffer(descriptor)?;
        Ok(self.adopt(&self.buffers, descriptor, handle))
    }

    /// Create a 2D texture.
    pub fn create_texture(
        self: &Arc<Self>,
        descriptor: &TextureDescriptor,
    ) -> Result<Arc<Texture>, GraphicsError> {
        let max = self.capabilities.max_texture_dimension;
        let size = descriptor.size;
        if size.is_empty() || size.width > max || size.height > max {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture {:?}: extent {}x{} outside 1..={max}",
                descriptor.label, size.width, size.height
            )));
        }

        let handle = self.backend.create_texture(descriptor)?;
        Ok(self.adopt(&self.textures, descriptor, handle))
    }

    /// Create a sampler.
    ///
    /// Anisotropy above the device limit is rejected, not clamped;
    /// [`SamplerSet`](crate::SamplerSet) clamps before calling this.
    pub fn create_sampler(
        self: &Arc<Self>,
        descriptor: &SamplerDescriptor,
    ) -> Result<Arc<Sampler>, GraphicsError> {
        let max = self.capabilities.max_anisotropy.max(1);
        if descriptor.anisotropy_clamp > max {
            return Err(GraphicsError::InvalidParameter(format!(
                "sampler {:?}: anisotropy {} above device limit {max}",
                descriptor.label, descriptor.anisotropy_clamp
            )));
        }

        let handle = self.backend.create_sampler(descriptor)?;
        Ok(self.adopt(&self.samplers, descriptor, handle))
    }

    /// Live buffers created by this device.
    pub fn buffer_count(&self) -> usize {
        self.buffers.live()
    }

    /// Live textures created by this device.
    pub fn texture_count(&self) -> usize {
        self.textures.live()
    }

    /// Live samplers created by this device.
    pub fn sampler_count(&self) -> usize {
        self.samplers.live()
    }

    /// Forget released resources.
    pub fn cleanup_dead_resources(&self) {
        self.buffers.prune();
        self.textures.prune();
        self.samplers.prune();
    }

    fn adopt<D: ResourceDescriptor>(
        self: &Arc<Self>,
        live: &LiveSet<GpuResource<D>>,
        descriptor: &D,
        handle: GpuHandle,
    ) -> Arc<GpuResource<D>> {
        let resource = Arc::new(GpuResource::new(
            Arc::downgrade(self),
            descriptor.clone(),
            handle,
        ));
        live.track(&resource);
        log::trace!(
            "GraphicsDevice: created {} {:?} as {:?}",
            D::KIND,
            descriptor.label(),
            handle
        );
        resource
    }
}

fn check_alignment(what: &str, alignment: u64) -> Result<(), GraphicsError> {
    if alignment.is_power_of_two() {
        Ok(())
    } else {
        Err(GraphicsError::InvalidParameter(format!(
            "{what} alignment {alignment} is not a power of two"
        )))
    }
}

impl std::fmt::Debug for GraphicsDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsDevice")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .field("buffers", &self.buffer_count())
            .field("textures", &self.texture_count())
            .finish()
    }
}

static_assertions::assert_impl_all!(GraphicsDevice: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DummyBackend, DummyBackendConfig};
    use crate::types::{BufferUsage, TextureFormat, TextureUsage};

    fn create_test_device() -> Arc<GraphicsDevice> {
        GraphicsDevice::new(Arc::new(DummyBackend::new())).unwrap()
    }

    fn lightmap(width: u32, height: u32) -> TextureDescriptor {
        TextureDescriptor::new_2d(
            width,
            height,
            TextureFormat::R8Unorm,
            TextureUsage::TEXTURE_BINDING,
        )
        .with_label("lightmap")
    }

    #[test]
    fn test_device_reports_backend() {
        let device = create_test_device();
        assert_eq!(device.name(), "Dummy Backend");
        assert_eq!(device.status(), DeviceStatus::Ready);
        assert!(!device.is_lost());
    }

    #[test]
    fn test_rejects_non_power_of_two_alignment() {
        let capabilities = DeviceCapabilities {
            uniform_offset_alignment: 48,
            ..Default::default()
        };
        let backend =
            DummyBackend::with_config(DummyBackendConfig::new().with_capabilities(capabilities));
        let result = GraphicsDevice::new(Arc::new(backend));
        assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
    }

    #[test]
    fn test_buffer_size_limits() {
        let device = create_test_device();
        let max = device.capabilities().max_buffer_size;
        for size in [0, max + 1] {
            let result = device.create_buffer(&BufferDescriptor::new(size, BufferUsage::VERTEX));
            assert!(matches!(result, Err(GraphicsError::InvalidParameter(_))));
        }

        let buffer = device
            .create_buffer(&BufferDescriptor::new(96, BufferUsage::VERTEX))
            .unwrap();
        assert_eq!(buffer.size(), 96);
        assert!(Arc::ptr_eq(&buffer.device().unwrap(), &device));
    }

    #[test]
    fn test_texture_extent_limits() {
        let device = create_test_device();
        assert!(device.create_texture(&lightmap(0, 16)).is_err());
        assert!(device.create_texture(&lightmap(16, 32768)).is_err());

        let texture = device.create_texture(&lightmap(128, 64)).unwrap();
        assert_eq!((texture.width(), texture.height()), (128, 64));
        assert_eq!(texture.label(), Some("lightmap"));
    }

    #[test]
    fn test_sampler_anisotropy_limit() {
        let device = create_test_device();
        let linear = SamplerDescriptor::linear();
        assert!(device.create_sampler(&linear.clone().with_anisotropy(16)).is_ok());
        assert!(device.create_sampler(&linear.with_anisotropy(32)).is_err());
        assert_eq!(device.sampler_count(), 0);
    }

    #[test]
    fn test_live_counts_follow_drops() {
        let device = create_test_device();
        let kept = device.create_texture(&lightmap(8, 8)).unwrap();
        for _ in 0..100 {
            device
                .create_buffer(&BufferDescriptor::new(16, BufferUsage::UNIFORM))
                .unwrap();
        }
        assert_eq!(device.buffer_count(), 0);
        assert_eq!(device.texture_count(), 1);

        drop(kept);
        device.cleanup_dead_resources();
        assert_eq!(device.texture_count(), 0);
    }
}
